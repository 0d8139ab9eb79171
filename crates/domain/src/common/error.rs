use thiserror::Error;

/// Failure of a single map operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    #[error("map {map} is full ({capacity} entries)")]
    Full { map: &'static str, capacity: u32 },

    #[error("key already exists in map {map}")]
    AlreadyExists { map: &'static str },

    #[error("key not found in map {map}")]
    NotFound { map: &'static str },

    #[error("index {index} out of range for map {map}")]
    OutOfRange { map: &'static str, index: u32 },
}

impl MapError {
    /// Errno the equivalent kernel map call would report.
    pub fn errno(&self) -> i32 {
        match self {
            Self::Full { .. } => 7,           // E2BIG
            Self::AlreadyExists { .. } => 17, // EEXIST
            Self::NotFound { .. } => 2,       // ENOENT
            Self::OutOfRange { .. } => 22,    // EINVAL
        }
    }

    pub fn map(&self) -> &'static str {
        match self {
            Self::Full { map, .. }
            | Self::AlreadyExists { map }
            | Self::NotFound { map }
            | Self::OutOfRange { map, .. } => map,
        }
    }
}

#[derive(Debug, Error)]
pub enum DomainError {
    #[error(transparent)]
    Map(#[from] MapError),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("socket error: {0}")]
    Socket(String),

    #[error("engine error: {0}")]
    EngineError(String),
}

impl DomainError {
    /// True when the error is a map lookup/delete miss.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Map(MapError::NotFound { .. }))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::Map(MapError::AlreadyExists { .. }))
    }

    /// Name of the map a map failure came from.
    pub fn map_name(&self) -> Option<&'static str> {
        match self {
            Self::Map(e) => Some(e.map()),
            _ => None,
        }
    }
}
