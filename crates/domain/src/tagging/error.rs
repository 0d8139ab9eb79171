use thiserror::Error;

use crate::common::error::{DomainError, MapError};

/// Rejection of a tag or untag request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagError {
    #[error("cookie tag map unavailable")]
    MapUnavailable,

    #[error("uid {real_uid} may not charge traffic to uid {charge_uid}")]
    ChargeNotPermitted { real_uid: u32, charge_uid: u32 },

    #[error("traffic cannot be charged to the clat uid")]
    ClatUid,

    #[error("unsupported socket family {family}")]
    UnsupportedFamily { family: u16 },

    #[error("unsupported socket protocol {protocol}")]
    UnsupportedProtocol { protocol: u16 },

    #[error("bad file descriptor {fd}")]
    BadDescriptor { fd: i32 },

    #[error("invalid stats map selector {value}")]
    InvalidSelector { value: u32 },

    #[error("too many stats entries: total {total}, uid {uid} has {per_uid}")]
    QuotaExceeded { uid: u32, total: u32, per_uid: u32 },

    #[error("tag quota {total_limit} leaves too little of {capacity} stats entries")]
    QuotaTooLarge { total_limit: u32, capacity: u32 },

    #[error(transparent)]
    Map(#[from] MapError),
}

impl TagError {
    /// Positive errno reported to the caller of the tagging API.
    pub fn errno(&self) -> i32 {
        match self {
            Self::MapUnavailable | Self::ChargeNotPermitted { .. } | Self::ClatUid => 1, // EPERM
            Self::UnsupportedFamily { .. } => 97,  // EAFNOSUPPORT
            Self::UnsupportedProtocol { .. } => 93, // EPROTONOSUPPORT
            Self::BadDescriptor { .. } => 9,       // EBADF
            Self::InvalidSelector { .. } | Self::QuotaTooLarge { .. } => 22, // EINVAL
            Self::QuotaExceeded { .. } => 24,      // EMFILE
            Self::Map(e) => e.errno(),
        }
    }

    /// Symbolic name of [`Self::errno`], used as a metrics label.
    pub fn errno_name(&self) -> &'static str {
        match self.errno() {
            1 => "EPERM",
            2 => "ENOENT",
            9 => "EBADF",
            17 => "EEXIST",
            22 => "EINVAL",
            24 => "EMFILE",
            7 => "E2BIG",
            93 => "EPROTONOSUPPORT",
            97 => "EAFNOSUPPORT",
            _ => "EIO",
        }
    }
}

impl From<TagError> for DomainError {
    fn from(e: TagError) -> Self {
        match e {
            TagError::Map(m) => DomainError::Map(m),
            TagError::MapUnavailable | TagError::ChargeNotPermitted { .. } | TagError::ClatUid => {
                DomainError::PermissionDenied(e.to_string())
            }
            TagError::QuotaExceeded { .. } => DomainError::ResourceExhausted(e.to_string()),
            TagError::UnsupportedFamily { .. }
            | TagError::UnsupportedProtocol { .. }
            | TagError::BadDescriptor { .. } => DomainError::Socket(e.to_string()),
            TagError::InvalidSelector { .. } | TagError::QuotaTooLarge { .. } => {
                DomainError::InvalidConfig(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errno_mapping() {
        assert_eq!(TagError::ClatUid.errno(), 1);
        assert_eq!(TagError::UnsupportedFamily { family: 1 }.errno(), 97);
        assert_eq!(TagError::UnsupportedProtocol { protocol: 1 }.errno(), 93);
        assert_eq!(TagError::InvalidSelector { value: 7 }.errno(), 22);
        assert_eq!(
            TagError::QuotaExceeded {
                uid: 1,
                total: 2,
                per_uid: 3
            }
            .errno(),
            24
        );
        assert_eq!(TagError::Map(MapError::NotFound { map: "cookie_tag" }).errno(), 2);
        assert_eq!(TagError::ClatUid.errno_name(), "EPERM");
        assert_eq!(TagError::BadDescriptor { fd: 3 }.errno_name(), "EBADF");
    }

    #[test]
    fn domain_error_conversion() {
        let e: DomainError = TagError::QuotaExceeded {
            uid: 1,
            total: 2,
            per_uid: 3,
        }
        .into();
        assert!(matches!(e, DomainError::ResourceExhausted(_)));

        let e: DomainError = TagError::Map(MapError::NotFound { map: "cookie_tag" }).into();
        assert!(e.is_not_found());
    }
}
