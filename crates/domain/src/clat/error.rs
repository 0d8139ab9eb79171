use thiserror::Error;

use crate::common::error::DomainError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClatError {
    #[error("NAT64 prefix must be a /96: low 32 bits must be zero")]
    PrefixNotSlash96,

    #[error("clat {field} address must not be unspecified")]
    UnspecifiedAddress { field: &'static str },

    #[error("egress session for {local4} has no output interface")]
    MissingOutputInterface { local4: String },
}

impl From<ClatError> for DomainError {
    fn from(e: ClatError) -> Self {
        DomainError::InvalidConfig(e.to_string())
    }
}
