use thiserror::Error;

use crate::common::error::DomainError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FirewallError {
    #[error("invalid prefix length: {prefix_len}")]
    InvalidPrefix { prefix_len: u8 },

    #[error("invalid local network rule: {reason}")]
    PartialLocalNetKey { reason: &'static str },

    #[error("port {port} cannot be blocked")]
    InvalidBlockedPort { port: u16 },
}

impl From<FirewallError> for DomainError {
    fn from(e: FirewallError) -> Self {
        DomainError::InvalidConfig(e.to_string())
    }
}
