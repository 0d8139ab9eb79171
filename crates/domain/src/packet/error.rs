use thiserror::Error;

use crate::common::error::DomainError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PacketError {
    #[error("frame of {len} bytes is shorter than its {header} header")]
    Truncated { header: &'static str, len: usize },

    #[error("network offset {offset} beyond frame of {len} bytes")]
    NetworkOffsetOutOfRange { offset: usize, len: usize },

    #[error("unsupported ethertype 0x{0:04x}")]
    UnsupportedEthertype(u16),
}

impl From<PacketError> for DomainError {
    fn from(e: PacketError) -> Self {
        DomainError::EngineError(e.to_string())
    }
}
