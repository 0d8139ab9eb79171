use domain::common::error::DomainError;

/// Secondary port for the fixed-index configuration array and the
/// packet-trace switch.
///
/// Reads never fail: a slot that cannot be read is `None` and the caller
/// applies the slot's documented default.
pub trait ConfigurationMapPort: Send + Sync {
    /// Value of configuration slot `key`.
    fn configuration(&self, key: u32) -> Option<u32>;

    fn set_configuration(&self, key: u32, value: u32) -> Result<(), DomainError>;

    /// Whether accounted packets are also emitted as trace events.
    fn packet_trace_enabled(&self) -> bool;

    fn set_packet_trace_enabled(&self, enabled: bool) -> Result<(), DomainError>;
}
