use domain::common::error::DomainError;
use ebpf_common::stats::UidTagValue;

/// Secondary port for the socket cookie → (uid, tag) table.
pub trait CookieTagMapPort: Send + Sync {
    /// False when the table could not be opened; tagging is then refused.
    fn is_available(&self) -> bool;

    fn lookup(&self, cookie: u64) -> Option<UidTagValue>;

    /// Insert or overwrite the entry for `cookie`.
    fn tag(&self, cookie: u64, value: UidTagValue) -> Result<(), DomainError>;

    /// Remove the entry for `cookie`. A missing entry is `MapError::NotFound`.
    fn untag(&self, cookie: u64) -> Result<(), DomainError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
