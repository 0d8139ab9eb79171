use domain::common::error::DomainError;
use domain::firewall::entity::{IngressDiscardEntry, LocalNetRule, UidOwnerEntry};
use ebpf_common::firewall::LocalNetAccessKey;

/// Secondary port for the firewall policy tables.
///
/// The hot path only reads; the write half is used by whoever owns the
/// policy (configuration loading, tests). Reads of one table are not
/// consistent with reads of another.
pub trait PolicyMapPort: Send + Sync {
    // ── uid_owner ────────────────────────────────────────────────────

    fn uid_owner(&self, uid: u32) -> Option<UidOwnerEntry>;

    fn set_uid_owner(&self, uid: u32, entry: UidOwnerEntry) -> Result<(), DomainError>;

    fn remove_uid_owner(&self, uid: u32) -> Result<(), DomainError>;

    // ── uid_permission ───────────────────────────────────────────────

    /// Permission bits of an app id.
    fn uid_permission(&self, app_id: u32) -> Option<u8>;

    fn set_uid_permission(&self, app_id: u32, permission: u8) -> Result<(), DomainError>;

    // ── ingress_discard ──────────────────────────────────────────────

    fn ingress_discard(&self, daddr: &[u8; 16]) -> Option<IngressDiscardEntry>;

    fn set_ingress_discard(
        &self,
        daddr: [u8; 16],
        entry: IngressDiscardEntry,
    ) -> Result<(), DomainError>;

    // ── local network ────────────────────────────────────────────────

    /// Longest-prefix match; the value is `true` when access is allowed.
    fn local_net_access(&self, key: &LocalNetAccessKey) -> Option<bool>;

    fn add_local_net_rule(&self, rule: &LocalNetRule) -> Result<(), DomainError>;

    fn is_local_net_blocked_uid(&self, uid: u32) -> bool;

    fn set_local_net_blocked_uid(&self, uid: u32, blocked: bool) -> Result<(), DomainError>;

    // ── blocked bind ports ───────────────────────────────────────────

    fn is_port_blocked(&self, port: u16) -> bool;

    fn set_port_blocked(&self, port: u16, blocked: bool) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_map_port_is_object_safe() {
        fn _check(port: &dyn PolicyMapPort) {
            let _ = port.uid_owner(10_000);
            let _ = port.is_port_blocked(80);
        }
    }
}
