use domain::clat::entity::{ClatEgressSession, ClatIngressSession};
use domain::common::error::DomainError;
use ebpf_common::clat::{ClatEgress4Key, ClatEgress4Value, ClatIngress6Key, ClatIngress6Value};

/// Secondary port for the clat session tables.
///
/// Lookups return the session value with a snapshot of its counters;
/// `record_*` bumps the live counters of an existing session.
pub trait ClatMapPort: Send + Sync {
    fn ingress6(&self, key: &ClatIngress6Key) -> Option<ClatIngress6Value>;

    fn record_ingress6(&self, key: &ClatIngress6Key, bytes: u64);

    fn egress4(&self, key: &ClatEgress4Key) -> Option<ClatEgress4Value>;

    fn record_egress4(&self, key: &ClatEgress4Key, bytes: u64);

    fn add_ingress_session(&self, session: &ClatIngressSession) -> Result<(), DomainError>;

    fn add_egress_session(&self, session: &ClatEgressSession) -> Result<(), DomainError>;

    fn remove_ingress_session(&self, key: &ClatIngress6Key) -> Result<(), DomainError>;

    fn remove_egress_session(&self, key: &ClatEgress4Key) -> Result<(), DomainError>;
}
