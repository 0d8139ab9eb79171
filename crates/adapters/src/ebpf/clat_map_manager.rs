use domain::clat::entity::{ClatEgressSession, ClatIngressSession, SessionCounters};
use domain::common::error::DomainError;
use ebpf_common::clat::{ClatEgress4Key, ClatEgress4Value, ClatIngress6Key, ClatIngress6Value};
use ebpf_common::config::{CLAT_EGRESS4_MAP_SIZE, CLAT_INGRESS6_MAP_SIZE};
use ports::secondary::clat_map_port::ClatMapPort;
use tracing::info;

use crate::maps::InsertMode;
use crate::maps::bounded_hash::BoundedHashMap;

struct IngressEntry {
    value: ClatIngress6Value,
    counters: SessionCounters,
}

struct EgressEntry {
    value: ClatEgress4Value,
    counters: SessionCounters,
}

/// Manages the `clat_ingress6_map` and `clat_egress4_map` session tables.
///
/// Sessions are create-only: one active session per key.
pub struct ClatMapManager {
    ingress: BoundedHashMap<ClatIngress6Key, IngressEntry>,
    egress: BoundedHashMap<ClatEgress4Key, EgressEntry>,
}

impl ClatMapManager {
    pub fn new() -> Self {
        Self {
            ingress: BoundedHashMap::new("clat_ingress6_map", CLAT_INGRESS6_MAP_SIZE),
            egress: BoundedHashMap::new("clat_egress4_map", CLAT_EGRESS4_MAP_SIZE),
        }
    }

    pub fn session_count(&self) -> (usize, usize) {
        (self.ingress.len(), self.egress.len())
    }
}

impl Default for ClatMapManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ClatMapPort for ClatMapManager {
    fn ingress6(&self, key: &ClatIngress6Key) -> Option<ClatIngress6Value> {
        self.ingress.with(key, |e| {
            let (packets, bytes) = e.counters.snapshot();
            ClatIngress6Value {
                packets,
                bytes,
                ..e.value
            }
        })
    }

    fn record_ingress6(&self, key: &ClatIngress6Key, bytes: u64) {
        self.ingress.with(key, |e| e.counters.record(bytes));
    }

    fn egress4(&self, key: &ClatEgress4Key) -> Option<ClatEgress4Value> {
        self.egress.with(key, |e| {
            let (packets, bytes) = e.counters.snapshot();
            ClatEgress4Value {
                packets,
                bytes,
                ..e.value
            }
        })
    }

    fn record_egress4(&self, key: &ClatEgress4Key, bytes: u64) {
        self.egress.with(key, |e| e.counters.record(bytes));
    }

    fn add_ingress_session(&self, session: &ClatIngressSession) -> Result<(), DomainError> {
        session.validate()?;
        let entry = IngressEntry {
            value: session.value(),
            counters: SessionCounters::default(),
        };
        self.ingress
            .insert(session.key(), entry, InsertMode::NoExist)?;
        info!(
            iif = session.iif,
            pfx96 = %session.pfx96,
            local6 = %session.local6,
            local4 = %session.local4,
            oif = session.oif,
            "clat ingress6 session added"
        );
        Ok(())
    }

    fn add_egress_session(&self, session: &ClatEgressSession) -> Result<(), DomainError> {
        session.validate()?;
        let entry = EgressEntry {
            value: session.value(),
            counters: SessionCounters::default(),
        };
        self.egress
            .insert(session.key(), entry, InsertMode::NoExist)?;
        info!(
            iif = session.iif,
            local4 = %session.local4,
            local6 = %session.local6,
            oif = session.oif,
            "clat egress4 session added"
        );
        Ok(())
    }

    fn remove_ingress_session(&self, key: &ClatIngress6Key) -> Result<(), DomainError> {
        self.ingress.remove(key)?;
        Ok(())
    }

    fn remove_egress_session(&self, key: &ClatEgress4Key) -> Result<(), DomainError> {
        self.egress.remove(key)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn ingress_session() -> ClatIngressSession {
        ClatIngressSession {
            iif: 3,
            pfx96: "64:ff9b::".parse().unwrap(),
            local6: "2001:db8::464".parse().unwrap(),
            local4: Ipv4Addr::new(192, 0, 0, 4),
            oif: 9,
        }
    }

    #[test]
    fn session_lookup_and_counters() {
        let m = ClatMapManager::new();
        let s = ingress_session();
        m.add_ingress_session(&s).unwrap();
        m.record_ingress6(&s.key(), 60);
        m.record_ingress6(&s.key(), 40);
        let v = m.ingress6(&s.key()).unwrap();
        assert_eq!(v.oif, 9);
        assert_eq!((v.packets, v.bytes), (2, 100));
    }

    #[test]
    fn duplicate_session_rejected() {
        let m = ClatMapManager::new();
        m.add_ingress_session(&ingress_session()).unwrap();
        let err = m.add_ingress_session(&ingress_session()).unwrap_err();
        assert!(err.is_already_exists());
    }

    #[test]
    fn invalid_session_rejected() {
        let m = ClatMapManager::new();
        let s = ClatEgressSession {
            iif: 9,
            local4: Ipv4Addr::new(192, 0, 0, 4),
            local6: "2001:db8::464".parse().unwrap(),
            pfx96: "64:ff9b::".parse().unwrap(),
            oif: 0,
            oif_is_ethernet: false,
        };
        assert!(matches!(
            m.add_egress_session(&s),
            Err(DomainError::InvalidConfig(_))
        ));
        assert_eq!(m.session_count(), (0, 0));
    }

    #[test]
    fn record_on_missing_session_is_noop() {
        let m = ClatMapManager::new();
        m.record_egress4(&ClatEgress4Key { iif: 1, local4: [1; 4] }, 10);
        assert_eq!(m.session_count(), (0, 0));
    }
}
