use domain::common::error::DomainError;
use domain::firewall::entity::{IngressDiscardEntry, LocalNetRule, UidOwnerEntry};
use domain::firewall::error::FirewallError;
use ebpf_common::config::{
    BLOCKED_PORTS_MAP_SIZE, INGRESS_DISCARD_MAP_SIZE, LOCAL_NET_ACCESS_MAP_SIZE,
    LOCAL_NET_BLOCKED_UID_MAP_SIZE, UID_OWNER_MAP_SIZE, UID_PERMISSION_MAP_SIZE,
};
use ebpf_common::firewall::{IngressDiscardValue, LocalNetAccessKey, UidOwnerValue};
use ports::secondary::policy_map_port::PolicyMapPort;
use tracing::debug;

use crate::maps::InsertMode;
use crate::maps::array_map::ArrayMap;
use crate::maps::bounded_hash::BoundedHashMap;
use crate::maps::lpm_trie::LpmTrie;

/// LPM data bytes of a local-network key: ifindex, address, protocol, port.
const LOCAL_NET_KEY_BYTES: usize = 24;

/// Manages the firewall policy tables.
pub struct PolicyMapManager {
    uid_owner: BoundedHashMap<u32, UidOwnerValue>,
    uid_permission: BoundedHashMap<u32, u8>,
    ingress_discard: BoundedHashMap<[u8; 16], IngressDiscardValue>,
    local_net_access: LpmTrie<LOCAL_NET_KEY_BYTES, bool>,
    local_net_blocked_uid: BoundedHashMap<u32, bool>,
    blocked_ports: ArrayMap<u64>,
}

impl PolicyMapManager {
    pub fn new() -> Self {
        Self {
            uid_owner: BoundedHashMap::new("uid_owner_map", UID_OWNER_MAP_SIZE),
            uid_permission: BoundedHashMap::new("uid_permission_map", UID_PERMISSION_MAP_SIZE),
            ingress_discard: BoundedHashMap::new("ingress_discard_map", INGRESS_DISCARD_MAP_SIZE),
            local_net_access: LpmTrie::new("local_net_access_map", LOCAL_NET_ACCESS_MAP_SIZE),
            local_net_blocked_uid: BoundedHashMap::new(
                "local_net_blocked_uid_map",
                LOCAL_NET_BLOCKED_UID_MAP_SIZE,
            ),
            blocked_ports: ArrayMap::new("blocked_ports_map", BLOCKED_PORTS_MAP_SIZE),
        }
    }

    pub fn uid_owner_count(&self) -> usize {
        self.uid_owner.len()
    }

    pub fn local_net_rule_count(&self) -> usize {
        self.local_net_access.len()
    }
}

impl Default for PolicyMapManager {
    fn default() -> Self {
        Self::new()
    }
}

fn local_net_data(key: &LocalNetAccessKey) -> [u8; LOCAL_NET_KEY_BYTES] {
    let mut data = [0u8; LOCAL_NET_KEY_BYTES];
    data[..4].copy_from_slice(&key.if_index.to_be_bytes());
    data[4..20].copy_from_slice(&key.remote_ip6);
    data[20..22].copy_from_slice(&key.protocol.to_be_bytes());
    data[22..24].copy_from_slice(&key.remote_port.to_be_bytes());
    data
}

/// Word index and bit of `port` in the blocked-ports bitmap.
fn port_slot(port: u16) -> (u32, u64) {
    (u32::from(port >> 6), 1u64 << (port & 63))
}

impl PolicyMapPort for PolicyMapManager {
    fn uid_owner(&self, uid: u32) -> Option<UidOwnerEntry> {
        self.uid_owner.get(&uid).map(UidOwnerEntry::from)
    }

    fn set_uid_owner(&self, uid: u32, entry: UidOwnerEntry) -> Result<(), DomainError> {
        self.uid_owner.insert(uid, entry.to_value(), InsertMode::Any)?;
        debug!(uid, rules = entry.rules.bits(), iif = entry.allowed_iif, "uid owner set");
        Ok(())
    }

    fn remove_uid_owner(&self, uid: u32) -> Result<(), DomainError> {
        self.uid_owner.remove(&uid)?;
        Ok(())
    }

    fn uid_permission(&self, app_id: u32) -> Option<u8> {
        self.uid_permission.get(&app_id)
    }

    fn set_uid_permission(&self, app_id: u32, permission: u8) -> Result<(), DomainError> {
        self.uid_permission
            .insert(app_id, permission, InsertMode::Any)?;
        Ok(())
    }

    fn ingress_discard(&self, daddr: &[u8; 16]) -> Option<IngressDiscardEntry> {
        self.ingress_discard.get(daddr).map(IngressDiscardEntry::from)
    }

    fn set_ingress_discard(
        &self,
        daddr: [u8; 16],
        entry: IngressDiscardEntry,
    ) -> Result<(), DomainError> {
        self.ingress_discard
            .insert(daddr, entry.into(), InsertMode::Any)?;
        Ok(())
    }

    fn local_net_access(&self, key: &LocalNetAccessKey) -> Option<bool> {
        self.local_net_access
            .lookup(key.prefixlen, local_net_data(key))
    }

    fn add_local_net_rule(&self, rule: &LocalNetRule) -> Result<(), DomainError> {
        let key = rule.to_key()?;
        self.local_net_access.insert(
            key.prefixlen,
            local_net_data(&key),
            rule.allowed,
            InsertMode::Any,
        )?;
        debug!(
            if_index = rule.if_index,
            prefixlen = key.prefixlen,
            allowed = rule.allowed,
            "local network rule added"
        );
        Ok(())
    }

    fn is_local_net_blocked_uid(&self, uid: u32) -> bool {
        self.local_net_blocked_uid.get(&uid).unwrap_or(false)
    }

    fn set_local_net_blocked_uid(&self, uid: u32, blocked: bool) -> Result<(), DomainError> {
        self.local_net_blocked_uid
            .insert(uid, blocked, InsertMode::Any)?;
        Ok(())
    }

    fn is_port_blocked(&self, port: u16) -> bool {
        let (word, bit) = port_slot(port);
        self.blocked_ports.get(word).is_some_and(|w| w & bit != 0)
    }

    fn set_port_blocked(&self, port: u16, blocked: bool) -> Result<(), DomainError> {
        if port == 0 {
            return Err(FirewallError::InvalidBlockedPort { port }.into());
        }
        let (word, bit) = port_slot(port);
        self.blocked_ports.update(word, |w| {
            if blocked {
                *w |= bit;
            } else {
                *w &= !bit;
            }
        })?;
        Ok(())
    }
}
