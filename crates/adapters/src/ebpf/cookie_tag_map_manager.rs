use std::sync::atomic::{AtomicBool, Ordering};

use domain::common::error::DomainError;
use ebpf_common::config::COOKIE_UID_MAP_SIZE;
use ebpf_common::stats::UidTagValue;
use ports::secondary::cookie_tag_map_port::CookieTagMapPort;

use crate::maps::InsertMode;
use crate::maps::bounded_hash::BoundedHashMap;

/// Manages the socket cookie → (uid, tag) table.
pub struct CookieTagMapManager {
    map: BoundedHashMap<u64, UidTagValue>,
    available: AtomicBool,
}

impl CookieTagMapManager {
    pub fn new() -> Self {
        Self {
            map: BoundedHashMap::new("cookie_tag_map", COOKIE_UID_MAP_SIZE),
            available: AtomicBool::new(true),
        }
    }

    /// Mark the table as unopenable; tag requests are then refused.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Relaxed);
    }
}

impl Default for CookieTagMapManager {
    fn default() -> Self {
        Self::new()
    }
}

impl CookieTagMapPort for CookieTagMapManager {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::Relaxed)
    }

    fn lookup(&self, cookie: u64) -> Option<UidTagValue> {
        self.map.get(&cookie)
    }

    fn tag(&self, cookie: u64, value: UidTagValue) -> Result<(), DomainError> {
        self.map.insert(cookie, value, InsertMode::Any)?;
        Ok(())
    }

    fn untag(&self, cookie: u64) -> Result<(), DomainError> {
        self.map.remove(&cookie)?;
        Ok(())
    }

    fn len(&self) -> usize {
        self.map.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_overwrites() {
        let m = CookieTagMapManager::new();
        m.tag(5, UidTagValue { uid: 1, tag: 2 }).unwrap();
        m.tag(5, UidTagValue { uid: 1, tag: 3 }).unwrap();
        assert_eq!(m.lookup(5), Some(UidTagValue { uid: 1, tag: 3 }));
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn untag_missing_is_not_found() {
        let m = CookieTagMapManager::new();
        assert!(m.untag(5).unwrap_err().is_not_found());
        assert!(m.is_empty());
    }
}
