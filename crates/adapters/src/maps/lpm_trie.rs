use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use domain::common::error::MapError;

use super::InsertMode;

/// Longest-prefix-match table over `N`-byte keys.
///
/// Entries are stored per prefix length with the key masked to that
/// length; a lookup probes lengths from the longest down, so the most
/// specific entry wins.
pub struct LpmTrie<const N: usize, V> {
    name: &'static str,
    capacity: u32,
    inner: RwLock<HashMap<(u32, [u8; N]), V>>,
}

impl<const N: usize, V: Copy> LpmTrie<N, V> {
    pub const MAX_PREFIX: u32 = (N * 8) as u32;

    pub fn new(name: &'static str, capacity: u32) -> Self {
        Self {
            name,
            capacity,
            inner: RwLock::new(HashMap::new()),
        }
    }

    pub fn insert(
        &self,
        prefixlen: u32,
        data: [u8; N],
        value: V,
        mode: InsertMode,
    ) -> Result<(), MapError> {
        if prefixlen > Self::MAX_PREFIX {
            return Err(MapError::OutOfRange {
                map: self.name,
                index: prefixlen,
            });
        }
        let key = (prefixlen, mask(data, prefixlen));
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let exists = guard.contains_key(&key);
        match (mode, exists) {
            (InsertMode::NoExist, true) => return Err(MapError::AlreadyExists { map: self.name }),
            (InsertMode::Exist, false) => return Err(MapError::NotFound { map: self.name }),
            (_, false) if guard.len() >= self.capacity as usize => {
                return Err(MapError::Full {
                    map: self.name,
                    capacity: self.capacity,
                });
            }
            _ => {}
        }
        guard.insert(key, value);
        Ok(())
    }

    pub fn remove(&self, prefixlen: u32, data: [u8; N]) -> Result<V, MapError> {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        guard
            .remove(&(prefixlen, mask(data, prefixlen)))
            .ok_or(MapError::NotFound { map: self.name })
    }

    /// Most specific entry covering the first `prefixlen` bits of `data`.
    pub fn lookup(&self, prefixlen: u32, data: [u8; N]) -> Option<V> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        if guard.is_empty() {
            return None;
        }
        (0..=prefixlen.min(Self::MAX_PREFIX))
            .rev()
            .find_map(|len| guard.get(&(len, mask(data, len))).copied())
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn mask<const N: usize>(mut data: [u8; N], prefixlen: u32) -> [u8; N] {
    let full = (prefixlen / 8) as usize;
    let rem = prefixlen % 8;
    for (i, byte) in data.iter_mut().enumerate() {
        if i < full {
            continue;
        }
        if i == full && rem != 0 {
            *byte &= 0xFFu8 << (8 - rem);
        } else {
            *byte = 0;
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_prefix_wins() {
        let t: LpmTrie<4, &str> = LpmTrie::new("lpm", 8);
        t.insert(8, [10, 0, 0, 0], "ten", InsertMode::Any).unwrap();
        t.insert(24, [10, 1, 2, 0], "ten-one-two", InsertMode::Any).unwrap();
        assert_eq!(t.lookup(32, [10, 1, 2, 3]), Some("ten-one-two"));
        assert_eq!(t.lookup(32, [10, 9, 9, 9]), Some("ten"));
        assert_eq!(t.lookup(32, [11, 0, 0, 0]), None);
    }

    #[test]
    fn lookup_prefix_bounds_search() {
        let t: LpmTrie<4, u8> = LpmTrie::new("lpm", 8);
        t.insert(32, [1, 2, 3, 4], 1, InsertMode::Any).unwrap();
        assert_eq!(t.lookup(24, [1, 2, 3, 4]), None);
    }

    #[test]
    fn odd_prefix_masks_partial_byte() {
        let t: LpmTrie<2, u8> = LpmTrie::new("lpm", 8);
        t.insert(12, [0xAB, 0xCD], 7, InsertMode::Any).unwrap();
        assert_eq!(t.lookup(16, [0xAB, 0xC0]), Some(7));
        assert_eq!(t.lookup(16, [0xAB, 0xDF]), None);
    }

    #[test]
    fn capacity_and_modes() {
        let t: LpmTrie<1, u8> = LpmTrie::new("lpm", 1);
        t.insert(8, [1], 1, InsertMode::NoExist).unwrap();
        assert!(t.insert(8, [1], 2, InsertMode::NoExist).is_err());
        assert!(matches!(
            t.insert(8, [2], 2, InsertMode::Any),
            Err(MapError::Full { .. })
        ));
        assert!(t.insert(9, [1], 2, InsertMode::Any).is_err());
        assert_eq!(t.remove(8, [1]), Ok(1));
        assert!(t.is_empty());
    }
}
