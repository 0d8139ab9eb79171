use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::hash::Hash;
use std::sync::{PoisonError, RwLock};

use domain::common::error::MapError;

use super::InsertMode;

/// Hash table with a fixed maximum number of entries.
pub struct BoundedHashMap<K, V> {
    name: &'static str,
    capacity: u32,
    inner: RwLock<HashMap<K, V>>,
}

impl<K: Eq + Hash + Copy, V> BoundedHashMap<K, V> {
    pub fn new(name: &'static str, capacity: u32) -> Self {
        Self {
            name,
            capacity,
            inner: RwLock::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Run `f` on the entry for `key` under the read lock.
    pub fn with<R>(&self, key: &K, f: impl FnOnce(&V) -> R) -> Option<R> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        guard.get(key).map(f)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.with(key, |_| ()).is_some()
    }

    pub fn insert(&self, key: K, value: V, mode: InsertMode) -> Result<(), MapError> {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let len = guard.len();
        match guard.entry(key) {
            Entry::Occupied(mut e) => {
                if mode == InsertMode::NoExist {
                    return Err(MapError::AlreadyExists { map: self.name });
                }
                e.insert(value);
            }
            Entry::Vacant(e) => {
                if mode == InsertMode::Exist {
                    return Err(MapError::NotFound { map: self.name });
                }
                if len >= self.capacity as usize {
                    return Err(MapError::Full {
                        map: self.name,
                        capacity: self.capacity,
                    });
                }
                e.insert(value);
            }
        }
        Ok(())
    }

    pub fn remove(&self, key: &K) -> Result<V, MapError> {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        guard
            .remove(key)
            .ok_or(MapError::NotFound { map: self.name })
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the keys present now.
    pub fn keys(&self) -> Vec<K> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        guard.keys().copied().collect()
    }

    pub fn clear(&self) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl<K: Eq + Hash + Copy, V: Clone> BoundedHashMap<K, V> {
    pub fn get(&self, key: &K) -> Option<V> {
        self.with(key, V::clone)
    }
}
