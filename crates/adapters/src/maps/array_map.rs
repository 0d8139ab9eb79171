use std::sync::{PoisonError, RwLock};

use domain::common::error::MapError;

/// Zero-initialised array indexed by `u32`.
pub struct ArrayMap<V> {
    name: &'static str,
    slots: RwLock<Vec<V>>,
}

impl<V: Copy + Default> ArrayMap<V> {
    pub fn new(name: &'static str, size: u32) -> Self {
        Self {
            name,
            slots: RwLock::new(vec![V::default(); size as usize]),
        }
    }

    pub fn size(&self) -> u32 {
        let len = self.slots.read().unwrap_or_else(PoisonError::into_inner).len();
        u32::try_from(len).unwrap_or(u32::MAX)
    }

    /// `None` only when `index` is out of range.
    pub fn get(&self, index: u32) -> Option<V> {
        let guard = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        guard.get(index as usize).copied()
    }

    pub fn set(&self, index: u32, value: V) -> Result<(), MapError> {
        self.update(index, |slot| *slot = value)
    }

    /// Read-modify-write of one slot under the write lock.
    pub fn update(&self, index: u32, f: impl FnOnce(&mut V)) -> Result<(), MapError> {
        let mut guard = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        let slot = guard.get_mut(index as usize).ok_or(MapError::OutOfRange {
            map: self.name,
            index,
        })?;
        f(slot);
        Ok(())
    }
}
