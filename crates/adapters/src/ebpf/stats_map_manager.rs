use domain::accounting::entity::{StatsCounters, StatsDelta};
use domain::common::entity::{CounterGeneration, Direction};
use domain::common::error::{DomainError, MapError};
use ebpf_common::config::{
    APP_STATS_MAP_SIZE, IFACE_STATS_MAP_SIZE, STATS_MAP_SIZE, UID_COUNTERSET_MAP_SIZE,
};
use ebpf_common::stats::{StatsKey, StatsValue};
use ports::secondary::stats_map_port::StatsMapPort;
use std::hash::Hash;

use crate::maps::InsertMode;
use crate::maps::bounded_hash::BoundedHashMap;

/// Manages the counter-set assignment and every traffic counter table.
pub struct StatsMapManager {
    counter_sets: BoundedHashMap<u32, u8>,
    stats_a: BoundedHashMap<StatsKey, StatsCounters>,
    stats_b: BoundedHashMap<StatsKey, StatsCounters>,
    app_uid_stats: BoundedHashMap<u32, StatsCounters>,
    iface_stats: BoundedHashMap<u32, StatsCounters>,
}

impl StatsMapManager {
    pub fn new() -> Self {
        Self::with_stats_capacity(STATS_MAP_SIZE)
    }

    /// Manager whose A/B tables hold `capacity` entries each.
    pub fn with_stats_capacity(capacity: u32) -> Self {
        Self {
            counter_sets: BoundedHashMap::new("uid_counterset_map", UID_COUNTERSET_MAP_SIZE),
            stats_a: BoundedHashMap::new("stats_map_A", capacity),
            stats_b: BoundedHashMap::new("stats_map_B", capacity),
            app_uid_stats: BoundedHashMap::new("app_uid_stats_map", APP_STATS_MAP_SIZE),
            iface_stats: BoundedHashMap::new("iface_stats_map", IFACE_STATS_MAP_SIZE),
        }
    }

    fn generation(&self, generation: CounterGeneration) -> &BoundedHashMap<StatsKey, StatsCounters> {
        match generation {
            CounterGeneration::A => &self.stats_a,
            CounterGeneration::B => &self.stats_b,
        }
    }

    pub fn stats_capacity(&self) -> u32 {
        self.stats_a.capacity()
    }

    pub fn generation_len(&self, generation: CounterGeneration) -> usize {
        self.generation(generation).len()
    }
}

impl Default for StatsMapManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Add to the entry for `key`, creating it first if needed.
///
/// Creation is create-only: losing the race to another creator is fine,
/// the update then goes to the winner's entry.
fn get_or_create_add<K: Eq + Hash + Copy>(
    map: &BoundedHashMap<K, StatsCounters>,
    key: K,
    direction: Direction,
    delta: StatsDelta,
) -> Result<(), MapError> {
    if map.with(&key, |c| c.add(direction, delta)).is_some() {
        return Ok(());
    }
    match map.insert(key, StatsCounters::default(), InsertMode::NoExist) {
        Ok(()) | Err(MapError::AlreadyExists { .. }) => {}
        Err(e) => return Err(e),
    }
    map.with(&key, |c| c.add(direction, delta))
        .ok_or(MapError::NotFound { map: map.name() })
}

impl StatsMapPort for StatsMapManager {
    fn counter_set(&self, uid: u32) -> Option<u8> {
        self.counter_sets.get(&uid)
    }

    fn set_counter_set(&self, uid: u32, counter_set: u8) -> Result<(), DomainError> {
        self.counter_sets
            .insert(uid, counter_set, InsertMode::Any)?;
        Ok(())
    }

    fn accumulate(
        &self,
        generation: CounterGeneration,
        key: StatsKey,
        direction: Direction,
        delta: StatsDelta,
    ) -> Result<(), DomainError> {
        get_or_create_add(self.generation(generation), key, direction, delta)?;
        Ok(())
    }

    fn accumulate_app_uid(
        &self,
        uid: u32,
        direction: Direction,
        delta: StatsDelta,
    ) -> Result<(), DomainError> {
        get_or_create_add(&self.app_uid_stats, uid, direction, delta)?;
        Ok(())
    }

    fn accumulate_iface(
        &self,
        ifindex: u32,
        direction: Direction,
        delta: StatsDelta,
    ) -> Result<(), DomainError> {
        get_or_create_add(&self.iface_stats, ifindex, direction, delta)?;
        Ok(())
    }

    fn for_each_key(
        &self,
        generation: CounterGeneration,
        visit: &mut dyn FnMut(&StatsKey),
    ) -> Result<(), DomainError> {
        for key in self.generation(generation).keys() {
            visit(&key);
        }
        Ok(())
    }

    fn stats(&self, generation: CounterGeneration, key: &StatsKey) -> Option<StatsValue> {
        self.generation(generation).with(key, StatsCounters::snapshot)
    }

    fn app_uid_stats(&self, uid: u32) -> Option<StatsValue> {
        self.app_uid_stats.with(&uid, StatsCounters::snapshot)
    }

    fn iface_stats(&self, ifindex: u32) -> Option<StatsValue> {
        self.iface_stats.with(&ifindex, StatsCounters::snapshot)
    }

    fn clear(&self, generation: CounterGeneration) -> Result<(), DomainError> {
        self.generation(generation).clear();
        Ok(())
    }
}
