use domain::accounting::entity::StatsDelta;
use domain::common::entity::{CounterGeneration, Direction};
use domain::common::error::DomainError;
use ebpf_common::stats::{StatsKey, StatsValue};

/// Secondary port for the traffic counter tables.
///
/// `accumulate*` create the entry on first use. A racing creator that loses
/// the insert re-reads the winner's entry instead of retrying, so every
/// update lands on exactly one canonical entry.
pub trait StatsMapPort: Send + Sync {
    /// Counter set of `uid`; `None` means the default set 0.
    fn counter_set(&self, uid: u32) -> Option<u8>;

    fn set_counter_set(&self, uid: u32, counter_set: u8) -> Result<(), DomainError>;

    fn accumulate(
        &self,
        generation: CounterGeneration,
        key: StatsKey,
        direction: Direction,
        delta: StatsDelta,
    ) -> Result<(), DomainError>;

    fn accumulate_app_uid(
        &self,
        uid: u32,
        direction: Direction,
        delta: StatsDelta,
    ) -> Result<(), DomainError>;

    fn accumulate_iface(
        &self,
        ifindex: u32,
        direction: Direction,
        delta: StatsDelta,
    ) -> Result<(), DomainError>;

    /// Visit every key of one generation. The table may change during the
    /// walk; visited keys are a best-effort view.
    fn for_each_key(
        &self,
        generation: CounterGeneration,
        visit: &mut dyn FnMut(&StatsKey),
    ) -> Result<(), DomainError>;

    fn stats(&self, generation: CounterGeneration, key: &StatsKey) -> Option<StatsValue>;

    fn app_uid_stats(&self, uid: u32) -> Option<StatsValue>;

    fn iface_stats(&self, ifindex: u32) -> Option<StatsValue>;

    /// Remove every entry of one generation.
    fn clear(&self, generation: CounterGeneration) -> Result<(), DomainError>;
}
