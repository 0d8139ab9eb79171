use ebpf_common::trace::PacketTrace;

/// Best-effort sink for packet trace events.
pub trait PacketTraceSink: Send + Sync {
    /// Submit one event. Returns `false` when it was dropped (sink full or
    /// disabled); never blocks.
    fn emit(&self, trace: PacketTrace) -> bool;

    /// Take up to `max` queued events, oldest first.
    fn drain(&self, max: usize) -> Vec<PacketTrace>;
}
