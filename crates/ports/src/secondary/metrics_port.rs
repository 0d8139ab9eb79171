// Focused sub-traits for recording Prometheus metrics, grouped by hook
// family.
//
// All methods take `&self`; implementations use atomic counters.
// Default implementations are no-ops so test mocks implement only what
// they observe.

// ── Packet hook metrics ────────────────────────────────────────────

pub trait PacketMetrics: Send + Sync {
    /// Record one hook invocation with its final verdict.
    fn record_packet(&self, _hook: &str, _verdict: &str) {}

    /// Record bytes accounted in a direction (rx/tx).
    fn record_bytes_accounted(&self, _direction: &str, _bytes: u64) {}

    /// Record a trace event the sink refused.
    fn record_trace_dropped(&self) {}
}

// ── Translator metrics ─────────────────────────────────────────────

pub trait ClatMetrics: Send + Sync {
    /// Record one translated packet (direction "ingress6" or "egress4").
    fn record_clat_translated(&self, _direction: &str, _bytes: u64) {}

    /// Record a frame left to the userspace daemon.
    fn record_clat_passthrough(&self, _direction: &str, _reason: &str) {}
}

// ── Tagging metrics ────────────────────────────────────────────────

pub trait TagMetrics: Send + Sync {
    /// Record a tag/untag call and its result ("ok" or an errno name).
    fn record_tag_operation(&self, _operation: &str, _result: &str) {}
}

// ── Map store metrics ──────────────────────────────────────────────

pub trait MapMetrics: Send + Sync {
    /// Record a failed map write.
    fn record_map_error(&self, _map: &str) {}
}

// ── Composite super-trait ──────────────────────────────────────────

/// Unified metrics port composing all sub-traits.
///
/// Services accept `Arc<dyn MetricsPort>`.
pub trait MetricsPort: PacketMetrics + ClatMetrics + TagMetrics + MapMetrics {}

impl<T> MetricsPort for T where T: PacketMetrics + ClatMetrics + TagMetrics + MapMetrics {}
