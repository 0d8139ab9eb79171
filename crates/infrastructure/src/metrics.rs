use ports::secondary::metrics_port::{ClatMetrics, MapMetrics, PacketMetrics, TagMetrics};
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;

// ── Label types ─────────────────────────────────────────────────────

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct HookLabels {
    pub hook: String,
    pub verdict: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct DirectionLabels {
    pub direction: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct PassthroughLabels {
    pub direction: String,
    pub reason: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct TagLabels {
    pub operation: String,
    pub result: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct MapLabels {
    pub map: String,
}

// ── Agent metrics registry ──────────────────────────────────────────

/// Prometheus metrics registry for the agent.
///
/// All metric families use interior mutability (atomics), so recording
/// only requires `&self`. The registry itself is not `Clone`; share it
/// through an `Arc`.
pub struct AgentMetrics {
    registry: Registry,
    pub packets_total: Family<HookLabels, Counter>,
    pub bytes_accounted_total: Family<DirectionLabels, Counter>,
    pub trace_dropped_total: Counter,
    pub clat_packets_total: Family<DirectionLabels, Counter>,
    pub clat_bytes_total: Family<DirectionLabels, Counter>,
    pub clat_passthrough_total: Family<PassthroughLabels, Counter>,
    pub tag_operations_total: Family<TagLabels, Counter>,
    pub map_errors_total: Family<MapLabels, Counter>,
}

impl AgentMetrics {
    /// Create a registry with every metric registered under the
    /// `netguard` prefix.
    pub fn new() -> Self {
        let mut registry = Registry::with_prefix("netguard");

        let packets_total = Family::<HookLabels, Counter>::default();
        registry.register(
            "packets",
            "Hook invocations by hook and verdict",
            packets_total.clone(),
        );

        let bytes_accounted_total = Family::<DirectionLabels, Counter>::default();
        registry.register(
            "bytes_accounted",
            "Bytes added to the per-UID stats maps",
            bytes_accounted_total.clone(),
        );

        let trace_dropped_total = Counter::default();
        registry.register(
            "trace_dropped",
            "Packet trace events lost to a full ring buffer",
            trace_dropped_total.clone(),
        );

        let clat_packets_total = Family::<DirectionLabels, Counter>::default();
        registry.register(
            "clat_packets",
            "Packets translated by the clat fast path",
            clat_packets_total.clone(),
        );

        let clat_bytes_total = Family::<DirectionLabels, Counter>::default();
        registry.register(
            "clat_bytes",
            "Bytes of translated clat packets",
            clat_bytes_total.clone(),
        );

        let clat_passthrough_total = Family::<PassthroughLabels, Counter>::default();
        registry.register(
            "clat_passthrough",
            "Frames left to the userspace clat daemon",
            clat_passthrough_total.clone(),
        );

        let tag_operations_total = Family::<TagLabels, Counter>::default();
        registry.register(
            "tag_operations",
            "Socket tag and untag requests by result",
            tag_operations_total.clone(),
        );

        let map_errors_total = Family::<MapLabels, Counter>::default();
        registry.register(
            "map_errors",
            "Failed map writes by map",
            map_errors_total.clone(),
        );

        Self {
            registry,
            packets_total,
            bytes_accounted_total,
            trace_dropped_total,
            clat_packets_total,
            clat_bytes_total,
            clat_passthrough_total,
            tag_operations_total,
            map_errors_total,
        }
    }

    /// Encode all registered metrics in `OpenMetrics` text format.
    pub fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut buffer = String::new();
        prometheus_client::encoding::text::encode(&mut buffer, &self.registry)?;
        Ok(buffer)
    }
}

impl Default for AgentMetrics {
    fn default() -> Self {
        Self::new()
    }
}

// ── Sub-trait implementations ──────────────────────────────────────

impl PacketMetrics for AgentMetrics {
    fn record_packet(&self, hook: &str, verdict: &str) {
        self.packets_total
            .get_or_create(&HookLabels {
                hook: hook.to_string(),
                verdict: verdict.to_string(),
            })
            .inc();
    }

    fn record_bytes_accounted(&self, direction: &str, bytes: u64) {
        self.bytes_accounted_total
            .get_or_create(&DirectionLabels {
                direction: direction.to_string(),
            })
            .inc_by(bytes);
    }

    fn record_trace_dropped(&self) {
        self.trace_dropped_total.inc();
    }
}

impl ClatMetrics for AgentMetrics {
    fn record_clat_translated(&self, direction: &str, bytes: u64) {
        let labels = DirectionLabels {
            direction: direction.to_string(),
        };
        self.clat_packets_total.get_or_create(&labels).inc();
        self.clat_bytes_total.get_or_create(&labels).inc_by(bytes);
    }

    fn record_clat_passthrough(&self, direction: &str, reason: &str) {
        self.clat_passthrough_total
            .get_or_create(&PassthroughLabels {
                direction: direction.to_string(),
                reason: reason.to_string(),
            })
            .inc();
    }
}

impl TagMetrics for AgentMetrics {
    fn record_tag_operation(&self, operation: &str, result: &str) {
        self.tag_operations_total
            .get_or_create(&TagLabels {
                operation: operation.to_string(),
                result: result.to_string(),
            })
            .inc();
    }
}

impl MapMetrics for AgentMetrics {
    fn record_map_error(&self, map: &str) {
        self.map_errors_total
            .get_or_create(&MapLabels {
                map: map.to_string(),
            })
            .inc();
    }
}
