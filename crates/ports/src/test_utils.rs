use crate::secondary::metrics_port::{ClatMetrics, MapMetrics, PacketMetrics, TagMetrics};

/// No-op implementation of all metrics sub-traits for use in tests.
pub struct NoopMetrics;

impl PacketMetrics for NoopMetrics {}
impl ClatMetrics for NoopMetrics {}
impl TagMetrics for NoopMetrics {}
impl MapMetrics for NoopMetrics {}
