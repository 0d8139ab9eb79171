use ebpf_common::config::PACKET_TRACE_RINGBUF_SIZE;
use ebpf_common::trace::PacketTrace;
use ports::secondary::trace_sink::PacketTraceSink;

use crate::maps::ring_buf::RingBuf;

/// Bounded ring buffer of packet trace events.
pub struct TraceRingBuffer {
    ring: RingBuf<PacketTrace>,
}

impl TraceRingBuffer {
    pub fn new() -> Self {
        Self::with_capacity(PACKET_TRACE_RINGBUF_SIZE)
    }

    pub fn with_capacity(capacity: u32) -> Self {
        Self {
            ring: RingBuf::new(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }
}

impl Default for TraceRingBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketTraceSink for TraceRingBuffer {
    fn emit(&self, trace: PacketTrace) -> bool {
        self.ring.push(trace)
    }

    fn drain(&self, max: usize) -> Vec<PacketTrace> {
        self.ring.drain(max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_buffer_drops_silently() {
        let r = TraceRingBuffer::with_capacity(1);
        assert!(r.emit(PacketTrace::default()));
        assert!(!r.emit(PacketTrace::default()));
        assert_eq!(r.drain(8).len(), 1);
        assert!(r.is_empty());
    }
}
