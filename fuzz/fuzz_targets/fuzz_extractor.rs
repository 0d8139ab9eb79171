#![no_main]

use libfuzzer_sys::fuzz_target;

use domain::common::entity::{Direction, Environment, KernelVersion, SdkLevel};
use domain::packet::entity::SkBuff;
use domain::packet::extractor::{ExtHeaders, NetReader};

// Layout:
//   [0]    = selector: bit 0 ethernet, bit 1 pre-4.19 kernel, bit 2 skip ext header
//   rest   = frame bytes
fuzz_target!(|data: &[u8]| {
    let Some((&selector, frame)) = data.split_first() else {
        return;
    };

    let skb = if selector & 1 != 0 {
        match SkBuff::ethernet(frame.to_vec(), 3) {
            Ok(skb) => skb,
            Err(_) => return,
        }
    } else {
        SkBuff::raw_ip(frame.to_vec(), 3)
    };
    let kernel = if selector & 2 != 0 {
        KernelVersion::new(4, 14, 0)
    } else {
        KernelVersion::new(6, 1, 0)
    };
    let ext = if selector & 4 != 0 {
        ExtHeaders::SkipOne
    } else {
        ExtHeaders::Stop
    };
    let reader = NetReader::new(&skb, Environment::new(kernel, SdkLevel::V25Q2));

    // Reads past the end zero-fill; none may panic.
    let _ = reader.load_be32(usize::from(selector));
    let _ = reader.daddr6();
    let _ = reader.remote_addr6(Direction::Ingress);
    let _ = reader.remote_addr6(Direction::Egress);
    if let Some(loc) = reader.l4_location(ext) {
        assert!(loc.ip_version == 4 || loc.ip_version == 6);
        let _ = reader.ports(&loc);
        let _ = reader.tcp_flag_word(loc.offset);
    }
});
