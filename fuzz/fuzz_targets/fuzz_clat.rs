#![no_main]

use libfuzzer_sys::fuzz_target;

use domain::clat::engine::ClatTranslator;
use domain::clat::entity::{LinkType, TranslateOutcome};
use domain::common::entity::{Environment, KernelVersion, SdkLevel};
use domain::packet::entity::SkBuff;
use ebpf_common::clat::{ClatEgress4Value, ClatIngress6Value};

const PFX96: [u8; 16] = [0, 0x64, 0xff, 0x9b, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
const LOCAL6: [u8; 16] = [0x20, 0x01, 0x0d, 0xb8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x04, 0x64];

// Layout:
//   [0]    = selector: bit 0 egress, bit 1 ethernet ingress, bit 2 pre-4.14 kernel
//   rest   = frame bytes; the session addresses are patched in so most
//            inputs reach the translation path
fuzz_target!(|data: &[u8]| {
    let Some((&selector, frame)) = data.split_first() else {
        return;
    };
    let kernel = if selector & 4 != 0 {
        KernelVersion::new(4, 9, 0)
    } else {
        KernelVersion::new(6, 1, 0)
    };
    let t = ClatTranslator::new(Environment::new(kernel, SdkLevel::V25Q2));
    let mut frame = frame.to_vec();

    if selector & 1 != 0 {
        if frame.len() >= 20 {
            frame[12..16].copy_from_slice(&[192, 0, 0, 4]);
        }
        let mut skb = SkBuff::raw_ip(frame, 9);
        let session = ClatEgress4Value {
            local6: LOCAL6,
            pfx96: PFX96,
            oif: 3,
            oif_is_ethernet: 0,
            _pad: [0; 3],
            packets: 0,
            bytes: 0,
        };
        if t.egress4_key(&skb).is_some() {
            check(t.translate_egress4(&mut skb, &session), &skb, 0);
        }
    } else {
        let link = if selector & 2 != 0 {
            LinkType::Ethernet
        } else {
            LinkType::RawIp
        };
        let l2 = if link == LinkType::Ethernet { 14 } else { 0 };
        if frame.len() >= l2 + 40 {
            frame[l2 + 8..l2 + 20].copy_from_slice(&PFX96[..12]);
            frame[l2 + 24..l2 + 40].copy_from_slice(&LOCAL6);
        }
        let skb = match link {
            LinkType::Ethernet => SkBuff::ethernet(frame, 3),
            LinkType::RawIp => Ok(SkBuff::raw_ip(frame, 3)),
        };
        let Ok(mut skb) = skb else {
            return;
        };
        let session = ClatIngress6Value {
            oif: 9,
            local4: [192, 0, 0, 4],
            packets: 0,
            bytes: 0,
        };
        if t.ingress6_key(&skb, link).is_some() {
            check(t.translate_ingress6(&mut skb, link, &session), &skb, l2);
        }
    }
});

fn check(outcome: TranslateOutcome, skb: &SkBuff, l2: usize) {
    if let TranslateOutcome::Translated { bytes } = outcome {
        assert_eq!(bytes as usize, skb.data.len() - l2);
    }
}
