use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use domain::clat::engine::ClatTranslator;
use domain::clat::entity::LinkType;
use domain::packet::entity::SkBuff;
use ebpf_common::clat::{ClatEgress4Value, ClatIngress6Value};
use ebpf_common::net::{IPPROTO_TCP, IPPROTO_UDP};

const PFX96: [u8; 16] = [0, 0x64, 0xff, 0x9b, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
const LOCAL6: [u8; 16] = [0x20, 0x01, 0x0d, 0xb8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x04, 0x64];

fn ipv6_tcp(payload: usize) -> Vec<u8> {
    let mut p = vec![0u8; 40 + 20 + payload];
    p[0] = 0x60;
    p[4..6].copy_from_slice(&((20 + payload) as u16).to_be_bytes());
    p[6] = IPPROTO_TCP;
    p[7] = 64;
    p[8..24].copy_from_slice(&PFX96);
    p[20..24].copy_from_slice(&[198, 51, 100, 7]);
    p[24..40].copy_from_slice(&LOCAL6);
    p
}

fn ipv4_udp(payload: usize) -> Vec<u8> {
    let total = 20 + 8 + payload;
    let mut p = vec![0u8; total];
    p[0] = 0x45;
    p[2..4].copy_from_slice(&(total as u16).to_be_bytes());
    p[6] = 0x40;
    p[8] = 64;
    p[9] = IPPROTO_UDP;
    p[12..16].copy_from_slice(&[192, 0, 0, 4]);
    p[16..20].copy_from_slice(&[198, 51, 100, 7]);
    let check = domain::clat::checksum::ipv4_header_checksum(&p[..20]);
    p[10..12].copy_from_slice(&check.to_be_bytes());
    p[26..28].copy_from_slice(&0x1234u16.to_be_bytes());
    p
}

fn bench_ingress(c: &mut Criterion) {
    let mut group = c.benchmark_group("clat_ingress6");
    let t = ClatTranslator::default();
    let session = ClatIngress6Value {
        oif: 9,
        local4: [192, 0, 0, 4],
        packets: 0,
        bytes: 0,
    };

    for &size in &[0usize, 512, 1400] {
        let data = ipv6_tcp(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &data, |b, data| {
            b.iter_batched(
                || SkBuff::raw_ip(data.clone(), 3),
                |mut skb| {
                    if t.ingress6_key(&skb, LinkType::RawIp).is_some() {
                        t.translate_ingress6(black_box(&mut skb), LinkType::RawIp, &session);
                    }
                    skb
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_egress(c: &mut Criterion) {
    let mut group = c.benchmark_group("clat_egress4");
    let t = ClatTranslator::default();
    let session = ClatEgress4Value {
        local6: LOCAL6,
        pfx96: PFX96,
        oif: 3,
        oif_is_ethernet: 0,
        _pad: [0; 3],
        packets: 0,
        bytes: 0,
    };

    for &size in &[0usize, 512, 1400] {
        let data = ipv4_udp(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &data, |b, data| {
            b.iter_batched(
                || SkBuff::raw_ip(data.clone(), 9),
                |mut skb| {
                    if t.egress4_key(&skb).is_some() {
                        t.translate_egress4(black_box(&mut skb), &session);
                    }
                    skb
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_ingress, bench_egress);
criterion_main!(benches);
