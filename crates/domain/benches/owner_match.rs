use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use domain::common::entity::{Direction, Environment};
use domain::firewall::engine::{FirewallEvaluator, resolve_dns};
use domain::firewall::entity::{OwnerPolicy, UidOwnerEntry, UidRules};
use domain::packet::entity::SkBuff;
use ebpf_common::net::IPPROTO_TCP;

fn tcp_v4(ifindex: u32) -> SkBuff {
    let mut p = vec![0u8; 60];
    p[0] = 0x45;
    p[9] = IPPROTO_TCP;
    p[20..22].copy_from_slice(&443u16.to_be_bytes());
    p[22..24].copy_from_slice(&40_000u16.to_be_bytes());
    p[32] = 0x50;
    p[33] = 0x10;
    SkBuff::raw_ip(p, ifindex)
}

fn policies() -> Vec<(&'static str, OwnerPolicy)> {
    vec![
        ("empty", OwnerPolicy::default()),
        (
            "denylisted",
            OwnerPolicy {
                enabled: UidRules::STANDBY,
                owner: Some(UidOwnerEntry {
                    rules: UidRules::STANDBY,
                    allowed_iif: 0,
                }),
                ingress_discard: None,
            },
        ),
        (
            "iif_restricted",
            OwnerPolicy {
                enabled: UidRules::DOZABLE,
                owner: Some(UidOwnerEntry {
                    rules: UidRules::DOZABLE | UidRules::IIF_MATCH,
                    allowed_iif: 7,
                }),
                ingress_discard: None,
            },
        ),
    ]
}

fn bench_owner_match(c: &mut Criterion) {
    let mut group = c.benchmark_group("owner_match");
    let eval = FirewallEvaluator::new(Environment::default());
    let skb = tcp_v4(3);

    for (name, policy) in policies() {
        for direction in [Direction::Ingress, Direction::Egress] {
            group.bench_with_input(
                BenchmarkId::new(name, direction.as_str()),
                &policy,
                |b, policy| {
                    b.iter(|| {
                        let v = eval.owner_match(black_box(&skb), 10_123, direction, policy);
                        resolve_dns(v, 10_123, 0, 10_123)
                    });
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_owner_match);
criterion_main!(benches);
