#![no_main]

use libfuzzer_sys::fuzz_target;

use domain::common::entity::{Direction, Environment};
use domain::firewall::engine::{FirewallEvaluator, resolve_dns};
use domain::firewall::entity::{IngressDiscardEntry, OwnerPolicy, UidOwnerEntry, UidRules, Verdict};
use domain::packet::entity::SkBuff;

// Layout:
//   [0..4]   = uid
//   [4..8]   = enabled rule classes
//   [8..12]  = owner rule classes
//   [12..16] = allowed iif / ifindex
//   [16]     = bit 0 ingress, bit 1 has owner, bit 2 has discard entry
//   [17..21] = tag
//   rest     = frame bytes (raw IP)
fuzz_target!(|data: &[u8]| {
    if data.len() < 21 {
        return;
    }
    let word = |i: usize| u32::from_le_bytes([data[i], data[i + 1], data[i + 2], data[i + 3]]);

    let uid = word(0);
    let enabled = UidRules::from_bits_truncate(word(4));
    let rules = UidRules::from_bits_truncate(word(8));
    let iif = word(12);
    let flags = data[16];
    let tag = word(17);

    let direction = if flags & 1 != 0 {
        Direction::Ingress
    } else {
        Direction::Egress
    };
    let policy = OwnerPolicy {
        enabled,
        owner: (flags & 2 != 0).then_some(UidOwnerEntry {
            rules,
            allowed_iif: iif,
        }),
        ingress_discard: (flags & 4 != 0).then_some(IngressDiscardEntry {
            allowed_iif: [iif, iif.wrapping_add(1)],
        }),
    };
    let skb = SkBuff::raw_ip(data[21..].to_vec(), iif.rotate_left(7) % 16);

    let eval = FirewallEvaluator::new(Environment::default());
    let verdict = eval.owner_match(&skb, uid, direction, &policy);

    // Enabled denylist classes on the owner always win for app UIDs.
    if uid % 100_000 >= 10_000
        && !eval.skip_owner_match(&skb, direction)
        && FirewallEvaluator::is_blocked_by_uid_rules(
            if skb.ifindex == 1 { enabled - UidRules::BACKGROUND } else { enabled },
            policy.owner.map(|o| o.rules).unwrap_or_default(),
        )
    {
        assert_eq!(verdict, Verdict::Drop);
    }

    let (resolved, _) = resolve_dns(verdict, uid, tag, uid);
    assert_ne!(resolved, Verdict::DropUnlessDns);
});
