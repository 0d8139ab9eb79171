use std::sync::Arc;
use std::time::Instant;

use domain::accounting::engine::{
    accounts_verdict, is_clat_egress, is_clat_socket, is_received_pkt_type, normalize_sock_uid,
    resolve_identity, stats_key,
};
use domain::accounting::entity::{AccountingIdentity, StatsDelta};
use domain::common::entity::{CounterGeneration, Direction, Environment};
use domain::common::error::DomainError;
use domain::firewall::engine::{FirewallEvaluator, resolve_dns};
use domain::firewall::entity::{OwnerPolicy, UidRules, Verdict};
use domain::packet::entity::SkBuff;
use domain::packet::extractor::NetReader;
use domain::packet::trace::build_packet_trace;
use ebpf_common::config::{
    CURRENT_STATS_MAP_CONFIGURATION_KEY, DEFAULT_CONFIG, UID_RULES_CONFIGURATION_KEY,
};
use ebpf_common::uid::{AID_SYSTEM, OVERFLOW_UID, is_system_uid};
use ports::secondary::metrics_port::MetricsPort;

use crate::hook::{Hook, HookResult, SkbVerdict, TcAction, XtMatch};
use crate::map_ports::MapPorts;

/// Per-packet firewall and traffic accounting hooks.
///
/// Every method runs to completion without locks held across calls. Policy
/// tables are read one at a time and may change between reads.
pub struct TrafficAppService {
    evaluator: FirewallEvaluator,
    maps: MapPorts,
    metrics: Arc<dyn MetricsPort>,
    started: Instant,
}

impl TrafficAppService {
    pub fn new(env: Environment, maps: MapPorts, metrics: Arc<dyn MetricsPort>) -> Self {
        Self {
            evaluator: FirewallEvaluator::new(env),
            maps,
            metrics,
            started: Instant::now(),
        }
    }

    pub fn environment(&self) -> Environment {
        self.evaluator.environment()
    }

    // ── cgroup skb ──────────────────────────────────────────────────

    pub fn cgroup_skb_ingress(&self, skb: &SkBuff) -> SkbVerdict {
        self.finish(Hook::CgroupSkbIngress, self.traffic_account(skb, Direction::Ingress))
    }

    pub fn cgroup_skb_egress(&self, skb: &SkBuff) -> SkbVerdict {
        self.finish(Hook::CgroupSkbEgress, self.traffic_account(skb, Direction::Egress))
    }

    fn traffic_account(&self, skb: &SkBuff, direction: Direction) -> SkbVerdict {
        let sock_uid = normalize_sock_uid(skb.sock_uid());
        let tag_entry = self.maps.cookie_tags.lookup(skb.cookie());
        let identity = resolve_identity(sock_uid, tag_entry);

        // Already accounted on the stacked v4 interface.
        if is_clat_egress(direction, &identity) {
            return SkbVerdict::Pass;
        }

        let policy = self.owner_policy(skb, sock_uid, direction);
        let matched = self.evaluator.owner_match(skb, sock_uid, direction, &policy);
        let (mut verdict, uid) = resolve_dns(matched, identity.uid, identity.tag, sock_uid);
        let identity = AccountingIdentity {
            uid,
            tag: identity.tag,
        };

        if let Some(query) = self.evaluator.local_net_query(skb, uid, direction, verdict) {
            let blocked = self.maps.policy.is_local_net_blocked_uid(uid);
            let access = if blocked {
                self.maps.policy.local_net_access(&query.to_key())
            } else {
                None
            };
            verdict = FirewallEvaluator::local_net_verdict(verdict, blocked, access);
        }

        if !accounts_verdict(direction, verdict) {
            tracing::debug!(uid, ifindex = skb.ifindex, %direction, "dropping egress packet");
            return SkbVerdict::Drop;
        }

        let counter_set = self.maps.stats.counter_set(uid).unwrap_or(0);
        let key = stats_key(identity, counter_set, skb.ifindex);

        let Some(selector) = self
            .maps
            .configuration
            .configuration(CURRENT_STATS_MAP_CONFIGURATION_KEY)
        else {
            return SkbVerdict::Pass;
        };

        self.trace_packet(skb, direction, identity);

        // Anything other than A selects B.
        let generation = CounterGeneration::from_config(selector).unwrap_or(CounterGeneration::B);
        let delta = StatsDelta::for_frame(skb.len(), skb.is_ipv6());
        self.report(self.maps.stats.accumulate(generation, key, direction, delta));
        self.report(self.maps.stats.accumulate_app_uid(uid, direction, delta));
        self.metrics
            .record_bytes_accounted(direction.as_str(), delta.bytes);

        if verdict == Verdict::Pass {
            SkbVerdict::Pass
        } else {
            tracing::debug!(uid, ifindex = skb.ifindex, %direction, "dropping ingress packet");
            SkbVerdict::Drop
        }
    }

    fn owner_policy(&self, skb: &SkBuff, uid: u32, direction: Direction) -> OwnerPolicy {
        if is_system_uid(uid) {
            return OwnerPolicy::default();
        }
        let enabled = self
            .maps
            .configuration
            .configuration(UID_RULES_CONFIGURATION_KEY)
            .unwrap_or(DEFAULT_CONFIG);
        let ingress_discard = self
            .evaluator
            .ingress_discard_key(skb, direction)
            .and_then(|daddr| self.maps.policy.ingress_discard(&daddr));
        OwnerPolicy {
            enabled: UidRules::from_bits_truncate(enabled),
            owner: self.maps.policy.uid_owner(uid),
            ingress_discard,
        }
    }

    fn trace_packet(&self, skb: &SkBuff, direction: Direction, identity: AccountingIdentity) {
        let env = self.evaluator.environment();
        if !env.has_packet_trace() || !self.maps.configuration.packet_trace_enabled() {
            return;
        }
        let now = u64::try_from(self.started.elapsed().as_nanos()).unwrap_or(u64::MAX);
        let reader = NetReader::new(skb, env);
        let trace = build_packet_trace(&reader, direction, identity.uid, identity.tag, now);
        if !self.maps.trace.emit(trace) {
            self.metrics.record_trace_dropped();
        }
    }

    // ── Interface accounting ────────────────────────────────────────

    /// iptables ingress accounting. Clat daemon traffic never reaches this
    /// point: it is dropped in raw PREROUTING first.
    pub fn xt_bpf_ingress(&self, skb: &SkBuff) -> XtMatch {
        self.account_iface(skb, Direction::Ingress);
        self.finish(Hook::XtBpfIngress, XtMatch::Match)
    }

    /// iptables egress accounting, skipping the clat daemon's sockets.
    pub fn xt_bpf_egress(&self, skb: &SkBuff) -> XtMatch {
        let sock_uid = skb.sock_uid();
        if sock_uid == AID_SYSTEM
            && is_clat_socket(sock_uid, self.maps.cookie_tags.lookup(skb.cookie()))
        {
            return self.finish(Hook::XtBpfEgress, XtMatch::NoMatch);
        }
        self.account_iface(skb, Direction::Egress);
        self.finish(Hook::XtBpfEgress, XtMatch::Match)
    }

    /// tc ingress accounting, before any later classifier may drop the frame.
    pub fn tc_ingress_account(&self, skb: &SkBuff) -> TcAction {
        if is_received_pkt_type(skb.pkt_type) {
            self.account_iface(skb, Direction::Ingress);
        }
        self.finish(Hook::TcIngressAccount, TcAction::Unspec)
    }

    fn account_iface(&self, skb: &SkBuff, direction: Direction) {
        let delta = StatsDelta::for_frame(skb.len(), skb.is_ipv6());
        self.report(self.maps.stats.accumulate_iface(skb.ifindex, direction, delta));
    }

    // ── xt_bpf owner matches ────────────────────────────────────────

    pub fn xt_allowlist_match(&self, skb: &SkBuff) -> XtMatch {
        let sock_uid = skb.sock_uid();
        let matched = is_system_uid(sock_uid)
            || sock_uid == OVERFLOW_UID
            || self
                .maps
                .policy
                .uid_owner(sock_uid)
                .is_some_and(|o| o.rules.contains(UidRules::HAPPY_BOX));
        self.finish(Hook::XtAllowlist, xt(matched))
    }

    pub fn xt_denylist_match(&self, skb: &SkBuff) -> XtMatch {
        let penalty_box = UidRules::PENALTY_BOX_USER | UidRules::PENALTY_BOX_ADMIN;
        let matched = self
            .maps
            .policy
            .uid_owner(skb.sock_uid())
            .is_some_and(|o| o.rules.intersects(penalty_box));
        self.finish(Hook::XtDenylist, xt(matched))
    }

    // ── Helpers ─────────────────────────────────────────────────────

    fn finish<R: HookResult>(&self, hook: Hook, result: R) -> R {
        self.metrics.record_packet(hook.as_str(), result.as_str());
        result
    }

    fn report(&self, result: Result<(), DomainError>) {
        if let Err(e) = result {
            let map = e.map_name().unwrap_or("unknown");
            self.metrics.record_map_error(map);
            tracing::warn!(map, error = %e, "stats update failed");
        }
    }
}

fn xt(matched: bool) -> XtMatch {
    if matched {
        XtMatch::Match
    } else {
        XtMatch::NoMatch
    }
}
