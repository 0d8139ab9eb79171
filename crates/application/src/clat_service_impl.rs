use std::sync::Arc;

use domain::clat::engine::ClatTranslator;
use domain::clat::entity::{ClatEgressSession, ClatIngressSession, LinkType, TranslateOutcome};
use domain::common::entity::Environment;
use domain::common::error::DomainError;
use domain::packet::entity::SkBuff;
use ports::secondary::clat_map_port::ClatMapPort;
use ports::secondary::metrics_port::MetricsPort;

use crate::hook::{Hook, HookResult, TcAction};

/// tc programs of the 464XLAT CLAT fast path, plus session management.
///
/// Anything the fast path cannot handle is left untouched for the userspace
/// daemon, which sees the same frame next.
pub struct ClatAppService {
    translator: ClatTranslator,
    sessions: Arc<dyn ClatMapPort>,
    metrics: Arc<dyn MetricsPort>,
}

impl ClatAppService {
    pub fn new(
        env: Environment,
        sessions: Arc<dyn ClatMapPort>,
        metrics: Arc<dyn MetricsPort>,
    ) -> Self {
        Self {
            translator: ClatTranslator::new(env),
            sessions,
            metrics,
        }
    }

    pub fn add_ingress_session(&self, session: &ClatIngressSession) -> Result<(), DomainError> {
        self.sessions.add_ingress_session(session)
    }

    pub fn add_egress_session(&self, session: &ClatEgressSession) -> Result<(), DomainError> {
        self.sessions.add_egress_session(session)
    }

    pub fn remove_sessions(
        &self,
        ingress: &ClatIngressSession,
        egress: &ClatEgressSession,
    ) -> Result<(), DomainError> {
        self.sessions.remove_ingress_session(&ingress.key())?;
        self.sessions.remove_egress_session(&egress.key())
    }

    // ── Ingress: IPv6 → IPv4 ────────────────────────────────────────

    pub fn ingress6_ether(&self, skb: &mut SkBuff) -> TcAction {
        let action = self.ingress6(skb, LinkType::Ethernet);
        self.finish(Hook::ClatIngress6Ether, action)
    }

    pub fn ingress6_rawip(&self, skb: &mut SkBuff) -> TcAction {
        let action = self.ingress6(skb, LinkType::RawIp);
        self.finish(Hook::ClatIngress6RawIp, action)
    }

    fn ingress6(&self, skb: &mut SkBuff, link: LinkType) -> TcAction {
        const DIRECTION: &str = "ingress6";
        let Some(key) = self.translator.ingress6_key(skb, link) else {
            return self.passthrough(DIRECTION, "not_candidate");
        };
        let Some(session) = self.sessions.ingress6(&key) else {
            return self.passthrough(DIRECTION, "no_session");
        };
        match self.translator.translate_ingress6(skb, link, &session) {
            TranslateOutcome::Untouched => self.passthrough(DIRECTION, "untranslatable"),
            TranslateOutcome::Marked => self.passthrough(DIRECTION, "marked"),
            TranslateOutcome::Translated { bytes } => {
                self.sessions.record_ingress6(&key, bytes);
                self.metrics.record_clat_translated(DIRECTION, bytes);
                // Redirect even back to the same interface so captures see
                // the IPv4 frame.
                if session.oif != 0 {
                    TcAction::Redirect {
                        ifindex: session.oif,
                        ingress: true,
                    }
                } else {
                    TcAction::Pipe
                }
            }
        }
    }

    // ── Egress: IPv4 → IPv6 ─────────────────────────────────────────

    pub fn egress4_rawip(&self, skb: &mut SkBuff) -> TcAction {
        let action = self.egress4(skb);
        self.finish(Hook::ClatEgress4RawIp, action)
    }

    fn egress4(&self, skb: &mut SkBuff) -> TcAction {
        const DIRECTION: &str = "egress4";
        let Some(key) = self.translator.egress4_key(skb) else {
            return self.passthrough(DIRECTION, "not_candidate");
        };
        let Some(session) = self.sessions.egress4(&key) else {
            return self.passthrough(DIRECTION, "no_session");
        };
        match self.translator.translate_egress4(skb, &session) {
            TranslateOutcome::Translated { bytes } => {
                self.sessions.record_egress4(&key, bytes);
                self.metrics.record_clat_translated(DIRECTION, bytes);
                TcAction::Redirect {
                    ifindex: session.oif,
                    ingress: false,
                }
            }
            TranslateOutcome::Untouched | TranslateOutcome::Marked => {
                self.passthrough(DIRECTION, "unusable_output")
            }
        }
    }

    fn passthrough(&self, direction: &str, reason: &str) -> TcAction {
        self.metrics.record_clat_passthrough(direction, reason);
        TcAction::Pipe
    }

    fn finish(&self, hook: Hook, action: TcAction) -> TcAction {
        self.metrics.record_packet(hook.as_str(), action.as_str());
        action
    }
}
