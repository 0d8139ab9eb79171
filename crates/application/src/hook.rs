use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Every attach point the agent exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hook {
    CgroupSkbIngress,
    CgroupSkbEgress,
    XtBpfIngress,
    XtBpfEgress,
    XtAllowlist,
    XtDenylist,
    TcIngressAccount,
    ClatIngress6Ether,
    ClatIngress6RawIp,
    ClatEgress4RawIp,
}

impl Hook {
    pub const ALL: [Self; 10] = [
        Self::CgroupSkbIngress,
        Self::CgroupSkbEgress,
        Self::XtBpfIngress,
        Self::XtBpfEgress,
        Self::XtAllowlist,
        Self::XtDenylist,
        Self::TcIngressAccount,
        Self::ClatIngress6Ether,
        Self::ClatIngress6RawIp,
        Self::ClatEgress4RawIp,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CgroupSkbIngress => "cgroup_skb_ingress",
            Self::CgroupSkbEgress => "cgroup_skb_egress",
            Self::XtBpfIngress => "xt_bpf_ingress",
            Self::XtBpfEgress => "xt_bpf_egress",
            Self::XtAllowlist => "xt_allowlist",
            Self::XtDenylist => "xt_denylist",
            Self::TcIngressAccount => "tc_ingress_account",
            Self::ClatIngress6Ether => "clat_ingress6_ether",
            Self::ClatIngress6RawIp => "clat_ingress6_rawip",
            Self::ClatEgress4RawIp => "clat_egress4_rawip",
        }
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Hook {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|h| h.as_str() == s)
            .ok_or_else(|| format!("unknown hook '{s}'"))
    }
}

// ── Return values ───────────────────────────────────────────────────

/// cgroup skb program result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkbVerdict {
    Pass,
    Drop,
}

/// cgroup sock / sock_addr program result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SockVerdict {
    Allow,
    Disallow,
}

/// xt_bpf match result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XtMatch {
    Match,
    NoMatch,
}

/// tc classifier action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "action")]
pub enum TcAction {
    /// Continue with the next classifier, leaving the frame as is.
    Pipe,
    /// Fall back to the qdisc's default.
    Unspec,
    Shot,
    /// Send the frame to `ifindex`, into its receive path when `ingress`.
    Redirect { ifindex: u32, ingress: bool },
}

/// Uniform view of a hook result for logs and metrics.
pub trait HookResult {
    fn as_str(&self) -> &'static str;
}

impl HookResult for SkbVerdict {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Drop => "drop",
        }
    }
}

impl HookResult for SockVerdict {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Disallow => "disallow",
        }
    }
}

impl HookResult for XtMatch {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Match => "match",
            Self::NoMatch => "nomatch",
        }
    }
}

impl HookResult for TcAction {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Pipe => "pipe",
            Self::Unspec => "unspec",
            Self::Shot => "shot",
            Self::Redirect { .. } => "redirect",
        }
    }
}

/// Address argument of the bind/connect/sendmsg/recvmsg hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SockAddr {
    pub family: u16,
    pub protocol: u16,
    /// Host order; 0 asks the kernel to pick.
    pub port: u16,
}
