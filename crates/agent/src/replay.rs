use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, bail};
use application::hook::{Hook, HookResult, SockAddr, TcAction};
use domain::packet::entity::SkBuff;
use domain::tagging::entity::TagRequest;
use ebpf_common::net::AF_INET6;
use infrastructure::constants::{MAX_REPLAY_FRAME_LEN, MAX_REPLAY_FRAMES};
use serde::{Deserialize, Serialize};

use crate::startup::Agent;

/// One line of a replay file.
///
/// ```json
/// {"op":"frame","hook":"cgroup_skb_egress","frame":{"data":[69,0,...],"protocol":2048,"ifindex":3}}
/// {"op":"open","fd":7,"family":10,"protocol":6}
/// {"op":"tag","fd":7,"tag":42,"charge_uid":10123,"real_uid":10123}
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", deny_unknown_fields)]
pub enum ReplayRecord {
    /// A frame handed to `hook` (or the `--hook` default).
    Frame {
        #[serde(default)]
        hook: Option<Hook>,
        frame: SkBuff,
    },
    /// `inet_socket_create` for a socket owned by `uid`.
    SocketCreate { uid: u32 },
    /// Open a descriptor in the socket table.
    Open { fd: i32, family: u16, protocol: u16 },
    /// Close a descriptor; its tag entry is released with it.
    Close { fd: i32 },
    Bind(SockAddr),
    Tag(TagRequest),
    Untag { fd: i32 },
    /// Point accounting at the other generation and clear the old one.
    SwapGeneration,
}

/// What a replayed record produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayOutcome {
    pub line: usize,
    pub operation: String,
    pub result: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Parse a replay file. Blank lines and `#` comments are skipped.
pub fn read_records(path: &Path) -> anyhow::Result<Vec<(usize, ReplayRecord)>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    parse_records(BufReader::new(file))
}

pub fn parse_records(reader: impl BufRead) -> anyhow::Result<Vec<(usize, ReplayRecord)>> {
    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.with_context(|| format!("failed to read line {line_no}"))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if records.len() == MAX_REPLAY_FRAMES {
            bail!("replay file holds more than {MAX_REPLAY_FRAMES} records");
        }
        let record: ReplayRecord = serde_json::from_str(trimmed)
            .with_context(|| format!("invalid replay record on line {line_no}"))?;
        if let ReplayRecord::Frame { frame, .. } = &record
            && frame.data.len() > MAX_REPLAY_FRAME_LEN
        {
            bail!(
                "frame on line {line_no} is {} bytes, longer than {MAX_REPLAY_FRAME_LEN}",
                frame.data.len()
            );
        }
        records.push((line_no, record));
    }
    Ok(records)
}

/// Run every record through the agent in file order.
pub fn run(
    agent: &Agent,
    records: Vec<(usize, ReplayRecord)>,
    default_hook: Option<Hook>,
) -> anyhow::Result<Vec<ReplayOutcome>> {
    records
        .into_iter()
        .map(|(line, record)| run_record(agent, line, record, default_hook))
        .collect()
}

fn run_record(
    agent: &Agent,
    line: usize,
    record: ReplayRecord,
    default_hook: Option<Hook>,
) -> anyhow::Result<ReplayOutcome> {
    let outcome = |operation: &str, result: &str, detail: Option<String>| ReplayOutcome {
        line,
        operation: operation.to_string(),
        result: result.to_string(),
        detail,
    };

    Ok(match record {
        ReplayRecord::Frame { hook, frame } => {
            let Some(hook) = hook.or(default_hook) else {
                bail!("frame on line {line} names no hook and --hook was not given");
            };
            let (result, detail) = run_frame(agent, hook, frame);
            outcome(hook.as_str(), result, detail)
        }
        ReplayRecord::SocketCreate { uid } => {
            let verdict = agent.socket_hooks.inet_socket_create(uid);
            outcome("inet_socket_create", verdict.as_str(), Some(format!("uid={uid}")))
        }
        ReplayRecord::Open {
            fd,
            family,
            protocol,
        } => {
            let cookie = agent.sockets.open(fd, family, protocol);
            outcome("open", "ok", Some(format!("fd={fd} cookie={cookie}")))
        }
        ReplayRecord::Close { fd } => match agent.sockets.close(fd) {
            Some(info) => {
                agent.socket_hooks.inet_socket_release(info.cookie);
                outcome("close", "ok", Some(format!("fd={fd} cookie={}", info.cookie)))
            }
            None => outcome("close", "EBADF", Some(format!("fd={fd}"))),
        },
        ReplayRecord::Bind(addr) => {
            let verdict = if addr.family == AF_INET6 {
                agent.socket_hooks.inet6_bind(&addr)
            } else {
                agent.socket_hooks.inet4_bind(&addr)
            };
            outcome("bind", verdict.as_str(), Some(format!("port={}", addr.port)))
        }
        ReplayRecord::Tag(req) => {
            let detail = Some(format!("fd={} tag={} uid={}", req.fd, req.tag, req.charge_uid));
            match agent.tagging.tag_socket(&req) {
                Ok(()) => outcome("tag", "ok", detail),
                Err(e) => outcome("tag", e.errno_name(), detail),
            }
        }
        ReplayRecord::Untag { fd } => match agent.tagging.untag_socket(fd) {
            Ok(o) => outcome("untag", o.as_str(), Some(format!("fd={fd}"))),
            Err(e) => outcome("untag", e.errno_name(), Some(format!("fd={fd}"))),
        },
        ReplayRecord::SwapGeneration => {
            let old = agent.policy.swap_generation()?;
            agent.policy.clear_generation(old)?;
            let active = old.other();
            outcome("swap_generation", active.as_str(), Some(format!("cleared={}", old.as_str())))
        }
    })
}

fn run_frame(agent: &Agent, hook: Hook, mut skb: SkBuff) -> (&'static str, Option<String>) {
    match hook {
        Hook::CgroupSkbIngress => (agent.traffic.cgroup_skb_ingress(&skb).as_str(), None),
        Hook::CgroupSkbEgress => (agent.traffic.cgroup_skb_egress(&skb).as_str(), None),
        Hook::XtBpfIngress => (agent.traffic.xt_bpf_ingress(&skb).as_str(), None),
        Hook::XtBpfEgress => (agent.traffic.xt_bpf_egress(&skb).as_str(), None),
        Hook::XtAllowlist => (agent.traffic.xt_allowlist_match(&skb).as_str(), None),
        Hook::XtDenylist => (agent.traffic.xt_denylist_match(&skb).as_str(), None),
        Hook::TcIngressAccount => (agent.traffic.tc_ingress_account(&skb).as_str(), None),
        Hook::ClatIngress6Ether => {
            let action = agent.clat.ingress6_ether(&mut skb);
            (action.as_str(), tc_detail(action, &skb))
        }
        Hook::ClatIngress6RawIp => {
            let action = agent.clat.ingress6_rawip(&mut skb);
            (action.as_str(), tc_detail(action, &skb))
        }
        Hook::ClatEgress4RawIp => {
            let action = agent.clat.egress4_rawip(&mut skb);
            (action.as_str(), tc_detail(action, &skb))
        }
    }
}

fn tc_detail(action: TcAction, skb: &SkBuff) -> Option<String> {
    match action {
        TcAction::Redirect { ifindex, ingress } => Some(format!(
            "ifindex {ifindex} {}, {} bytes",
            if ingress { "ingress" } else { "egress" },
            skb.data.len()
        )),
        _ if skb.mark != 0 => Some(format!("mark={:#010x}", skb.mark)),
        _ => None,
    }
}
