use domain::clat::entity::{ClatEgressSession, ClatIngressSession};
use ebpf_common::config::{CLAT_EGRESS4_MAP_SIZE, CLAT_INGRESS6_MAP_SIZE};
use serde::{Deserialize, Serialize};

use super::common::{ConfigError, check_limit, parse_ipv4, parse_ipv6};

/// 464XLAT sessions: one entry per stacked IPv4 interface.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClatConfig {
    #[serde(default)]
    pub sessions: Vec<ClatSessionConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClatSessionConfig {
    /// IPv6 uplink.
    pub uplink_ifindex: u32,
    #[serde(default)]
    pub uplink_is_ethernet: bool,
    /// Stacked IPv4 interface (the tun device).
    pub v4_ifindex: u32,
    /// NAT64 /96 prefix, e.g. `64:ff9b::`.
    pub pfx96: String,
    pub local6: String,
    pub local4: String,
    /// Redirect translated ingress frames to `v4_ifindex`; otherwise they
    /// continue on the uplink.
    #[serde(default = "default_true")]
    pub redirect_ingress: bool,
}

fn default_true() -> bool {
    true
}

impl ClatConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let max = CLAT_INGRESS6_MAP_SIZE.min(CLAT_EGRESS4_MAP_SIZE);
        check_limit("clat.sessions", self.sessions.len(), max)?;
        self.sessions()?;
        Ok(())
    }

    /// Both halves of every configured session.
    pub fn sessions(&self) -> Result<Vec<(ClatIngressSession, ClatEgressSession)>, ConfigError> {
        self.sessions
            .iter()
            .enumerate()
            .map(|(i, s)| s.to_domain(i))
            .collect()
    }
}

impl ClatSessionConfig {
    fn to_domain(&self, idx: usize) -> Result<(ClatIngressSession, ClatEgressSession), ConfigError> {
        let field = |name: &str| format!("clat.sessions[{idx}].{name}");
        let pfx96 = parse_ipv6(&field("pfx96"), &self.pfx96)?;
        let local6 = parse_ipv6(&field("local6"), &self.local6)?;
        let local4 = parse_ipv4(&field("local4"), &self.local4)?;

        let ingress = ClatIngressSession {
            iif: self.uplink_ifindex,
            pfx96,
            local6,
            local4,
            oif: if self.redirect_ingress { self.v4_ifindex } else { 0 },
        };
        let egress = ClatEgressSession {
            iif: self.v4_ifindex,
            local4,
            local6,
            pfx96,
            oif: self.uplink_ifindex,
            oif_is_ethernet: self.uplink_is_ethernet,
        };
        ingress
            .validate()
            .map_err(|e| ConfigError::validation(field("ingress"), e.to_string()))?;
        egress
            .validate()
            .map_err(|e| ConfigError::validation(field("egress"), e.to_string()))?;
        Ok((ingress, egress))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn session() -> ClatSessionConfig {
        ClatSessionConfig {
            uplink_ifindex: 3,
            uplink_is_ethernet: false,
            v4_ifindex: 9,
            pfx96: "64:ff9b::".to_string(),
            local6: "2001:db8::464".to_string(),
            local4: "192.0.0.4".to_string(),
            redirect_ingress: true,
        }
    }

    #[test]
    fn session_halves_mirror_each_other() {
        let cfg = ClatConfig {
            sessions: vec![session()],
        };
        let (ingress, egress) = cfg.sessions().unwrap().remove(0);
        assert_eq!((ingress.iif, ingress.oif), (3, 9));
        assert_eq!((egress.iif, egress.oif), (9, 3));
        assert_eq!(ingress.local4, Ipv4Addr::new(192, 0, 0, 4));
        assert_eq!(egress.local6, ingress.local6);
    }

    #[test]
    fn no_redirect_keeps_frames_on_uplink() {
        let cfg = ClatConfig {
            sessions: vec![ClatSessionConfig {
                redirect_ingress: false,
                ..session()
            }],
        };
        assert_eq!(cfg.sessions().unwrap()[0].0.oif, 0);
    }

    #[test]
    fn bad_address_names_field() {
        let cfg = ClatConfig {
            sessions: vec![ClatSessionConfig {
                local4: "2001:db8::1".to_string(),
                ..session()
            }],
        };
        match cfg.validate() {
            Err(ConfigError::InvalidValue { field, .. }) => {
                assert_eq!(field, "clat.sessions[0].local4");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn zero_uplink_rejected() {
        let cfg = ClatConfig {
            sessions: vec![ClatSessionConfig {
                uplink_ifindex: 0,
                ..session()
            }],
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn too_many_sessions() {
        let cfg = ClatConfig {
            sessions: vec![session(); CLAT_INGRESS6_MAP_SIZE as usize + 1],
        };
        assert!(cfg.validate().is_err());
    }
}
