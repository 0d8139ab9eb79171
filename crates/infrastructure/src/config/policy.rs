use domain::firewall::entity::{IngressDiscardEntry, LocalNetRule, UidOwnerEntry, UidRules};
use ebpf_common::config::{
    BLOCKED_PORTS_MAP_SIZE, INGRESS_DISCARD_MAP_SIZE, LOCAL_NET_ACCESS_MAP_SIZE,
    LOCAL_NET_BLOCKED_UID_MAP_SIZE, UID_COUNTERSET_MAP_SIZE, UID_OWNER_MAP_SIZE,
    UID_PERMISSION_MAP_SIZE,
};
use ebpf_common::uid::{PERMISSION_INTERNET, PERMISSION_NONE, PERMISSION_UPDATE_DEVICE_STATS};
use serde::{Deserialize, Serialize};

use super::common::{ConfigError, check_limit, parse_addr6, parse_cidr};

/// Firewall and accounting policy pushed into the maps at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    /// Globally enabled rule classes, e.g. `[dozable, standby]`.
    #[serde(default)]
    pub enabled_rules: Vec<String>,

    #[serde(default)]
    pub uid_rules: Vec<UidRuleConfig>,

    #[serde(default)]
    pub permissions: Vec<PermissionConfig>,

    #[serde(default)]
    pub counter_sets: Vec<CounterSetConfig>,

    #[serde(default)]
    pub ingress_discard: Vec<IngressDiscardConfig>,

    #[serde(default)]
    pub local_network: LocalNetworkConfig,

    #[serde(default)]
    pub blocked_ports: Vec<u16>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UidRuleConfig {
    pub uid: u32,
    #[serde(default)]
    pub rules: Vec<String>,
    /// Only ingress through this interface is allowed when `iif_match` is set.
    #[serde(default)]
    pub allowed_iif: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PermissionConfig {
    pub app_id: u32,
    /// `internet`, `update_device_stats`; empty means no network access.
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CounterSetConfig {
    pub uid: u32,
    pub set: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IngressDiscardConfig {
    pub address: String,
    /// One or two interfaces the address may be reached through.
    pub allowed_iif: Vec<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocalNetworkConfig {
    #[serde(default)]
    pub blocked_uids: Vec<u32>,
    #[serde(default)]
    pub rules: Vec<LocalNetRuleConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocalNetRuleConfig {
    pub if_index: u32,
    pub remote: String,
    #[serde(default)]
    pub protocol: Option<u16>,
    #[serde(default)]
    pub port: Option<u16>,
    pub allowed: bool,
}

pub(super) fn parse_rules(field: &str, names: &[String]) -> Result<UidRules, ConfigError> {
    names.iter().try_fold(UidRules::empty(), |acc, name| {
        UidRules::from_name(&name.trim().to_ascii_uppercase())
            .map(|r| acc | r)
            .ok_or_else(|| ConfigError::InvalidValue {
                field: field.to_string(),
                value: name.clone(),
                expected: "happy_box, penalty_box_user, dozable, standby, powersave, \
                           restricted, low_power_standby, iif_match, lockdown_vpn, \
                           oem_deny_1, oem_deny_2, oem_deny_3, background, penalty_box_admin"
                    .to_string(),
            })
    })
}

fn parse_permissions(field: &str, names: &[String]) -> Result<u8, ConfigError> {
    names.iter().try_fold(PERMISSION_NONE, |acc, name| {
        match name.trim().to_ascii_lowercase().as_str() {
            "internet" => Ok(acc | PERMISSION_INTERNET),
            "update_device_stats" => Ok(acc | PERMISSION_UPDATE_DEVICE_STATS),
            _ => Err(ConfigError::InvalidValue {
                field: field.to_string(),
                value: name.clone(),
                expected: "internet, update_device_stats".to_string(),
            }),
        }
    })
}

impl PolicyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_limit("policy.uid_rules", self.uid_rules.len(), UID_OWNER_MAP_SIZE)?;
        check_limit(
            "policy.permissions",
            self.permissions.len(),
            UID_PERMISSION_MAP_SIZE,
        )?;
        check_limit(
            "policy.counter_sets",
            self.counter_sets.len(),
            UID_COUNTERSET_MAP_SIZE,
        )?;
        check_limit(
            "policy.ingress_discard",
            self.ingress_discard.len(),
            INGRESS_DISCARD_MAP_SIZE,
        )?;
        check_limit(
            "policy.local_network.rules",
            self.local_network.rules.len(),
            LOCAL_NET_ACCESS_MAP_SIZE,
        )?;
        check_limit(
            "policy.local_network.blocked_uids",
            self.local_network.blocked_uids.len(),
            LOCAL_NET_BLOCKED_UID_MAP_SIZE,
        )?;
        // Every port has a bit; the limit only bounds the config size.
        check_limit(
            "policy.blocked_ports",
            self.blocked_ports.len(),
            BLOCKED_PORTS_MAP_SIZE * 64,
        )?;
        if self.blocked_ports.contains(&0) {
            return Err(ConfigError::validation(
                "policy.blocked_ports",
                "port 0 cannot be blocked",
            ));
        }

        // Parse everything once so errors surface at load time.
        self.enabled_rules()?;
        self.uid_owners()?;
        self.permission_entries()?;
        self.ingress_discard_entries()?;
        self.local_net_rules()?;
        Ok(())
    }

    pub fn enabled_rules(&self) -> Result<UidRules, ConfigError> {
        parse_rules("policy.enabled_rules", &self.enabled_rules)
    }

    pub fn uid_owners(&self) -> Result<Vec<(u32, UidOwnerEntry)>, ConfigError> {
        self.uid_rules
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let rules = parse_rules(&format!("policy.uid_rules[{i}].rules"), &r.rules)?;
                Ok((
                    r.uid,
                    UidOwnerEntry {
                        rules,
                        allowed_iif: r.allowed_iif,
                    },
                ))
            })
            .collect()
    }

    pub fn permission_entries(&self) -> Result<Vec<(u32, u8)>, ConfigError> {
        self.permissions
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let bits =
                    parse_permissions(&format!("policy.permissions[{i}]"), &p.permissions)?;
                Ok((p.app_id, bits))
            })
            .collect()
    }

    pub fn counter_set_entries(&self) -> Vec<(u32, u8)> {
        self.counter_sets.iter().map(|c| (c.uid, c.set)).collect()
    }

    pub fn ingress_discard_entries(
        &self,
    ) -> Result<Vec<([u8; 16], IngressDiscardEntry)>, ConfigError> {
        self.ingress_discard
            .iter()
            .enumerate()
            .map(|(i, d)| {
                let field = format!("policy.ingress_discard[{i}].allowed_iif");
                let allowed_iif = match d.allowed_iif.as_slice() {
                    [a] => [*a, *a],
                    [a, b] => [*a, *b],
                    _ => {
                        return Err(ConfigError::validation(
                            field,
                            "expected one or two interface indexes",
                        ));
                    }
                };
                Ok((parse_addr6(&d.address)?, IngressDiscardEntry { allowed_iif }))
            })
            .collect()
    }

    pub fn local_net_rules(&self) -> Result<Vec<LocalNetRule>, ConfigError> {
        self.local_network
            .rules
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let prefix = parse_cidr(&r.remote)?;
                let rule = LocalNetRule {
                    if_index: r.if_index,
                    remote: prefix.addr,
                    remote_prefix_len: prefix.prefix_len,
                    protocol: r.protocol,
                    remote_port: r.port,
                    allowed: r.allowed,
                };
                rule.validate().map_err(|e| {
                    ConfigError::validation(
                        format!("policy.local_network.rules[{i}]"),
                        e.to_string(),
                    )
                })?;
                Ok(rule)
            })
            .collect()
    }
}
