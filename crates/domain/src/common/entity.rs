use std::fmt;
use std::str::FromStr;

use ebpf_common::config::{SELECT_MAP_A, SELECT_MAP_B};
use serde::{Deserialize, Serialize};

/// Direction of a packet relative to the local host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ingress,
    Egress,
}

impl Direction {
    pub fn is_egress(self) -> bool {
        matches!(self, Self::Egress)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ingress => "ingress",
            Self::Egress => "egress",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Running kernel version, compared lexicographically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KernelVersion {
    pub major: u16,
    pub minor: u16,
    pub sub: u16,
}

impl KernelVersion {
    pub const fn new(major: u16, minor: u16, sub: u16) -> Self {
        Self { major, minor, sub }
    }

    pub fn is_at_least(self, major: u16, minor: u16, sub: u16) -> bool {
        self >= Self::new(major, minor, sub)
    }
}

impl Default for KernelVersion {
    fn default() -> Self {
        Self::new(5, 10, 0)
    }
}

impl fmt::Display for KernelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.sub)
    }
}

impl FromStr for KernelVersion {
    type Err = String;

    /// Accepts `major.minor[.sub]`, ignoring any `-suffix` (e.g. `5.10.43-android12`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let release = s.split(['-', '+']).next().unwrap_or_default();
        let mut parts = release.split('.');
        let mut next = |name: &str, required: bool| -> Result<u16, String> {
            match parts.next() {
                Some(p) => p
                    .parse::<u16>()
                    .map_err(|_| format!("invalid kernel {name} component '{p}' in '{s}'")),
                None if required => Err(format!("kernel version '{s}' is missing {name}")),
                None => Ok(0),
            }
        };
        let major = next("major", true)?;
        let minor = next("minor", true)?;
        let sub = next("sub", false)?;
        Ok(Self::new(major, minor, sub))
    }
}

impl Serialize for KernelVersion {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for KernelVersion {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Platform release the packet path is running on. Ordered oldest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SdkLevel {
    #[serde(rename = "t")]
    T,
    #[serde(rename = "u")]
    U,
    #[serde(rename = "v")]
    V,
    #[default]
    #[serde(rename = "25q2")]
    V25Q2,
}

impl SdkLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::T => "t",
            Self::U => "u",
            Self::V => "v",
            Self::V25Q2 => "25q2",
        }
    }
}

impl fmt::Display for SdkLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SdkLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "t" => Ok(Self::T),
            "u" => Ok(Self::U),
            "v" => Ok(Self::V),
            "25q2" => Ok(Self::V25Q2),
            other => Err(format!("unknown sdk level '{other}'")),
        }
    }
}

/// Capabilities of the environment the hooks execute in.
///
/// Every hook consults this instead of probing: the same logic runs with
/// reduced behavior on older kernels and platform releases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Environment {
    pub kernel: KernelVersion,
    pub sdk: SdkLevel,
}

impl Environment {
    pub const fn new(kernel: KernelVersion, sdk: SdkLevel) -> Self {
        Self { kernel, sdk }
    }

    /// Network-relative loads exist from 4.19; older kernels read from the
    /// start of the frame.
    pub fn has_relative_loads(&self) -> bool {
        self.kernel.is_at_least(4, 19, 0)
    }

    /// Destination-based ingress discard needs relative loads.
    pub fn has_ingress_discard(&self) -> bool {
        self.has_relative_loads()
    }

    /// Shrinking the network header (IPv6 fragment removal) exists from 4.14.
    pub fn can_strip_fragment_header(&self) -> bool {
        self.kernel.is_at_least(4, 14, 0)
    }

    /// Ring buffers and the socket release hook arrived in 5.10.
    pub fn has_packet_trace(&self) -> bool {
        self.kernel.is_at_least(5, 10, 0)
    }

    pub fn has_sock_release_hook(&self) -> bool {
        self.kernel.is_at_least(5, 10, 0)
    }

    pub fn has_local_net_protection(&self) -> bool {
        self.sdk >= SdkLevel::V25Q2
    }
}

/// One of the two double-buffered stats maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CounterGeneration {
    A,
    B,
}

impl CounterGeneration {
    /// Decode the configuration slot value. Unknown values yield `None`.
    pub fn from_config(value: u32) -> Option<Self> {
        match value {
            SELECT_MAP_A => Some(Self::A),
            SELECT_MAP_B => Some(Self::B),
            _ => None,
        }
    }

    pub fn to_config(self) -> u32 {
        match self {
            Self::A => SELECT_MAP_A,
            Self::B => SELECT_MAP_B,
        }
    }

    pub fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
        }
    }
}
