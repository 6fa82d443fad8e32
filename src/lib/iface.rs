// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::{AddressFamily, IpPrefix};

// Driver name prefixes of ethernet NICs.
const ETHERNET_DRIVERS: [&str; 14] = [
    "em", "igb", "ix", "bge", "fxp", "re", "rl", "sis", "sk", "ste", "ti",
    "tx", "vx", "xl",
];

#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum InterfaceType {
    Ethernet,
    Bridge,
    Gif,
    Tun,
    Tap,
    Vlan,
    Loopback,
    Unknown,
}

impl Default for InterfaceType {
    fn default() -> Self {
        Self::Unknown
    }
}

impl InterfaceType {
    pub const FILTERABLE: [Self; 7] = [
        Self::Ethernet,
        Self::Bridge,
        Self::Gif,
        Self::Tun,
        Self::Tap,
        Self::Vlan,
        Self::Loopback,
    ];

    /// Guess the interface type from its name, the way interfaces are
    /// named after their driver.
    pub fn from_name(name: &str) -> Self {
        if ETHERNET_DRIVERS.iter().any(|d| name.starts_with(d)) {
            return Self::Ethernet;
        }
        for t in [Self::Bridge, Self::Gif, Self::Tun, Self::Tap, Self::Vlan] {
            if name.starts_with(t.filter_name()) {
                return t;
            }
        }
        if name.starts_with("lo") {
            Self::Loopback
        } else {
            Self::Unknown
        }
    }

    /// Name accepted by `show interface <type>`.
    pub fn filter_name(&self) -> &'static str {
        match self {
            Self::Ethernet => "ethernet",
            Self::Bridge => "bridge",
            Self::Gif => "gif",
            Self::Tun => "tun",
            Self::Tap => "tap",
            Self::Vlan => "vlan",
            Self::Loopback => "lo",
            Self::Unknown => "unknown",
        }
    }

    fn from_filter(filter: &str) -> Option<Self> {
        Self::FILTERABLE
            .iter()
            .find(|t| t.filter_name() == filter)
            .cloned()
    }
}

impl std::fmt::Display for InterfaceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.filter_name())
    }
}

/// Selection of `show interface [WORD]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterfaceFilter {
    All,
    Type(InterfaceType),
    /// Interface name prefix.
    Name(String),
}

impl InterfaceFilter {
    pub fn new(filter: Option<&str>) -> Self {
        match filter {
            None | Some("") => Self::All,
            Some(f) => match InterfaceType::from_filter(f) {
                Some(t) => Self::Type(t),
                None => Self::Name(f.to_string()),
            },
        }
    }

    pub fn matches(&self, iface: &InterfaceInfo) -> bool {
        match self {
            Self::All => true,
            Self::Type(t) => &iface.iface_type == t,
            Self::Name(prefix) => iface.name.starts_with(prefix.as_str()),
        }
    }
}

/// Running state of one interface.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub struct InterfaceInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub iface_type: InterfaceType,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub ipv4: Vec<IpPrefix>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub ipv6: Vec<IpPrefix>,
    pub fib: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tunnel_fib: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtu: Option<u32>,
}

impl InterfaceInfo {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            iface_type: InterfaceType::from_name(name),
            ..Default::default()
        }
    }

    pub fn addresses(&self, family: AddressFamily) -> &[IpPrefix] {
        match family {
            AddressFamily::Inet4 => self.ipv4.as_slice(),
            AddressFamily::Inet6 => self.ipv6.as_slice(),
        }
    }

    /// Add `address` unless already assigned.
    pub(crate) fn add_address(&mut self, address: IpPrefix) {
        let addrs = match address.family() {
            AddressFamily::Inet4 => &mut self.ipv4,
            AddressFamily::Inet6 => &mut self.ipv6,
        };
        if !addrs.contains(&address) {
            addrs.push(address);
        }
    }
}
