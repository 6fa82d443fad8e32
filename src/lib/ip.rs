// SPDX-License-Identifier: Apache-2.0

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{ErrorKind, NetdError};

const IPV4_ADDR_LEN: u8 = 32;
const IPV6_ADDR_LEN: u8 = 128;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum AddressFamily {
    /// Serialize and deserialize to/from `inet`.
    #[serde(rename = "inet")]
    Inet4,
    /// Serialize and deserialize to/from `inet6`.
    #[serde(rename = "inet6")]
    Inet6,
}

impl AddressFamily {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Inet4 => "inet",
            Self::Inet6 => "inet6",
        }
    }

    /// Prefix length used when an address carries no `/prefix`.
    pub fn max_prefix_len(&self) -> u8 {
        match self {
            Self::Inet4 => IPV4_ADDR_LEN,
            Self::Inet6 => IPV6_ADDR_LEN,
        }
    }

    pub fn of(ip: &IpAddr) -> Self {
        if ip.is_ipv6() {
            Self::Inet6
        } else {
            Self::Inet4
        }
    }
}

impl std::fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.keyword())
    }
}

impl FromStr for AddressFamily {
    type Err = NetdError;

    // `ipv4`/`ipv6` are the names used by the YANG model of the RPC surface.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inet" | "ipv4" => Ok(Self::Inet4),
            "inet6" | "ipv6" => Ok(Self::Inet6),
            _ => Err(NetdError::new(
                ErrorKind::SemanticError,
                format!(
                    "Invalid address family {s}, expecting inet or inet6"
                ),
            )),
        }
    }
}

/// IP address with prefix length, e.g. `192.0.2.1/24`.
/// The host bits are kept: an interface address and a route destination
/// share this type.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
    Deserialize,
)]
#[serde(into = "String", try_from = "String")]
pub struct IpPrefix {
    pub addr: IpAddr,
    pub prefix_len: u8,
}

impl IpPrefix {
    pub fn new(addr: IpAddr, prefix_len: u8) -> Self {
        Self { addr, prefix_len }
    }

    pub fn family(&self) -> AddressFamily {
        AddressFamily::of(&self.addr)
    }

    /// Parse `addr[/prefix]` for the selected family. Without `/prefix`,
    /// the prefix length is the full address length of `family`.
    pub fn parse(
        value: &str,
        family: AddressFamily,
    ) -> Result<Self, NetdError> {
        let (addr_str, prefix_str) = match value.split_once('/') {
            Some((a, p)) => (a, Some(p)),
            None => (value, None),
        };
        let addr = parse_addr(addr_str, family)?;
        let prefix_len = match prefix_str {
            None => family.max_prefix_len(),
            Some(p) => {
                let len = p.parse::<u8>().map_err(|e| {
                    NetdError::new(
                        ErrorKind::SemanticError,
                        format!("Invalid prefix length in {value}: {e}"),
                    )
                })?;
                if len > family.max_prefix_len() {
                    return Err(NetdError::new(
                        ErrorKind::SemanticError,
                        format!(
                            "Invalid prefix length in {value}: {family} \
                            prefix length cannot exceed {}",
                            family.max_prefix_len()
                        ),
                    ));
                }
                len
            }
        };
        Ok(Self { addr, prefix_len })
    }

    /// Same prefix with the host bits cleared, e.g. `10.0.0.0/8` for
    /// `10.1.2.3/8`.
    pub fn network(&self) -> Self {
        let addr = match self.addr {
            IpAddr::V4(ip) => {
                let mask = u32::MAX
                    .checked_shl(u32::from(IPV4_ADDR_LEN - self.prefix_len))
                    .unwrap_or(0);
                IpAddr::from(Ipv4Addr::from(u32::from(ip) & mask))
            }
            IpAddr::V6(ip) => {
                let mask = u128::MAX
                    .checked_shl(u32::from(IPV6_ADDR_LEN - self.prefix_len))
                    .unwrap_or(0);
                IpAddr::from(Ipv6Addr::from(u128::from(ip) & mask))
            }
        };
        Self::new(addr, self.prefix_len)
    }

    /// Parse a route destination, reduced to its network address.
    pub fn parse_network(
        value: &str,
        family: AddressFamily,
    ) -> Result<Self, NetdError> {
        Ok(Self::parse(value, family)?.network())
    }
}

impl std::fmt::Display for IpPrefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix_len)
    }
}

impl From<IpPrefix> for String {
    fn from(v: IpPrefix) -> String {
        v.to_string()
    }
}

impl TryFrom<String> for IpPrefix {
    type Error = NetdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let family = if value.contains(':') {
            AddressFamily::Inet6
        } else {
            AddressFamily::Inet4
        };
        Self::parse(value.as_str(), family)
    }
}

/// Parse a bare address, failing when it does not belong to `family`.
pub fn parse_addr(
    value: &str,
    family: AddressFamily,
) -> Result<IpAddr, NetdError> {
    let ip = IpAddr::from_str(value).map_err(|e| {
        NetdError::new(
            ErrorKind::SemanticError,
            format!("Invalid {family} address {value}: {e}"),
        )
    })?;
    if AddressFamily::of(&ip) != family {
        return Err(NetdError::new(
            ErrorKind::SemanticError,
            format!("Address {value} is not an {family} address"),
        ));
    }
    Ok(ip)
}
