// SPDX-License-Identifier: Apache-2.0

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::{AddressFamily, ErrorKind, IpPrefix, NetdError};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RouteProtocol {
    /// Route configured by administrator.
    Static,
    /// Route installed by anything else: kernel, DHCP, RA, routing daemons.
    Dynamic,
}

impl std::fmt::Display for RouteProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Static => "static",
                Self::Dynamic => "dynamic",
            }
        )
    }
}

impl std::str::FromStr for RouteProtocol {
    type Err = NetdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "static" => Ok(Self::Static),
            "dynamic" => Ok(Self::Dynamic),
            _ => Err(NetdError::new(
                ErrorKind::SemanticError,
                format!(
                    "Invalid route protocol {s}, expecting static or dynamic"
                ),
            )),
        }
    }
}

/// Address assignment for one interface.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct InterfaceConfig {
    pub name: String,
    pub family: AddressFamily,
    pub address: IpPrefix,
    /// FIB the interface is bound to, 0 when not specified.
    pub fib: u32,
    /// FIB used by tunnel encapsulated traffic.
    pub tunnel_fib: Option<u32>,
}

impl InterfaceConfig {
    pub fn new(name: &str, address: IpPrefix) -> Self {
        Self {
            name: name.to_string(),
            family: address.family(),
            address,
            fib: 0,
            tunnel_fib: None,
        }
    }
}

/// Static route to add.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct RouteConfig {
    pub family: AddressFamily,
    pub destination: IpPrefix,
    pub gateway: IpAddr,
    /// `None` means the default FIB of the route configurator.
    pub fib: Option<u32>,
    pub protocol: RouteProtocol,
}

impl RouteConfig {
    pub fn new(destination: IpPrefix, gateway: IpAddr) -> Self {
        Self {
            family: destination.family(),
            destination,
            gateway,
            fib: None,
            protocol: RouteProtocol::Static,
        }
    }
}

/// Independent filters of `show route`. Each `None` means no filtering on
/// that property, except for `fib` where `None` means the default FIB.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct RouteFilter {
    pub fib: Option<u32>,
    pub protocol: Option<RouteProtocol>,
    pub family: Option<AddressFamily>,
}

/// Route removal request. Without `destination`, every route matching the
/// protocol, family and FIB filters is removed.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct RouteDeletion {
    pub protocol: RouteProtocol,
    pub fib: Option<u32>,
    pub family: Option<AddressFamily>,
    pub destination: Option<IpPrefix>,
    pub gateway: Option<IpAddr>,
}

impl Default for RouteDeletion {
    fn default() -> Self {
        Self {
            protocol: RouteProtocol::Static,
            fib: None,
            family: None,
            destination: None,
            gateway: None,
        }
    }
}

impl RouteDeletion {
    pub fn is_bulk(&self) -> bool {
        self.destination.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShowTarget {
    /// `show` without target prints usage.
    Help,
    /// Interface type name or interface name, `None` for all.
    Interface(Option<String>),
    Route(RouteFilter),
}

/// Change held by the staging buffer until commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigEntry {
    Interface(InterfaceConfig),
    Route(RouteConfig),
}

impl std::fmt::Display for ConfigEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Interface(i) => {
                write!(f, "interface {} {} {}", i.name, i.family, i.address)
            }
            Self::Route(r) => write!(
                f,
                "route {} {} via {} fib {}",
                r.family,
                r.destination,
                r.gateway,
                r.fib.map(|v| v.to_string()).unwrap_or("default".into())
            ),
        }
    }
}

/// A fully validated command. The grammar engine never produces a
/// partially populated value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Show(ShowTarget),
    Set(ConfigEntry),
    Delete(RouteDeletion),
    Commit,
    Save,
    Discard,
}

// Renders the canonical CLI form which parses back into an identical
// command.
impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Show(ShowTarget::Help) => write!(f, "show"),
            Self::Show(ShowTarget::Interface(None)) => {
                write!(f, "show interface")
            }
            Self::Show(ShowTarget::Interface(Some(filter))) => {
                write!(f, "show interface {filter}")
            }
            Self::Show(ShowTarget::Route(filter)) => {
                write!(f, "show route")?;
                if let Some(fib) = filter.fib {
                    write!(f, " fib {fib}")?;
                }
                if let Some(protocol) = filter.protocol {
                    write!(f, " protocol {protocol}")?;
                }
                if let Some(family) = filter.family {
                    write!(f, " {family}")?;
                }
                Ok(())
            }
            Self::Set(ConfigEntry::Interface(conf)) => {
                write!(
                    f,
                    "set interface {} {} addr {}",
                    conf.name, conf.family, conf.address
                )?;
                if conf.fib != 0 {
                    write!(f, " fib {}", conf.fib)?;
                }
                if let Some(tunnel_fib) = conf.tunnel_fib {
                    write!(f, " tunnelfib {tunnel_fib}")?;
                }
                Ok(())
            }
            Self::Set(ConfigEntry::Route(conf)) => {
                write!(f, "set route protocol {}", conf.protocol)?;
                if let Some(fib) = conf.fib {
                    write!(f, " fib {fib}")?;
                }
                write!(
                    f,
                    " {} {} {}",
                    conf.family, conf.destination, conf.gateway
                )
            }
            Self::Delete(del) => {
                write!(f, "delete route protocol {}", del.protocol)?;
                if let Some(fib) = del.fib {
                    write!(f, " fib {fib}")?;
                }
                if let Some(family) = del.family {
                    write!(f, " {family}")?;
                    if let Some(dst) = del.destination {
                        write!(f, " {dst}")?;
                        if let Some(gw) = del.gateway {
                            write!(f, " {gw}")?;
                        }
                    }
                }
                Ok(())
            }
            Self::Commit => write!(f, "commit"),
            Self::Save => write!(f, "save"),
            Self::Discard => write!(f, "discard"),
        }
    }
}
