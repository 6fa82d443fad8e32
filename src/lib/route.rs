// SPDX-License-Identifier: Apache-2.0

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::{AddressFamily, IpPrefix, RouteDeletion, RouteProtocol};

/// Entry of a forwarding table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub struct RouteInfo {
    pub destination: IpPrefix,
    /// `None` for routes reaching a directly connected network.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway: Option<IpAddr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interface: Option<String>,
    pub fib: u32,
    pub protocol: RouteProtocol,
}

impl RouteInfo {
    pub fn new(
        destination: IpPrefix,
        gateway: Option<IpAddr>,
        fib: u32,
        protocol: RouteProtocol,
    ) -> Self {
        Self {
            destination,
            gateway,
            interface: None,
            fib,
            protocol,
        }
    }

    pub fn family(&self) -> AddressFamily {
        self.destination.family()
    }

    /// Route flags in `netstat -r` notation: `U` up, `G` gateway, `S` static.
    pub fn flags(&self) -> String {
        let mut ret = "U".to_string();
        if self.gateway.is_some() {
            ret.push('G');
        }
        if self.protocol == RouteProtocol::Static {
            ret.push('S');
        }
        ret
    }

    /// Whether a deletion request resolved to `fib` selects this route.
    pub fn is_match(&self, del: &RouteDeletion, fib: u32) -> bool {
        if self.fib != fib || self.protocol != del.protocol {
            return false;
        }
        if let Some(family) = del.family {
            if self.family() != family {
                return false;
            }
        }
        if let Some(dst) = del.destination.as_ref() {
            if &self.destination != dst {
                return false;
            }
        }
        if let Some(gw) = del.gateway.as_ref() {
            if self.gateway.as_ref() != Some(gw) {
                return false;
            }
        }
        true
    }
}

/// Route query handed to the route configurator. Unlike
/// [crate::RouteFilter], the FIB is always resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct RouteQuery {
    pub fib: u32,
    pub protocol: Option<RouteProtocol>,
    pub family: Option<AddressFamily>,
}

impl RouteQuery {
    pub fn new(fib: u32) -> Self {
        Self {
            fib,
            protocol: None,
            family: None,
        }
    }

    pub fn matches(&self, route: &RouteInfo) -> bool {
        route.fib == self.fib
            && self.protocol.map_or(true, |p| p == route.protocol)
            && self.family.map_or(true, |f| f == route.family())
    }
}
