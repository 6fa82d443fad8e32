// SPDX-License-Identifier: Apache-2.0

use std::net::IpAddr;
use std::str::FromStr;

use log::warn;

use crate::{
    nispor::{fib_to_table, table_to_fib},
    AddressFamily, ErrorKind, IpPrefix, NetdError, RouteConfig, RouteInfo,
    RouteProtocol,
};

const STATIC_ROUTE_PROTOCOLS: [nispor::RouteProtocol; 2] =
    [nispor::RouteProtocol::Boot, nispor::RouteProtocol::Static];

fn np_family_to_netd(family: &nispor::AddressFamily) -> Option<AddressFamily> {
    match family {
        nispor::AddressFamily::IPv4 => Some(AddressFamily::Inet4),
        nispor::AddressFamily::IPv6 => Some(AddressFamily::Inet6),
        _ => None,
    }
}

fn np_route_to_netd(np_route: &nispor::Route, fib: u32) -> Option<RouteInfo> {
    let family = match np_family_to_netd(&np_route.address_family) {
        Some(f) => f,
        None => {
            warn!(
                "Route {:?} is holding unknown IP family {:?}",
                np_route, np_route.address_family
            );
            return None;
        }
    };
    let destination = match np_route.dst.as_deref() {
        Some(dst) => match IpPrefix::parse(dst, family) {
            Ok(d) => d,
            Err(e) => {
                warn!("Ignoring route with invalid destination: {e}");
                return None;
            }
        },
        // Default gateway
        None => IpPrefix::new(
            match family {
                AddressFamily::Inet4 => IpAddr::from([0u8; 4]),
                AddressFamily::Inet6 => IpAddr::from([0u16; 8]),
            },
            0,
        ),
    };
    let gateway = np_route
        .via
        .as_deref()
        .or(np_route.gateway.as_deref())
        .and_then(|gw| IpAddr::from_str(gw).ok());
    let protocol = if STATIC_ROUTE_PROTOCOLS.contains(&np_route.protocol) {
        RouteProtocol::Static
    } else {
        RouteProtocol::Dynamic
    };
    let mut route = RouteInfo::new(destination, gateway, fib, protocol);
    route.interface = np_route.oif.clone();
    Some(route)
}

pub(crate) fn np_routes_of_fib(
    np_routes: &[nispor::Route],
    fib: u32,
) -> Vec<RouteInfo> {
    np_routes
        .iter()
        .filter(|r| table_to_fib(r.table) == Some(fib))
        .filter_map(|r| np_route_to_netd(r, fib))
        .collect()
}

fn table_of(fib: u32) -> Result<u8, NetdError> {
    u8::try_from(fib_to_table(fib)).map_err(|_| {
        NetdError::new(
            ErrorKind::SemanticError,
            format!("FIB {fib} has no kernel route table"),
        )
    })
}

pub(crate) fn route_conf_to_np(
    conf: &RouteConfig,
    fib: u32,
) -> Result<nispor::RouteConf, NetdError> {
    let mut np_route = nispor::RouteConf::default();
    np_route.dst = conf.destination.to_string();
    np_route.via = Some(conf.gateway.to_string());
    np_route.table = Some(table_of(fib)?);
    np_route.protocol = Some(nispor::RouteProtocol::Static);
    Ok(np_route)
}

pub(crate) fn route_del_to_np(
    route: &RouteInfo,
) -> Result<nispor::RouteConf, NetdError> {
    let mut np_route = nispor::RouteConf::default();
    np_route.remove = true;
    np_route.dst = route.destination.to_string();
    np_route.oif = route.interface.clone();
    np_route.via = route.gateway.map(|gw| gw.to_string());
    np_route.table = Some(table_of(route.fib)?);
    Ok(np_route)
}
