// SPDX-License-Identifier: Apache-2.0

mod apply;
mod ip;
mod route;
mod show;

use crate::{
    ErrorKind, InterfaceConfig, InterfaceConfigurator, InterfaceFilter,
    InterfaceInfo, NetdError, RouteConfig, RouteConfigurator, RouteDeletion,
    RouteInfo, RouteProtocol, RouteQuery,
};

use self::apply::{apply_conf, iface_conf_to_np};
use self::route::{np_routes_of_fib, route_conf_to_np, route_del_to_np};
use self::show::{np_iface_to_netd, retrieve};

const MAIN_TABLE_ID: u32 = 254;
// Kernel tables 1-253 back FIB 1-253, the main table backs FIB 0.
const FIB_COUNT: u32 = 254;

pub(crate) fn fib_to_table(fib: u32) -> u32 {
    if fib == 0 {
        MAIN_TABLE_ID
    } else {
        fib
    }
}

pub(crate) fn table_to_fib(table: u32) -> Option<u32> {
    match table {
        MAIN_TABLE_ID => Some(0),
        t if t > 0 && t < MAIN_TABLE_ID => Some(t),
        _ => None,
    }
}

/// Name of the VRF device standing for FIB `fib`.
pub(crate) fn vrf_name(fib: u32) -> String {
    format!("fib{fib}")
}

pub(crate) fn np_error_to_netd(e: nispor::NisporError) -> NetdError {
    NetdError::new(
        ErrorKind::PluginFailure,
        format!("Unknown error from nispor plugin: {}, {}", e.kind, e.msg),
    )
}

/// Linux kernel backend. Interfaces and routes are read and written
/// through netlink, a FIB is a kernel routing table and binding an interface
/// to FIB N means enslaving it to the VRF device `fibN`.
#[derive(Debug, Default, Clone, Copy)]
#[non_exhaustive]
pub struct KernelBackend;

impl KernelBackend {
    pub fn new() -> Self {
        Self
    }
}

impl InterfaceConfigurator for KernelBackend {
    fn show_interfaces(
        &self,
        filter: &InterfaceFilter,
    ) -> Result<Vec<InterfaceInfo>, NetdError> {
        let np_state = retrieve()?;
        let mut ret: Vec<InterfaceInfo> = np_state
            .ifaces
            .values()
            .map(|np_iface| np_iface_to_netd(np_iface, &np_state.ifaces))
            .filter(|iface| filter.matches(iface))
            .collect();
        ret.sort_unstable_by(|a, b| a.name.cmp(&b.name));
        Ok(ret)
    }

    fn configure_interface(
        &self,
        conf: &InterfaceConfig,
    ) -> Result<(), NetdError> {
        if conf.tunnel_fib.is_some() {
            return Err(NetdError::new(
                ErrorKind::NotSupportedError,
                format!(
                    "Tunnel FIB of interface {} is not supported by the \
                    Linux kernel backend",
                    conf.name
                ),
            ));
        }
        if conf.fib >= FIB_COUNT {
            return Err(fib_out_of_range(conf.fib));
        }
        let mut np_conf = nispor::NetConf::default();
        np_conf.ifaces = Some(vec![iface_conf_to_np(conf)]);
        apply_conf(&np_conf)?;
        log::info!(
            "Assigned {} to interface {} in FIB {}",
            conf.address,
            conf.name,
            conf.fib
        );
        Ok(())
    }
}

impl RouteConfigurator for KernelBackend {
    fn fib_count(&self) -> u32 {
        FIB_COUNT
    }

    fn show_routes(
        &self,
        query: &RouteQuery,
    ) -> Result<Vec<RouteInfo>, NetdError> {
        let np_state = retrieve()?;
        Ok(np_routes_of_fib(&np_state.routes, query.fib)
            .into_iter()
            .filter(|r| query.matches(r))
            .collect())
    }

    fn static_routes(&self) -> Result<Vec<RouteInfo>, NetdError> {
        let np_state = retrieve()?;
        let mut ret = Vec::new();
        for fib in 0..FIB_COUNT {
            ret.extend(
                np_routes_of_fib(&np_state.routes, fib)
                    .into_iter()
                    .filter(|r| r.protocol == RouteProtocol::Static),
            );
        }
        Ok(ret)
    }

    fn add_route(&self, conf: &RouteConfig) -> Result<(), NetdError> {
        let fib = conf.fib.unwrap_or(self.default_fib());
        if fib >= FIB_COUNT {
            return Err(fib_out_of_range(fib));
        }
        let mut np_conf = nispor::NetConf::default();
        np_conf.routes = Some(vec![route_conf_to_np(conf, fib)?]);
        apply_conf(&np_conf)?;
        log::info!(
            "Added route {} via {} to FIB {fib}",
            conf.destination,
            conf.gateway
        );
        Ok(())
    }

    fn delete_routes(&self, del: &RouteDeletion) -> Result<usize, NetdError> {
        let fib = del.fib.unwrap_or(self.default_fib());
        let np_state = retrieve()?;
        let mut np_routes = Vec::new();
        for route in np_routes_of_fib(&np_state.routes, fib)
            .iter()
            .filter(|r| r.is_match(del, fib))
        {
            np_routes.push(route_del_to_np(route)?);
        }
        if np_routes.is_empty() {
            if del.is_bulk() {
                return Ok(0);
            }
            return Err(NetdError::new(
                ErrorKind::PluginFailure,
                format!("No matching route found in FIB {fib}"),
            ));
        }
        let count = np_routes.len();
        let mut np_conf = nispor::NetConf::default();
        np_conf.routes = Some(np_routes);
        apply_conf(&np_conf)?;
        log::info!("Removed {count} route(s) from FIB {fib}");
        Ok(count)
    }
}

fn fib_out_of_range(fib: u32) -> NetdError {
    NetdError::new(
        ErrorKind::SemanticError,
        format!("FIB {fib} does not exist (only {FIB_COUNT} FIBs available)"),
    )
}
