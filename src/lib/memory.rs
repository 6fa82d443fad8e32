// SPDX-License-Identifier: Apache-2.0

use std::sync::{Mutex, MutexGuard};

use crate::{
    ErrorKind, InterfaceConfig, InterfaceConfigurator, InterfaceFilter,
    InterfaceInfo, NetdError, RouteConfig, RouteConfigurator, RouteDeletion,
    RouteInfo, RouteProtocol, RouteQuery,
};

#[derive(Debug, Default)]
struct MemoryState {
    ifaces: Vec<InterfaceInfo>,
    routes: Vec<RouteInfo>,
}

/// Network state kept in process memory. Used when no kernel backend is
/// wanted, e.g. for trying the command language or testing.
#[derive(Debug)]
pub struct MemoryBackend {
    fib_count: u32,
    default_fib: u32,
    state: Mutex<MemoryState>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(1)
    }
}

impl MemoryBackend {
    pub fn new(fib_count: u32) -> Self {
        Self {
            fib_count: fib_count.max(1),
            default_fib: 0,
            state: Mutex::new(MemoryState::default()),
        }
    }

    pub fn with_default_fib(mut self, fib: u32) -> Self {
        self.default_fib = fib;
        self
    }

    pub fn with_interface(self, iface: InterfaceInfo) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.ifaces.push(iface);
        }
        self
    }

    pub fn with_route(self, route: RouteInfo) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.routes.push(route);
        }
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, NetdError> {
        self.state.lock().map_err(|e| {
            NetdError::new(
                ErrorKind::Bug,
                format!("Memory backend state is poisoned: {e}"),
            )
        })
    }

    fn check_fib(&self, fib: u32) -> Result<(), NetdError> {
        if fib >= self.fib_count {
            Err(NetdError::new(
                ErrorKind::SemanticError,
                format!(
                    "FIB {fib} does not exist (only {} FIBs available)",
                    self.fib_count
                ),
            ))
        } else {
            Ok(())
        }
    }
}

impl InterfaceConfigurator for MemoryBackend {
    fn show_interfaces(
        &self,
        filter: &InterfaceFilter,
    ) -> Result<Vec<InterfaceInfo>, NetdError> {
        Ok(self
            .lock()?
            .ifaces
            .iter()
            .filter(|i| filter.matches(i))
            .cloned()
            .collect())
    }

    fn configure_interface(
        &self,
        conf: &InterfaceConfig,
    ) -> Result<(), NetdError> {
        self.check_fib(conf.fib)?;
        if let Some(tunnel_fib) = conf.tunnel_fib {
            self.check_fib(tunnel_fib)?;
        }
        let mut state = self.lock()?;
        let iface = state
            .ifaces
            .iter_mut()
            .find(|i| i.name == conf.name)
            .ok_or_else(|| {
                NetdError::new(
                    ErrorKind::PluginFailure,
                    format!("Interface {} does not exist", conf.name),
                )
            })?;
        iface.add_address(conf.address);
        iface.fib = conf.fib;
        if conf.tunnel_fib.is_some() {
            iface.tunnel_fib = conf.tunnel_fib;
        }
        log::info!(
            "Assigned {} to interface {} in FIB {}",
            conf.address,
            conf.name,
            conf.fib
        );
        Ok(())
    }
}

impl RouteConfigurator for MemoryBackend {
    fn fib_count(&self) -> u32 {
        self.fib_count
    }

    fn default_fib(&self) -> u32 {
        self.default_fib
    }

    fn show_routes(
        &self,
        query: &RouteQuery,
    ) -> Result<Vec<RouteInfo>, NetdError> {
        Ok(self
            .lock()?
            .routes
            .iter()
            .filter(|r| query.matches(r))
            .cloned()
            .collect())
    }

    fn add_route(&self, conf: &RouteConfig) -> Result<(), NetdError> {
        let fib = conf.fib.unwrap_or(self.default_fib);
        self.check_fib(fib)?;
        let mut state = self.lock()?;
        if state
            .routes
            .iter()
            .any(|r| r.fib == fib && r.destination == conf.destination)
        {
            return Err(NetdError::new(
                ErrorKind::PluginFailure,
                format!(
                    "Route to {} already exists in FIB {fib}",
                    conf.destination
                ),
            ));
        }
        state.routes.push(RouteInfo::new(
            conf.destination,
            Some(conf.gateway),
            fib,
            RouteProtocol::Static,
        ));
        log::info!(
            "Added route {} via {} to FIB {fib}",
            conf.destination,
            conf.gateway
        );
        Ok(())
    }

    fn delete_routes(&self, del: &RouteDeletion) -> Result<usize, NetdError> {
        let fib = del.fib.unwrap_or(self.default_fib);
        self.check_fib(fib)?;
        let mut state = self.lock()?;
        let before = state.routes.len();
        state.routes.retain(|r| !r.is_match(del, fib));
        let count = before - state.routes.len();
        if count == 0 && !del.is_bulk() {
            return Err(NetdError::new(
                ErrorKind::PluginFailure,
                format!("No matching route found in FIB {fib}"),
            ));
        }
        log::info!("Removed {count} route(s) from FIB {fib}");
        Ok(count)
    }
}
