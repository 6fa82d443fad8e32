// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::{
    InterfaceConfig, InterfaceFilter, InterfaceInfo, NetdError, RouteConfig,
    RouteDeletion, RouteInfo, RouteProtocol, RouteQuery,
};

/// Reads and writes interface state of the system.
pub trait InterfaceConfigurator: Send + Sync {
    fn show_interfaces(
        &self,
        filter: &InterfaceFilter,
    ) -> Result<Vec<InterfaceInfo>, NetdError>;

    /// Add the address to the interface and bind the interface to the FIB.
    fn configure_interface(
        &self,
        conf: &InterfaceConfig,
    ) -> Result<(), NetdError>;
}

/// Reads and writes forwarding tables of the system.
pub trait RouteConfigurator: Send + Sync {
    /// Number of FIBs, valid FIB numbers are `0..fib_count()`.
    fn fib_count(&self) -> u32;

    /// FIB used when a command names none.
    fn default_fib(&self) -> u32 {
        0
    }

    fn show_routes(&self, query: &RouteQuery)
        -> Result<Vec<RouteInfo>, NetdError>;

    /// Static routes of every FIB.
    fn static_routes(&self) -> Result<Vec<RouteInfo>, NetdError> {
        let mut ret = Vec::new();
        for fib in 0..self.fib_count() {
            let mut query = RouteQuery::new(fib);
            query.protocol = Some(RouteProtocol::Static);
            ret.extend(self.show_routes(&query)?);
        }
        Ok(ret)
    }

    /// `conf.fib` of `None` means [RouteConfigurator::default_fib].
    fn add_route(&self, conf: &RouteConfig) -> Result<(), NetdError>;

    /// Remove every route selected by `del` and return how many were
    /// removed. A deletion naming a destination fails when nothing matches.
    fn delete_routes(&self, del: &RouteDeletion) -> Result<usize, NetdError>;
}

/// Running configuration written by `save`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub struct ConfigSnapshot {
    pub interfaces: Vec<InterfaceInfo>,
    pub routes: Vec<RouteInfo>,
}

impl ConfigSnapshot {
    pub fn new(interfaces: Vec<InterfaceInfo>, routes: Vec<RouteInfo>) -> Self {
        Self { interfaces, routes }
    }
}

/// Durable storage of the running configuration.
pub trait ConfigPersistence: Send + Sync {
    /// Store the snapshot and return where it went.
    fn save(&self, snapshot: &ConfigSnapshot) -> Result<String, NetdError>;
}
