// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::{
    ConfigEntry, ErrorKind, InterfaceConfig, InterfaceConfigurator,
    NetdError, RouteConfig, RouteConfigurator,
};

pub const DEFAULT_STAGING_CAPACITY: usize = 32;

/// What `commit` does after an entry failed to apply. No policy rolls back
/// entries applied before the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommitPolicy {
    /// Keep applying the remaining entries.
    BestEffort,
    /// Drop the remaining entries without applying them.
    StopOnError,
}

impl Default for CommitPolicy {
    fn default() -> Self {
        Self::BestEffort
    }
}

/// Staged entry which did not make it into the system during commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyFailure {
    pub entry: ConfigEntry,
    /// `None` when the entry was never attempted.
    pub error: Option<NetdError>,
}

impl std::fmt::Display for ApplyFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.error {
            Some(e) => write!(f, "{}: {}", self.entry, e.msg()),
            None => write!(f, "{}: not attempted", self.entry),
        }
    }
}

/// Configuration changes waiting for `commit`, interfaces and routes kept
/// in staging order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingBuffer {
    capacity: usize,
    interfaces: Vec<InterfaceConfig>,
    routes: Vec<RouteConfig>,
}

impl Default for StagingBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_STAGING_CAPACITY)
    }
}

impl StagingBuffer {
    /// `capacity` bounds each sequence separately.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            interfaces: Vec::new(),
            routes: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.interfaces.len() + self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pending entries in the order commit applies them.
    pub fn entries(&self) -> Vec<ConfigEntry> {
        self.interfaces
            .iter()
            .cloned()
            .map(ConfigEntry::Interface)
            .chain(self.routes.iter().cloned().map(ConfigEntry::Route))
            .collect()
    }

    pub fn stage(&mut self, entry: ConfigEntry) -> Result<(), NetdError> {
        let (len, kind) = match &entry {
            ConfigEntry::Interface(_) => (self.interfaces.len(), "interface"),
            ConfigEntry::Route(_) => (self.routes.len(), "route"),
        };
        if len >= self.capacity {
            return Err(NetdError::new(
                ErrorKind::StagingFull,
                format!(
                    "Staging buffer already holds {} pending {kind} \
                    changes, commit or discard first",
                    self.capacity
                ),
            ));
        }
        log::debug!("Staging {entry}");
        match entry {
            ConfigEntry::Interface(i) => self.interfaces.push(i),
            ConfigEntry::Route(r) => self.routes.push(r),
        }
        Ok(())
    }

    /// Apply every pending interface change, then every pending route
    /// change, in staging order. The buffer is empty afterwards whatever
    /// the outcome. Returns the number of applied entries.
    pub fn commit(
        &mut self,
        iface_conf: &dyn InterfaceConfigurator,
        route_conf: &dyn RouteConfigurator,
        policy: CommitPolicy,
    ) -> Result<usize, Vec<ApplyFailure>> {
        let interfaces = std::mem::take(&mut self.interfaces);
        let routes = std::mem::take(&mut self.routes);
        let entries = interfaces
            .into_iter()
            .map(ConfigEntry::Interface)
            .chain(routes.into_iter().map(ConfigEntry::Route));

        let mut applied = 0usize;
        let mut failures: Vec<ApplyFailure> = Vec::new();
        let mut stopped = false;
        for entry in entries {
            if stopped {
                failures.push(ApplyFailure { entry, error: None });
                continue;
            }
            let result = match &entry {
                ConfigEntry::Interface(i) => iface_conf.configure_interface(i),
                ConfigEntry::Route(r) => route_conf.add_route(r),
            };
            match result {
                Ok(()) => applied += 1,
                Err(e) => {
                    log::warn!("Failed to apply {entry}: {e}");
                    failures.push(ApplyFailure {
                        entry,
                        error: Some(e),
                    });
                    stopped = policy == CommitPolicy::StopOnError;
                }
            }
        }
        if failures.is_empty() {
            Ok(applied)
        } else {
            Err(failures)
        }
    }

    /// Drop every pending change and return how many were dropped.
    pub fn discard(&mut self) -> usize {
        let count = self.len();
        self.interfaces.clear();
        self.routes.clear();
        count
    }
}
