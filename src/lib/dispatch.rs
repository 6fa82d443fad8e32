// SPDX-License-Identifier: Apache-2.0

use std::sync::{Arc, Mutex, MutexGuard};

use crate::{
    Command, CommitPolicy, ConfigEntry, ConfigPersistence, ConfigSnapshot,
    ErrorKind, InterfaceConfigurator, InterfaceFilter, NetdError, Response,
    RouteConfigurator, RouteQuery, ShowTarget, StagingBuffer,
};

/// Executes commands against the configurators and owns the staging buffer.
///
/// Every access to the staging buffer, and every command changing live
/// state, runs under one lock so that stage, commit and discard requests
/// from concurrent clients are linearizable. `show` commands never take
/// that lock.
pub struct Dispatcher {
    interfaces: Arc<dyn InterfaceConfigurator>,
    routes: Arc<dyn RouteConfigurator>,
    persistence: Option<Arc<dyn ConfigPersistence>>,
    staging: Mutex<StagingBuffer>,
    policy: CommitPolicy,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("staging", &self.staging)
            .field("policy", &self.policy)
            .field("persistence", &self.persistence.is_some())
            .finish()
    }
}

impl Dispatcher {
    pub fn new(
        interfaces: Arc<dyn InterfaceConfigurator>,
        routes: Arc<dyn RouteConfigurator>,
    ) -> Self {
        Self {
            interfaces,
            routes,
            persistence: None,
            staging: Mutex::new(StagingBuffer::default()),
            policy: CommitPolicy::default(),
        }
    }

    pub fn with_persistence(
        mut self,
        persistence: Arc<dyn ConfigPersistence>,
    ) -> Self {
        self.persistence = Some(persistence);
        self
    }

    pub fn with_staging_capacity(mut self, capacity: usize) -> Self {
        self.staging = Mutex::new(StagingBuffer::new(capacity));
        self
    }

    pub fn with_commit_policy(mut self, policy: CommitPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn lock_staging(&self) -> Result<MutexGuard<'_, StagingBuffer>, NetdError> {
        self.staging.lock().map_err(|e| {
            NetdError::new(
                ErrorKind::Bug,
                format!("Staging buffer lock is poisoned: {e}"),
            )
        })
    }

    /// Entries waiting for commit, in apply order.
    pub fn pending(&self) -> Result<Vec<ConfigEntry>, NetdError> {
        Ok(self.lock_staging()?.entries())
    }

    fn resolve_fib(&self, fib: Option<u32>) -> Result<u32, NetdError> {
        let fib = fib.unwrap_or_else(|| self.routes.default_fib());
        let fib_count = self.routes.fib_count();
        if fib >= fib_count {
            Err(NetdError::new(
                ErrorKind::SemanticError,
                format!(
                    "FIB {fib} does not exist (only {fib_count} FIBs \
                    available)"
                ),
            ))
        } else {
            Ok(fib)
        }
    }

    pub fn dispatch(&self, cmd: &Command) -> Result<Response, NetdError> {
        log::debug!("Dispatching {cmd}");
        match cmd {
            Command::Show(ShowTarget::Help) => Ok(Response::Help),
            Command::Show(ShowTarget::Interface(filter)) => {
                let filter = InterfaceFilter::new(filter.as_deref());
                Ok(Response::Interfaces(
                    self.interfaces.show_interfaces(&filter)?,
                ))
            }
            Command::Show(ShowTarget::Route(filter)) => {
                let mut query = RouteQuery::new(self.resolve_fib(filter.fib)?);
                query.protocol = filter.protocol;
                query.family = filter.family;
                Ok(Response::Routes {
                    fib: query.fib,
                    routes: self.routes.show_routes(&query)?,
                })
            }
            Command::Set(entry) => self.stage(entry),
            Command::Delete(del) => {
                let mut del = del.clone();
                del.fib = Some(self.resolve_fib(del.fib)?);
                let _staging = self.lock_staging()?;
                Ok(Response::Deleted(self.routes.delete_routes(&del)?))
            }
            Command::Commit => self.commit(),
            Command::Discard => {
                let count = self.lock_staging()?.discard();
                log::info!("Discarded {count} pending change(s)");
                Ok(Response::Discarded(count))
            }
            Command::Save => self.save(),
        }
    }

    fn stage(&self, entry: &ConfigEntry) -> Result<Response, NetdError> {
        let entry = match entry {
            ConfigEntry::Interface(conf) => {
                self.resolve_fib(Some(conf.fib))?;
                if let Some(tunnel_fib) = conf.tunnel_fib {
                    self.resolve_fib(Some(tunnel_fib))?;
                }
                entry.clone()
            }
            ConfigEntry::Route(conf) => {
                let mut conf = conf.clone();
                conf.fib = Some(self.resolve_fib(conf.fib)?);
                ConfigEntry::Route(conf)
            }
        };
        let mut staging = self.lock_staging()?;
        staging.stage(entry.clone())?;
        Ok(Response::Staged {
            entry,
            pending: staging.len(),
        })
    }

    fn commit(&self) -> Result<Response, NetdError> {
        let mut staging = self.lock_staging()?;
        let total = staging.len();
        match staging.commit(
            self.interfaces.as_ref(),
            self.routes.as_ref(),
            self.policy,
        ) {
            Ok(applied) => {
                log::info!("Committed {applied} change(s)");
                Ok(Response::Committed(applied))
            }
            Err(failures) => {
                let details: Vec<String> =
                    failures.iter().map(|f| f.to_string()).collect();
                Err(NetdError::new(
                    ErrorKind::ApplyError,
                    format!(
                        "Commit applied {} of {total} change(s), failed: {}",
                        total - failures.len(),
                        details.join("; ")
                    ),
                ))
            }
        }
    }

    fn save(&self) -> Result<Response, NetdError> {
        let persistence = self.persistence.as_ref().ok_or_else(|| {
            NetdError::new(
                ErrorKind::NotSupportedError,
                "No configuration store is configured".to_string(),
            )
        })?;
        // Keep commits out while taking the snapshot
        let _staging = self.lock_staging()?;
        let snapshot = ConfigSnapshot::new(
            self.interfaces.show_interfaces(&InterfaceFilter::All)?,
            self.routes.static_routes()?,
        );
        let location = persistence.save(&snapshot)?;
        log::info!("Saved configuration to {location}");
        Ok(Response::Saved(location))
    }
}
