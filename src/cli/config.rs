// SPDX-License-Identifier: Apache-2.0

use std::io::Read;

use netd::{CommitPolicy, DEFAULT_STAGING_CAPACITY};
use serde::Deserialize;

use crate::error::CliError;

pub(crate) const DEFAULT_SOCKET_PATH: &str = "/var/run/netd.sock";
const DEFAULT_SAVE_PATH: &str = "/etc/netd/netd.yml";
const DEFAULT_MEMORY_FIBS: u32 = 16;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Config {
    #[serde(default)]
    pub(crate) daemon: DaemonConfig,
    #[serde(default)]
    pub(crate) client: ClientConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum BackendKind {
    Kernel,
    Memory,
}

impl Default for BackendKind {
    fn default() -> Self {
        if cfg!(feature = "query_apply") {
            Self::Kernel
        } else {
            Self::Memory
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "kernel" => Ok(Self::Kernel),
            "memory" => Ok(Self::Memory),
            _ => Err(CliError::new(
                crate::error::EX_USAGE,
                format!("Invalid backend {s}, expecting kernel or memory"),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub(crate) struct DaemonConfig {
    pub(crate) socket_path: String,
    pub(crate) staging_capacity: usize,
    pub(crate) commit_policy: CommitPolicy,
    pub(crate) save_path: String,
    pub(crate) backend: BackendKind,
    pub(crate) memory_fibs: u32,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket_path: DEFAULT_SOCKET_PATH.to_string(),
            staging_capacity: DEFAULT_STAGING_CAPACITY,
            commit_policy: CommitPolicy::default(),
            save_path: DEFAULT_SAVE_PATH.to_string(),
            backend: BackendKind::default(),
            memory_fibs: DEFAULT_MEMORY_FIBS,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub(crate) struct ClientConfig {
    pub(crate) socket_path: String,
    pub(crate) use_rpc: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            socket_path: DEFAULT_SOCKET_PATH.to_string(),
            use_rpc: false,
        }
    }
}

impl Config {
    pub(crate) const DEFAULT_CONFIG_PATH: &'static str = "/etc/netd/netd.conf";

    pub(crate) fn load(path: &str) -> Result<Self, CliError> {
        let path = std::path::Path::new(path);
        if !path.exists() {
            log::debug!(
                "Configuration file {} not found, using defaults",
                path.display()
            );
            return Ok(Config::default());
        }
        let mut fd = std::fs::File::open(path)?;
        let mut content = String::new();
        fd.read_to_string(&mut content)?;
        match Self::parse(&content) {
            Ok(c) => {
                log::debug!("Configuration loaded:\n{content}");
                Ok(c)
            }
            Err(e) => Err(CliError::data_error(format!(
                "Failed to read configuration from {}: {e}",
                path.display()
            ))),
        }
    }

    fn parse(content: &str) -> Result<Self, CliError> {
        let config = toml::from_str::<Config>(content)?;
        if config.daemon.staging_capacity == 0 {
            return Err(CliError::data_error(
                "staging_capacity must be greater than 0".to_string(),
            ));
        }
        Ok(config)
    }
}
