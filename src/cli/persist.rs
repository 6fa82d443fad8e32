// SPDX-License-Identifier: Apache-2.0

use std::ffi::OsStr;
use std::io::Write;
use std::path::{Path, PathBuf};

use netd::{ConfigPersistence, ConfigSnapshot, ErrorKind, NetdError};
use serde::Serialize;

const JSON_FILE_EXTENSION: &str = "json";
const TMP_FILE_EXTENSION: &str = "tmp";

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
struct SavedConfig<'a> {
    saved_at: String,
    #[serde(flatten)]
    snapshot: &'a ConfigSnapshot,
}

/// Stores the running configuration in one file, as JSON when the file name
/// ends with `.json` and as YAML otherwise.
#[derive(Debug, Clone)]
pub(crate) struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub(crate) fn new(path: &str) -> Self {
        Self {
            path: PathBuf::from(path),
        }
    }

    fn is_json(&self) -> bool {
        self.path.extension() == Some(OsStr::new(JSON_FILE_EXTENSION))
    }

    fn serialize(
        &self,
        snapshot: &ConfigSnapshot,
    ) -> Result<String, NetdError> {
        let saved = SavedConfig {
            saved_at: chrono::Local::now().to_rfc3339(),
            snapshot,
        };
        if self.is_json() {
            serde_json::to_string_pretty(&saved).map_err(|e| {
                NetdError::new(
                    ErrorKind::Bug,
                    format!("Failed to serialize configuration: {e}"),
                )
            })
        } else {
            serde_yaml::to_string(&saved).map_err(|e| {
                NetdError::new(
                    ErrorKind::Bug,
                    format!("Failed to serialize configuration: {e}"),
                )
            })
        }
    }

    // Write to a sibling file first so a crash never leaves half a file
    // behind.
    fn write(&self, content: &str) -> std::io::Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let tmp_path = self.path.with_extension(TMP_FILE_EXTENSION);
        let mut fd = std::fs::File::create(&tmp_path)?;
        fd.write_all(content.as_bytes())?;
        fd.sync_all()?;
        std::fs::rename(&tmp_path, &self.path)
    }

    fn path(&self) -> &Path {
        self.path.as_path()
    }
}

impl ConfigPersistence for FileStore {
    fn save(&self, snapshot: &ConfigSnapshot) -> Result<String, NetdError> {
        let content = self.serialize(snapshot)?;
        self.write(&content).map_err(|e| {
            NetdError::new(
                ErrorKind::PluginFailure,
                format!(
                    "Failed to write configuration to {}: {e}",
                    self.path().display()
                ),
            )
        })?;
        log::info!(
            "Saved {} interface(s) and {} route(s) to {}",
            snapshot.interfaces.len(),
            snapshot.routes.len(),
            self.path().display()
        );
        Ok(self.path().display().to_string())
    }
}
