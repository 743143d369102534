//! Host config records and crate settings.

use crate::block::ManagedBlock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Default target file.
const DEFAULT_HOSTS_PATH: &str = "/etc/hosts";

/// Tool-owned directory under the user's home.
const DEFAULT_STORE_DIR_NAME: &str = ".swHosts";

const DEFAULT_STORE_FILE_NAME: &str = "host_configs.json";

const DEFAULT_SYSTEM_NAME: &str = "System Hosts";

const DEFAULT_PLACEHOLDER_NAME: &str = "Untitled";

/// A named block of host mapping lines.
///
/// Only non-system configs are persisted. The on-disk record is
/// `{ "id", "name", "content", "isActive" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostConfig {
    /// Assigned at creation, never recomputed.
    pub id: Uuid,

    /// Display name.
    pub name: String,

    /// Literal lines emitted into the managed region.
    pub content: String,

    /// Whether the config takes part in the next apply.
    pub is_active: bool,

    /// Marks the config mirroring the unmanaged part of the target file.
    #[serde(default, skip_serializing)]
    pub is_system: bool,
}

impl HostConfig {
    /// Creates an inactive custom config with a fresh id.
    #[must_use]
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            content: content.into(),
            is_active: false,
            is_system: false,
        }
    }

    /// Creates the system config. It is always active.
    #[must_use]
    pub fn system(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            is_active: true,
            is_system: true,
            ..Self::new(name, content)
        }
    }

    /// Returns `true` if the config is injected on apply.
    #[must_use]
    pub const fn is_injected(&self) -> bool {
        self.is_active && !self.is_system
    }
}

/// A config seeded on the first-ever run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedConfig {
    /// Display name.
    pub name: String,
    /// Mapping lines.
    pub content: String,
}

impl SeedConfig {
    /// Creates a seed entry.
    #[must_use]
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Paths, names and markers used by the hosts manager.
///
/// # Example
///
/// ```
/// use switch_hosts::{HostsSettings, SeedConfig};
///
/// let settings = HostsSettings::new()
///     .with_hosts_path("/tmp/hosts")
///     .with_store_dir("/tmp/swhosts")
///     .with_seed_configs(vec![SeedConfig::new("k8s", "192.168.3.10 k8s-master.com\n")]);
///
/// assert_eq!(settings.hosts_path.to_str(), Some("/tmp/hosts"));
/// assert_eq!(settings.store_path().to_str(), Some("/tmp/swhosts/host_configs.json"));
/// ```
#[derive(Debug, Clone)]
pub struct HostsSettings {
    /// Target file rewritten on apply.
    pub hosts_path: PathBuf,

    /// Tool-owned directory holding the store file and scratch files.
    pub store_dir: PathBuf,

    /// Store file name inside [`store_dir`](Self::store_dir).
    pub store_file_name: String,

    /// Display name of the system config.
    pub system_name: String,

    /// Name used when a config is given a blank name.
    pub placeholder_name: String,

    /// Configs created when no store file exists yet.
    pub seed_configs: Vec<SeedConfig>,

    /// Managed region markers.
    pub block: ManagedBlock,
}

impl HostsSettings {
    /// Creates settings targeting `/etc/hosts` with the store under `~/.swHosts`.
    ///
    /// Falls back to the system temp directory when no home directory
    /// can be resolved.
    #[must_use]
    pub fn new() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| {
            tracing::warn!("Home directory not found, storing configs in temp dir");
            std::env::temp_dir()
        });
        Self {
            hosts_path: PathBuf::from(DEFAULT_HOSTS_PATH),
            store_dir: home.join(DEFAULT_STORE_DIR_NAME),
            store_file_name: DEFAULT_STORE_FILE_NAME.to_string(),
            system_name: DEFAULT_SYSTEM_NAME.to_string(),
            placeholder_name: DEFAULT_PLACEHOLDER_NAME.to_string(),
            seed_configs: Vec::new(),
            block: ManagedBlock::default(),
        }
    }

    /// Overrides the target file (useful for testing).
    #[must_use]
    pub fn with_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.hosts_path = path.into();
        self
    }

    /// Overrides the tool-owned directory.
    #[must_use]
    pub fn with_store_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.store_dir = dir.into();
        self
    }

    /// Sets the configs seeded on the first-ever run.
    #[must_use]
    pub fn with_seed_configs(mut self, seeds: Vec<SeedConfig>) -> Self {
        self.seed_configs = seeds;
        self
    }

    /// Overrides the managed region markers.
    #[must_use]
    pub fn with_block(mut self, block: ManagedBlock) -> Self {
        self.block = block;
        self
    }

    /// Returns the full path of the store file.
    #[must_use]
    pub fn store_path(&self) -> PathBuf {
        self.store_dir.join(&self.store_file_name)
    }

    /// Returns the directory used for scratch files.
    #[must_use]
    pub fn scratch_dir(&self) -> &Path {
        &self.store_dir
    }

    /// Trims `name`, substituting the placeholder when nothing is left.
    #[must_use]
    pub fn display_name(&self, name: &str) -> String {
        display_name(name, &self.placeholder_name)
    }
}

pub(crate) fn display_name(name: &str, placeholder: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        placeholder.to_string()
    } else {
        trimmed.to_string()
    }
}

impl Default for HostsSettings {
    fn default() -> Self {
        Self::new()
    }
}
