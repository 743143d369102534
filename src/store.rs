//! In-memory config collection and its persisted store file.
//!
//! The collection always starts with exactly one system config mirroring the
//! unmanaged part of the target file, followed by the custom configs in
//! insertion order. Only custom configs reach the store file.

use crate::config::{HostConfig, HostsSettings, display_name};
use crate::error::{HostsError, Result};
use crate::util::read_target;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Ordered collection of host configs backed by a JSON store file.
///
/// Failures that must not abort an operation (unreadable target file,
/// failed persist) are recorded and drained with
/// [`take_errors`](Self::take_errors).
#[derive(Debug)]
pub struct ConfigStore {
    configs: Vec<HostConfig>,
    store_path: PathBuf,
    placeholder_name: String,
    errors: Vec<HostsError>,
}

impl ConfigStore {
    /// Builds the collection from the live target file and the store file.
    ///
    /// 1. Reads the target file; on failure the system base is empty.
    /// 2. Strips the managed region to get the system base.
    /// 3. Loads custom configs, or seeds [`HostsSettings::seed_configs`]
    ///    when no store file exists yet.
    /// 4. Persists immediately so the store file matches memory.
    #[must_use]
    pub fn initialize(settings: &HostsSettings) -> Self {
        let mut errors = Vec::new();

        let raw = read_target(&settings.hosts_path).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Target file unreadable, starting with empty system base");
            errors.push(e);
            String::new()
        });
        let system = HostConfig::system(&settings.system_name, settings.block.base_of(&raw));

        let store_path = settings.store_path();
        let customs = match load_saved(&store_path) {
            Ok(Some(saved)) => saved,
            Ok(None) => {
                tracing::info!(
                    count = settings.seed_configs.len(),
                    "No store file found, seeding default configs"
                );
                settings
                    .seed_configs
                    .iter()
                    .map(|seed| HostConfig::new(settings.display_name(&seed.name), &seed.content))
                    .collect()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Store file unreadable, starting without custom configs");
                if matches!(e, HostsError::StoreCorrupt { .. }) {
                    set_aside(&store_path);
                }
                errors.push(e);
                Vec::new()
            }
        };

        let mut configs = Vec::with_capacity(customs.len() + 1);
        configs.push(system);
        configs.extend(customs);

        let mut store = Self {
            configs,
            store_path,
            placeholder_name: settings.placeholder_name.clone(),
            errors,
        };
        store.persist_or_record();
        store
    }

    /// All configs, system config first.
    #[must_use]
    pub fn configs(&self) -> &[HostConfig] {
        &self.configs
    }

    /// Looks up a config by id.
    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<&HostConfig> {
        self.configs.iter().find(|c| c.id == id)
    }

    /// The system config.
    #[must_use]
    pub fn system(&self) -> &HostConfig {
        debug_assert!(self.configs[0].is_system);
        &self.configs[0]
    }

    /// Replaces the system config's content with a freshly derived base.
    pub fn set_system_content(&mut self, content: impl Into<String>) {
        self.configs[0].content = content.into();
    }

    /// Path of the backing store file.
    #[must_use]
    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    /// Appends an inactive custom config and persists.
    ///
    /// A blank name is replaced by the placeholder name.
    pub fn add(&mut self, name: &str, content: &str) -> Uuid {
        let config = HostConfig::new(self.display_name(name), content);
        let id = config.id;
        tracing::info!(id = %id, name = %config.name, "Added config");
        self.configs.push(config);
        self.persist_or_record();
        id
    }

    /// Removes a custom config and persists.
    ///
    /// Returns `None` without touching anything if `id` names no custom
    /// config. The system config can never be removed.
    pub fn remove(&mut self, id: Uuid) -> Option<HostConfig> {
        let index = self
            .configs
            .iter()
            .position(|c| c.id == id && !c.is_system)?;
        let removed = self.configs.remove(index);
        tracing::info!(id = %id, name = %removed.name, "Removed config");
        self.persist_or_record();
        Some(removed)
    }

    /// Sets a custom config's active flag. Does not persist.
    ///
    /// # Errors
    ///
    /// Returns [`HostsError::UnknownConfig`] if `id` names no custom config.
    pub fn set_active(&mut self, id: Uuid, active: bool) -> Result<()> {
        self.custom_mut(id)?.is_active = active;
        Ok(())
    }

    /// Replaces a custom config's content. Does not persist.
    ///
    /// # Errors
    ///
    /// Returns [`HostsError::UnknownConfig`] if `id` names no custom config;
    /// the system config is read-only.
    pub fn update_content(&mut self, id: Uuid, content: impl Into<String>) -> Result<()> {
        self.custom_mut(id)?.content = content.into();
        Ok(())
    }

    /// Renames a custom config using the same rule as [`add`](Self::add).
    /// Does not persist.
    ///
    /// # Errors
    ///
    /// Returns [`HostsError::UnknownConfig`] if `id` names no custom config.
    pub fn rename(&mut self, id: Uuid, name: &str) -> Result<()> {
        let name = self.display_name(name);
        self.custom_mut(id)?.name = name;
        Ok(())
    }

    /// Active custom configs in collection order.
    #[must_use]
    pub fn active_configs(&self) -> Vec<HostConfig> {
        self.configs
            .iter()
            .filter(|c| c.is_injected())
            .cloned()
            .collect()
    }

    /// Writes the custom configs to the store file atomically.
    ///
    /// # Errors
    ///
    /// Returns [`HostsError::PersistFailure`] if encoding or writing fails.
    /// The in-memory collection is unaffected.
    pub fn persist(&self) -> Result<()> {
        let customs: Vec<&HostConfig> = self.configs.iter().filter(|c| !c.is_system).collect();
        let json = serde_json::to_vec_pretty(&customs)
            .map_err(|e| HostsError::persist(&self.store_path, e.into()))?;
        write_atomic(&self.store_path, &json).map_err(|e| HostsError::persist(&self.store_path, e))?;

        tracing::debug!(
            path = %self.store_path.display(),
            count = customs.len(),
            "Persisted configs"
        );
        Ok(())
    }

    /// Drains the failures recorded since the last call.
    pub fn take_errors(&mut self) -> Vec<HostsError> {
        std::mem::take(&mut self.errors)
    }

    fn persist_or_record(&mut self) {
        if let Err(e) = self.persist() {
            tracing::warn!(error = %e, "Failed to persist configs");
            self.errors.push(e);
        }
    }

    fn custom_mut(&mut self, id: Uuid) -> Result<&mut HostConfig> {
        self.configs
            .iter_mut()
            .find(|c| c.id == id && !c.is_system)
            .ok_or(HostsError::UnknownConfig(id))
    }

    fn display_name(&self, name: &str) -> String {
        display_name(name, &self.placeholder_name)
    }
}

/// Loads custom configs from the store file.
///
/// Returns `Ok(None)` when the file does not exist.
fn load_saved(path: &Path) -> Result<Option<Vec<HostConfig>>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(HostsError::read(path, e)),
    };
    let configs: Vec<HostConfig> =
        serde_json::from_slice(&bytes).map_err(|e| HostsError::StoreCorrupt {
            path: path.to_path_buf(),
            source: Arc::new(e),
        })?;
    Ok(Some(configs.into_iter().filter(|c| !c.is_system).collect()))
}

/// Renames an undecodable store file to `<name>.corrupt` so the next
/// persist does not destroy it.
fn set_aside(path: &Path) {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".corrupt");
    let aside = path.with_file_name(name);
    match fs::rename(path, &aside) {
        Ok(()) => tracing::warn!(path = %aside.display(), "Moved corrupt store file aside"),
        Err(e) => tracing::warn!(error = %e, "Failed to move corrupt store file aside"),
    }
}

/// Writes `content` to a sibling temp file, syncs it, then renames it over `path`.
fn write_atomic(path: &Path, content: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_name = format!(
        ".{}.{}.tmp",
        path.file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id()
    );
    let temp_path = path.with_file_name(temp_name);

    let result = write_then_rename(&temp_path, path, content);
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn write_then_rename(temp_path: &Path, path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(temp_path)?;
    file.write_all(content)?;
    file.sync_all()?;
    fs::rename(temp_path, path)
}
