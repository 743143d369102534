//! Composition of the system base and the active configs.

use crate::block::ManagedBlock;
use crate::config::HostsSettings;
use crate::error::HostsError;
use crate::store::ConfigStore;
use crate::util::read_target;
use std::path::PathBuf;

/// Result of [`MergeEngine::build_final_content`].
#[derive(Debug, Clone)]
pub struct Merged {
    /// Full text to write to the target file.
    pub content: String,

    /// Set when the live target file could not be re-read and the last
    /// known system content was used instead.
    pub warning: Option<HostsError>,
}

/// Builds the final target file text.
#[derive(Debug, Clone)]
pub struct MergeEngine {
    hosts_path: PathBuf,
    block: ManagedBlock,
}

impl MergeEngine {
    /// Creates an engine reading `settings.hosts_path`.
    #[must_use]
    pub fn new(settings: &HostsSettings) -> Self {
        Self {
            hosts_path: settings.hosts_path.clone(),
            block: settings.block.clone(),
        }
    }

    /// Re-reads the target file, refreshes the system config from it and
    /// appends the managed region holding the store's active configs.
    ///
    /// The target file is always read fresh so edits made by other tools
    /// since the last apply are kept. If the read fails, the last known
    /// system content is used and the failure is returned as a warning.
    pub fn build_final_content(&self, store: &mut ConfigStore) -> Merged {
        let (base, warning) = match read_target(&self.hosts_path) {
            Ok(live) => (self.block.base_of(&live), None),
            Err(e) => {
                tracing::warn!(error = %e, "Falling back to cached system content");
                (self.block.base_of(&store.system().content), Some(e))
            }
        };
        store.set_system_content(base.clone());

        let content = self.block.inject(&base, &store.active_configs());
        tracing::debug!(
            bytes = content.len(),
            fallback = warning.is_some(),
            "Built final hosts content"
        );
        Merged { content, warning }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{END_MARKER, START_MARKER};
    use std::fs;
    use std::path::Path;

    fn settings(dir: &Path) -> HostsSettings {
        HostsSettings::new()
            .with_hosts_path(dir.join("hosts"))
            .with_store_dir(dir.join(".swHosts"))
    }

    #[test]
    fn merges_fresh_base_with_active_configs() {
        let dir = tempfile::tempdir().unwrap();
        let s = settings(dir.path());
        fs::write(&s.hosts_path, "127.0.0.1 localhost\n").unwrap();
        let mut store = ConfigStore::initialize(&s);
        let id = store.add("dev", "10.0.0.1 dev.local");
        store.set_active(id, true).unwrap();

        let merged = MergeEngine::new(&s).build_final_content(&mut store);
        assert!(merged.warning.is_none());
        assert_eq!(
            merged.content,
            format!(
                "127.0.0.1 localhost\n\n{START_MARKER}\n\n# active: dev\n10.0.0.1 dev.local\n{END_MARKER}\n"
            )
        );
    }

    #[test]
    fn picks_up_external_edits() {
        let dir = tempfile::tempdir().unwrap();
        let s = settings(dir.path());
        fs::write(&s.hosts_path, "127.0.0.1 localhost\n").unwrap();
        let mut store = ConfigStore::initialize(&s);

        fs::write(
            &s.hosts_path,
            format!("127.0.0.1 localhost\n10.1.1.1 manual\n\n{START_MARKER}\nstale\n{END_MARKER}\n"),
        )
        .unwrap();

        let merged = MergeEngine::new(&s).build_final_content(&mut store);
        assert_eq!(store.system().content, "127.0.0.1 localhost\n10.1.1.1 manual");
        assert!(!merged.content.contains("stale"));
        assert_eq!(merged.content.matches(START_MARKER).count(), 1);
    }

    #[test]
    fn falls_back_to_cached_system_content() {
        let dir = tempfile::tempdir().unwrap();
        let s = settings(dir.path());
        fs::write(&s.hosts_path, "127.0.0.1 localhost\n").unwrap();
        let mut store = ConfigStore::initialize(&s);
        fs::remove_file(&s.hosts_path).unwrap();

        let merged = MergeEngine::new(&s).build_final_content(&mut store);
        assert!(matches!(merged.warning, Some(HostsError::ReadFailure { .. })));
        assert!(merged.content.starts_with("127.0.0.1 localhost\n\n"));
    }
}
