//! Apply workflow and the last-error surface.
//!
//! [`HostsManager`] owns the [`ConfigStore`], the [`MergeEngine`] and the
//! [`PrivilegedWriter`]. All operations run sequentially on the caller's
//! thread; [`apply_active`](HostsManager::apply_active) blocks until the
//! elevation process exits, so interactive callers should run it off their
//! UI thread.
//!
//! No operation returns an error past this type. Every failure is kept as
//! the last error and broadcast as [`HostsEvent::Error`]. Each public
//! operation clears the last error first, so it only ever describes the
//! most recent call.
//!
//! # Example
//!
//! ```rust,ignore
//! use switch_hosts::{HostsManager, HostsSettings};
//!
//! let mut manager = HostsManager::new(HostsSettings::new());
//! let id = manager.add_config("dev", "10.0.0.1 dev.local");
//!
//! let report = manager.toggle_and_apply(id, true)?;
//! if !report.is_success() {
//!     eprintln!("{}", report.message());
//! }
//! ```

use crate::config::{HostConfig, HostsSettings};
use crate::error::{HostsError, Result};
use crate::merge::MergeEngine;
use crate::store::ConfigStore;
use crate::writer::{PrivilegedWriter, WriteOutcome};
use std::sync::mpsc::{self, Receiver, Sender};
use uuid::Uuid;

/// Notifications for the presentation layer.
#[derive(Debug, Clone)]
pub enum HostsEvent {
    /// The config collection changed (added, removed, edited, reloaded).
    ConfigsChanged,
    /// The target file was rewritten.
    Applied,
    /// A failure was recorded as the last error.
    Error(HostsError),
}

/// Stage results of one apply.
#[derive(Debug, Clone)]
pub struct ApplyReport {
    /// Text that was (or would have been) written.
    pub content: String,

    /// Set when the merge fell back to cached system content.
    pub merge_warning: Option<HostsError>,

    /// Outcome of the privileged write.
    pub write: Result<WriteOutcome>,

    /// Outcome of persisting the store. `None` when the write failed.
    pub persist: Option<Result<()>>,
}

impl ApplyReport {
    /// Returns `true` if the target file was written.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.write.is_ok()
    }

    /// The error that failed the apply, if any.
    #[must_use]
    pub fn failure(&self) -> Option<&HostsError> {
        self.write.as_ref().err()
    }

    /// Message for the operator.
    #[must_use]
    pub fn message(&self) -> String {
        match (&self.write, &self.persist) {
            (Err(e), _) => e.user_message(),
            (Ok(_), Some(Err(e))) => format!("Hosts applied. {}", e.user_message()),
            (Ok(outcome), _) if !outcome.cache_flushed => {
                "Hosts applied. DNS cache was not flushed.".to_string()
            }
            (Ok(_), _) => "Hosts applied.".to_string(),
        }
    }
}

/// Entry point for the apply, add, remove and save use cases.
#[derive(Debug)]
pub struct HostsManager {
    settings: HostsSettings,
    store: ConfigStore,
    merge: MergeEngine,
    writer: PrivilegedWriter,
    last_error: Option<HostsError>,
    subscribers: Vec<Sender<HostsEvent>>,
}

impl HostsManager {
    /// Creates a manager for the running system.
    ///
    /// See [`PrivilegedWriter::system`] for the elevation used.
    #[must_use]
    pub fn new(settings: HostsSettings) -> Self {
        let writer = PrivilegedWriter::system(&settings);
        Self::with_writer(settings, writer)
    }

    /// Creates a manager with a custom writer (useful for testing).
    #[must_use]
    pub fn with_writer(settings: HostsSettings, writer: PrivilegedWriter) -> Self {
        let mut store = ConfigStore::initialize(&settings);
        let last_error = store.take_errors().pop();
        Self {
            merge: MergeEngine::new(&settings),
            settings,
            store,
            writer,
            last_error,
            subscribers: Vec::new(),
        }
    }

    /// Subscribes to [`HostsEvent`]s. Dropped receivers are pruned.
    pub fn subscribe(&mut self) -> Receiver<HostsEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// All configs, system config first.
    #[must_use]
    pub fn configs(&self) -> &[HostConfig] {
        self.store.configs()
    }

    /// Looks up a config by id.
    #[must_use]
    pub fn config(&self, id: Uuid) -> Option<&HostConfig> {
        self.store.get(id)
    }

    /// The system config.
    #[must_use]
    pub fn system_config(&self) -> &HostConfig {
        self.store.system()
    }

    /// The settings this manager was built with.
    #[must_use]
    pub const fn settings(&self) -> &HostsSettings {
        &self.settings
    }

    /// The most recent failure.
    #[must_use]
    pub const fn last_error(&self) -> Option<&HostsError> {
        self.last_error.as_ref()
    }

    /// Forgets the most recent failure.
    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// Re-reads the target file and the store file from scratch.
    pub fn reload(&mut self) {
        self.last_error = None;
        self.store = ConfigStore::initialize(&self.settings);
        self.drain_store_errors();
        self.emit(HostsEvent::ConfigsChanged);
    }

    /// Adds an inactive config and returns its id.
    pub fn add_config(&mut self, name: &str, content: &str) -> Uuid {
        self.last_error = None;
        let id = self.store.add(name, content);
        self.drain_store_errors();
        self.emit(HostsEvent::ConfigsChanged);
        id
    }

    /// Removes a custom config.
    ///
    /// Returns the removed config so the caller can re-apply if it was
    /// active. The target file is not rewritten here.
    pub fn remove_config(&mut self, id: Uuid) -> Option<HostConfig> {
        self.last_error = None;
        let removed = self.store.remove(id)?;
        self.drain_store_errors();
        self.emit(HostsEvent::ConfigsChanged);
        Some(removed)
    }

    /// Replaces a custom config's content in memory.
    ///
    /// Returns `false` and records the error for the system config or an
    /// unknown id.
    pub fn update_content(&mut self, id: Uuid, content: impl Into<String>) -> bool {
        self.last_error = None;
        let result = self.store.update_content(id, content);
        self.settle_edit(result)
    }

    /// Renames a custom config in memory.
    ///
    /// Returns `false` and records the error for the system config or an
    /// unknown id.
    pub fn rename_config(&mut self, id: Uuid, name: &str) -> bool {
        self.last_error = None;
        let result = self.store.rename(id, name);
        self.settle_edit(result)
    }

    /// Persists the custom configs. Returns `true` on success.
    pub fn save(&mut self) -> bool {
        self.last_error = None;
        match self.store.persist() {
            Ok(()) => true,
            Err(e) => {
                self.record(e);
                false
            }
        }
    }

    /// Merges the active configs over the live system base and writes the
    /// result to the target file. The store is persisted after a
    /// successful write.
    pub fn apply_active(&mut self) -> ApplyReport {
        self.last_error = None;

        let merged = self.merge.build_final_content(&mut self.store);
        if let Some(warning) = &merged.warning {
            self.record(warning.clone());
        }

        let write = self.writer.apply(&merged.content);
        let persist = match &write {
            Ok(_) => {
                let persisted = self.store.persist();
                if let Err(e) = &persisted {
                    self.record(e.clone());
                }
                self.emit(HostsEvent::Applied);
                Some(persisted)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Apply failed, target file unchanged");
                self.record(e.clone());
                None
            }
        };

        ApplyReport {
            content: merged.content,
            merge_warning: merged.warning,
            write,
            persist,
        }
    }

    /// Sets a config's active flag, then applies.
    ///
    /// A failed apply does not roll the flag back: memory keeps the
    /// operator's intent and the report explains how the write failed.
    ///
    /// # Errors
    ///
    /// Returns [`HostsError::UnknownConfig`] without applying if `id`
    /// names no custom config.
    pub fn toggle_and_apply(&mut self, id: Uuid, active: bool) -> Result<ApplyReport> {
        self.last_error = None;
        if let Err(e) = self.store.set_active(id, active) {
            self.record(e.clone());
            return Err(e);
        }
        self.emit(HostsEvent::ConfigsChanged);
        Ok(self.apply_active())
    }

    fn settle_edit(&mut self, result: Result<()>) -> bool {
        match result {
            Ok(()) => {
                self.emit(HostsEvent::ConfigsChanged);
                true
            }
            Err(e) => {
                self.record(e);
                false
            }
        }
    }

    fn drain_store_errors(&mut self) {
        for e in self.store.take_errors() {
            self.record(e);
        }
    }

    fn record(&mut self, error: HostsError) {
        self.emit(HostsEvent::Error(error.clone()));
        self.last_error = Some(error);
    }

    fn emit(&mut self, event: HostsEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
