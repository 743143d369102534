//! Error types.

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Result alias for hosts operations.
pub type Result<T> = std::result::Result<T, HostsError>;

/// Errors recorded by hosts operations.
///
/// Sources are held behind [`Arc`] so an error can be kept as the
/// manager's last error and handed to subscribers at the same time.
#[derive(Debug, Clone, Error)]
pub enum HostsError {
    /// The target file could not be read. Callers degrade to cached or
    /// empty content.
    #[error("cannot read {}: {source}", path.display())]
    ReadFailure {
        /// The target file path.
        path: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The config store file could not be written.
    #[error("cannot save configs to {}: {source}", path.display())]
    PersistFailure {
        /// The store file path.
        path: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The config store file exists but could not be decoded.
    #[error("cannot load configs from {}: {source}", path.display())]
    StoreCorrupt {
        /// The store file path.
        path: PathBuf,
        #[source]
        source: Arc<serde_json::Error>,
    },

    /// Staging the content or helper script in the scratch directory failed.
    #[error("cannot stage scratch file in {}: {source}", dir.display())]
    ScratchIo {
        /// The scratch directory.
        dir: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The administrator credentials were rejected.
    #[error("administrator user name or password is incorrect")]
    AuthenticationFailed,

    /// The user dismissed the elevation prompt.
    #[error("privilege elevation was cancelled")]
    UserCancelled,

    /// The privileged copy failed for any other reason.
    #[error("privileged write failed: {0}")]
    PrivilegedWriteFailed(String),

    /// Flushing the resolver cache failed. Never reported as an apply failure.
    #[error("cannot flush resolver cache: {0}")]
    CacheFlushFailure(#[source] Arc<std::io::Error>),

    /// No editable config has this id.
    #[error("no editable config with id {0}")]
    UnknownConfig(Uuid),
}

impl HostsError {
    pub(crate) fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadFailure {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    pub(crate) fn persist(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::PersistFailure {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    pub(crate) fn scratch(dir: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ScratchIo {
            dir: dir.into(),
            source: Arc::new(source),
        }
    }

    /// Returns `true` if the user dismissed the elevation prompt.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::UserCancelled)
    }

    /// Returns `true` if the administrator credentials were rejected.
    #[must_use]
    pub const fn is_authentication(&self) -> bool {
        matches!(self, Self::AuthenticationFailed)
    }

    /// Returns the message shown to the operator for this failure.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::ReadFailure { path, source } => {
                format!("Could not read {}, using cached content: {source}", path.display())
            }
            Self::PersistFailure { source, .. } => format!("Failed to save configs: {source}"),
            Self::StoreCorrupt { source, .. } => format!("Failed to load saved configs: {source}"),
            Self::ScratchIo { source, .. } => format!("Failed to write temporary file: {source}"),
            Self::AuthenticationFailed => "Elevation failed: administrator user name or password \
                 is incorrect (or the current account is not an administrator)"
                .to_string(),
            Self::UserCancelled => "Elevation was cancelled".to_string(),
            Self::PrivilegedWriteFailed(detail) => format!("Failed to update hosts: {detail}"),
            Self::CacheFlushFailure(source) => format!("Failed to flush DNS cache: {source}"),
            Self::UnknownConfig(id) => format!("No editable config with id {id}"),
        }
    }
}
