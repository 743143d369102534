//! # switch-hosts
//!
//! Maintain several named, toggle-able blocks of host mappings and compose
//! the active ones into `/etc/hosts` without destroying what the user or
//! other tools put there.
//!
//! Injected mappings live in a managed region bracketed by two marker
//! lines. Every apply re-reads the live file, strips the old region and
//! appends a fresh one, so repeated applies are idempotent and manual edits
//! outside the region survive.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use switch_hosts::{HostsManager, HostsSettings};
//!
//! let mut manager = HostsManager::new(HostsSettings::new());
//! let id = manager.add_config("k8s", "192.168.3.10 k8s-master.com\n");
//!
//! // Prompts for administrator credentials.
//! let report = manager.toggle_and_apply(id, true)?;
//! println!("{}", report.message());
//! ```
//!
//! The resulting file looks like:
//!
//! ```text
//! 127.0.0.1 localhost
//!
//! # --- SWITCHHOSTS_CONTENT_START ---
//!
//! # active: k8s
//! 192.168.3.10 k8s-master.com
//! # --- SWITCHHOSTS_CONTENT_END ---
//! ```
//!
//! ## Storage
//!
//! Custom configs are saved as JSON in `~/.swHosts/host_configs.json`.
//! The same directory holds short-lived scratch files while applying.
//!
//! ## Permissions
//!
//! Writing `/etc/hosts` requires root. Unless the process already runs as
//! root, the write goes through `osascript` and the system credentials
//! dialog. Tests and other hosts can inject their own
//! [`Elevator`] and [`CacheFlusher`].
//!
//! ## Known limitations
//!
//! The target file is not locked. An external edit landing between the
//! re-read and the privileged copy is overwritten.

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod block;
pub mod config;
pub mod error;
pub mod manager;
pub mod merge;
pub mod store;
pub mod util;
pub mod writer;

pub use block::ManagedBlock;
pub use config::{HostConfig, HostsSettings, SeedConfig};
pub use error::{HostsError, Result};
pub use manager::{ApplyReport, HostsEvent, HostsManager};
pub use merge::{MergeEngine, Merged};
pub use store::ConfigStore;
pub use writer::{
    CacheFlusher, DirectElevator, ElevationOutput, ElevationRequest, Elevator, KillallFlusher,
    OsascriptElevator, PrivilegedWriter, WriteOutcome,
};
