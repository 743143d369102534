//! Internal utilities.

use crate::error::{HostsError, Result};
use std::path::Path;

/// Returns `true` if the process runs with effective uid 0.
#[must_use]
pub fn is_root() -> bool {
    // SAFETY: `geteuid` has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

/// Reads the target file as UTF-8.
///
/// # Errors
///
/// Returns [`HostsError::ReadFailure`] if the file is missing, unreadable
/// or not valid UTF-8.
pub fn read_target(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| HostsError::read(path, e))
}
