//! Privileged write of the target file.
//!
//! Content is staged in the tool-owned scratch directory, then an
//! [`Elevator`] copies it over the target and resets its mode to `0644`.
//! Scratch files are [`tempfile::NamedTempFile`]s, so they are removed on
//! every exit path. A successful write is followed by a best-effort
//! resolver cache flush through a [`CacheFlusher`].

use crate::config::HostsSettings;
use crate::error::{HostsError, Result};
use crate::util::is_root;
use std::fs;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

/// Default `osascript` binary.
const OSASCRIPT: &str = "/usr/bin/osascript";

/// Default `killall` binary.
const KILLALL: &str = "/usr/bin/killall";

/// Mode applied to the target file after the copy.
const TARGET_MODE: u32 = 0o644;

/// Scratch file prefixes inside the tool-owned directory.
const STAGED_PREFIX: &str = "temp_hosts_";
const SCRIPT_PREFIX: &str = "temp_apply_hosts_";

/// `osascript` stderr fragments, matched case-insensitively.
const BAD_CREDENTIALS: &str = "administrator user name or password was incorrect";
const USER_CANCELED: &str = "user canceled";

/// Runs with `argv = [source, target, prompt]`.
const APPLY_SCRIPT: &str = r#"on run argv
    set sourcePath to item 1 of argv
    set targetPath to item 2 of argv
    set promptText to item 3 of argv
    set shellCmd to "/bin/cp " & quoted form of sourcePath & " " & quoted form of targetPath & " && /bin/chmod 644 " & quoted form of targetPath
    do shell script shellCmd with administrator privileges with prompt promptText
end run
"#;

/// Paths handed to an [`Elevator`].
#[derive(Debug, Clone, Copy)]
pub struct ElevationRequest<'a> {
    /// Staged content file.
    pub source: &'a Path,
    /// Privileged target file.
    pub target: &'a Path,
    /// Directory where helper files may be staged.
    pub scratch_dir: &'a Path,
}

/// Exit status and stderr of an elevation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElevationOutput {
    /// Exit code, `None` if the process was killed by a signal.
    pub code: Option<i32>,
    /// Captured standard error.
    pub stderr: String,
}

impl ElevationOutput {
    /// A zero exit status.
    #[must_use]
    pub const fn success() -> Self {
        Self {
            code: Some(0),
            stderr: String::new(),
        }
    }

    /// A failed attempt with the given exit code and stderr.
    #[must_use]
    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stderr: stderr.into(),
        }
    }

    /// Returns `true` for a zero exit status.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.code, Some(0))
    }
}

/// Copies a staged file over a privileged target.
///
/// The call blocks until the out-of-process copy exits. Implementations
/// must reset the target's mode to `0644`.
pub trait Elevator: Send + Sync {
    /// Performs the privileged copy.
    ///
    /// # Errors
    ///
    /// Returns [`HostsError::ScratchIo`] if helper files cannot be staged, or
    /// [`HostsError::PrivilegedWriteFailed`] if the copy cannot be launched.
    /// A copy that ran and failed is reported through [`ElevationOutput`].
    fn copy_over(&self, request: &ElevationRequest<'_>) -> Result<ElevationOutput>;
}

/// Signals the system resolver to drop its cache.
pub trait CacheFlusher: Send + Sync {
    /// Flushes the cache.
    ///
    /// # Errors
    ///
    /// Returns [`HostsError::CacheFlushFailure`] on failure.
    fn flush(&self) -> Result<()>;
}

/// Elevates through AppleScript's `with administrator privileges`, which
/// shows the system credentials dialog.
#[derive(Debug, Clone)]
pub struct OsascriptElevator {
    program: PathBuf,
    prompt: String,
}

impl OsascriptElevator {
    /// Creates an elevator running `/usr/bin/osascript`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            program: PathBuf::from(OSASCRIPT),
            prompt: "switch-hosts needs administrator privileges to update the hosts file"
                .to_string(),
        }
    }

    /// Overrides the text shown in the credentials dialog.
    #[must_use]
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }
}

impl Default for OsascriptElevator {
    fn default() -> Self {
        Self::new()
    }
}

impl Elevator for OsascriptElevator {
    fn copy_over(&self, request: &ElevationRequest<'_>) -> Result<ElevationOutput> {
        let script = stage(request.scratch_dir, SCRIPT_PREFIX, ".applescript", APPLY_SCRIPT)?;

        tracing::debug!(
            script = %script.path().display(),
            target = %request.target.display(),
            "Running osascript elevation"
        );
        let output = Command::new(&self.program)
            .arg(script.path())
            .arg(request.source)
            .arg(request.target)
            .arg(&self.prompt)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| HostsError::PrivilegedWriteFailed(format!("cannot launch osascript: {e}")))?;

        Ok(ElevationOutput {
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Copies in-process. Only usable when already running as root, or when
/// the target is writable by the current user.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectElevator;

impl Elevator for DirectElevator {
    fn copy_over(&self, request: &ElevationRequest<'_>) -> Result<ElevationOutput> {
        let copy = fs::copy(request.source, request.target).and_then(|_| {
            fs::set_permissions(request.target, fs::Permissions::from_mode(TARGET_MODE))
        });
        Ok(match copy {
            Ok(()) => ElevationOutput::success(),
            Err(e) => ElevationOutput::failure(1, e.to_string()),
        })
    }
}

/// Sends `SIGHUP` to `mDNSResponder` via `killall`.
#[derive(Debug, Clone, Copy, Default)]
pub struct KillallFlusher;

impl CacheFlusher for KillallFlusher {
    fn flush(&self) -> Result<()> {
        let status = Command::new(KILLALL)
            .args(["-HUP", "mDNSResponder"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| HostsError::CacheFlushFailure(Arc::new(e)))?;
        if status.success() {
            Ok(())
        } else {
            Err(HostsError::CacheFlushFailure(Arc::new(std::io::Error::other(
                format!("killall exited with {status}"),
            ))))
        }
    }
}

/// Result of a successful [`PrivilegedWriter::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Whether the resolver cache flush succeeded.
    pub cache_flushed: bool,
}

/// Writes text to the privileged target file.
///
/// Holds no state between calls. No retries are attempted; the caller
/// decides whether to prompt again.
pub struct PrivilegedWriter {
    target: PathBuf,
    scratch_dir: PathBuf,
    elevator: Box<dyn Elevator>,
    flusher: Box<dyn CacheFlusher>,
}

impl PrivilegedWriter {
    /// Creates a writer with explicit capabilities.
    #[must_use]
    pub fn new(
        target: impl Into<PathBuf>,
        scratch_dir: impl Into<PathBuf>,
        elevator: Box<dyn Elevator>,
        flusher: Box<dyn CacheFlusher>,
    ) -> Self {
        Self {
            target: target.into(),
            scratch_dir: scratch_dir.into(),
            elevator,
            flusher,
        }
    }

    /// Creates the writer for the running system: a direct copy when
    /// running as root, the `osascript` prompt otherwise.
    #[must_use]
    pub fn system(settings: &HostsSettings) -> Self {
        let elevator: Box<dyn Elevator> = if is_root() {
            Box::new(DirectElevator)
        } else {
            Box::new(OsascriptElevator::new())
        };
        Self::new(
            &settings.hosts_path,
            settings.scratch_dir(),
            elevator,
            Box::new(KillallFlusher),
        )
    }

    /// The privileged target path.
    #[must_use]
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Stages `content`, copies it over the target with elevated
    /// privileges and flushes the resolver cache.
    ///
    /// The target is untouched on every error path.
    ///
    /// # Errors
    ///
    /// - [`HostsError::ScratchIo`] if the content cannot be staged.
    /// - [`HostsError::AuthenticationFailed`] if the credentials were rejected.
    /// - [`HostsError::UserCancelled`] if the prompt was dismissed.
    /// - [`HostsError::PrivilegedWriteFailed`] for any other failure.
    pub fn apply(&self, content: &str) -> Result<WriteOutcome> {
        let staged = stage(&self.scratch_dir, STAGED_PREFIX, "", content)?;

        let output = self.elevator.copy_over(&ElevationRequest {
            source: staged.path(),
            target: &self.target,
            scratch_dir: &self.scratch_dir,
        })?;
        classify(&output)?;

        tracing::info!(
            target = %self.target.display(),
            bytes = content.len(),
            "Wrote hosts file"
        );

        let cache_flushed = match self.flusher.flush() {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Resolver cache flush failed, ignoring");
                false
            }
        };
        Ok(WriteOutcome { cache_flushed })
    }
}

impl std::fmt::Debug for PrivilegedWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivilegedWriter")
            .field("target", &self.target)
            .field("scratch_dir", &self.scratch_dir)
            .finish_non_exhaustive()
    }
}

/// Maps an elevation exit status and stderr to a result.
///
/// # Errors
///
/// Returns the [`HostsError`] matching a non-zero exit.
pub fn classify(output: &ElevationOutput) -> Result<()> {
    if output.is_success() {
        return Ok(());
    }
    let stderr = output.stderr.trim();
    let lower = stderr.to_lowercase();
    if lower.contains(BAD_CREDENTIALS) {
        Err(HostsError::AuthenticationFailed)
    } else if lower.contains(USER_CANCELED) {
        Err(HostsError::UserCancelled)
    } else if stderr.is_empty() {
        let detail = output
            .code
            .map_or_else(|| "terminated by signal".to_string(), |c| format!("exit code {c}"));
        Err(HostsError::PrivilegedWriteFailed(detail))
    } else {
        Err(HostsError::PrivilegedWriteFailed(stderr.to_string()))
    }
}

/// Writes `content` to a new scratch file that is deleted when dropped.
fn stage(
    dir: &Path,
    prefix: &str,
    suffix: &str,
    content: &str,
) -> Result<tempfile::NamedTempFile> {
    fs::create_dir_all(dir).map_err(|e| HostsError::scratch(dir, e))?;
    let mut file = tempfile::Builder::new()
        .prefix(prefix)
        .suffix(suffix)
        .tempfile_in(dir)
        .map_err(|e| HostsError::scratch(dir, e))?;
    file.write_all(content.as_bytes())
        .and_then(|()| file.flush())
        .map_err(|e| HostsError::scratch(dir, e))?;
    tracing::debug!(path = %file.path().display(), "Staged scratch file");
    Ok(file)
}
