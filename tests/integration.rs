//! Integration tests for `switch-hosts`.
//!
//! Tests marked `#[ignore]` require macOS and an administrator account:
//!
//! ```bash
//! cargo test -- --ignored
//! ```

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use switch_hosts::block::{END_MARKER, START_MARKER};
use switch_hosts::{
    CacheFlusher, DirectElevator, ElevationOutput, ElevationRequest, Elevator, HostsError,
    HostsManager, HostsSettings, PrivilegedWriter, Result,
};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Fails every elevation with the given stderr.
struct StderrElevator(&'static str);

impl Elevator for StderrElevator {
    fn copy_over(&self, _request: &ElevationRequest<'_>) -> Result<ElevationOutput> {
        Ok(ElevationOutput::failure(1, self.0))
    }
}

struct CountingFlusher(Arc<AtomicUsize>);

impl CacheFlusher for CountingFlusher {
    fn flush(&self) -> Result<()> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn settings(dir: &Path) -> HostsSettings {
    HostsSettings::new()
        .with_hosts_path(dir.join("hosts"))
        .with_store_dir(dir.join(".swHosts"))
}

fn manager(dir: &Path, elevator: Box<dyn Elevator>) -> (HostsManager, Arc<AtomicUsize>) {
    let s = settings(dir);
    let flushes = Arc::new(AtomicUsize::new(0));
    let writer = PrivilegedWriter::new(
        &s.hosts_path,
        s.scratch_dir(),
        elevator,
        Box::new(CountingFlusher(Arc::clone(&flushes))),
    );
    (HostsManager::with_writer(s, writer), flushes)
}

// ---------------------------------------------------------------------------
// Tempdir tests
// ---------------------------------------------------------------------------

#[test]
fn full_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("hosts"), "127.0.0.1 localhost\n").unwrap();
    let (mut m, flushes) = manager(dir.path(), Box::new(DirectElevator));

    let a = m.add_config("A", "10.0.0.1 a.local");
    let b = m.add_config("B", "10.0.0.2 b.local\n");
    m.toggle_and_apply(a, true).unwrap();
    let report = m.toggle_and_apply(b, true).unwrap();
    assert!(report.is_success());
    assert_eq!(flushes.load(Ordering::SeqCst), 2);

    let written = fs::read_to_string(dir.path().join("hosts")).unwrap();
    assert_eq!(
        written,
        format!(
            "127.0.0.1 localhost\n\n{START_MARKER}\n\n# active: A\n10.0.0.1 a.local\n\n\
             # active: B\n10.0.0.2 b.local\n{END_MARKER}\n"
        )
    );

    // Deactivate A: only B remains, still a single managed region.
    m.toggle_and_apply(a, false).unwrap();
    let written = fs::read_to_string(dir.path().join("hosts")).unwrap();
    assert!(!written.contains("a.local"));
    assert!(written.contains("# active: B\n"));
    assert_eq!(written.matches(START_MARKER).count(), 1);

    // A fresh manager sees the same configs and state.
    let (reloaded, _) = manager(dir.path(), Box::new(DirectElevator));
    assert!(reloaded.last_error().is_none());
    let names: Vec<&str> = reloaded.configs()[1..].iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["A", "B"]);
    assert!(!reloaded.config(a).unwrap().is_active);
    assert!(reloaded.config(b).unwrap().is_active);
    assert_eq!(reloaded.system_config().content, "127.0.0.1 localhost");
}

#[test]
fn apply_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("hosts"), "127.0.0.1 localhost\n::1 localhost\n").unwrap();
    let (mut m, _) = manager(dir.path(), Box::new(DirectElevator));
    let id = m.add_config("dev", "10.0.0.1 dev.local");
    m.toggle_and_apply(id, true).unwrap();
    let first = fs::read_to_string(dir.path().join("hosts")).unwrap();

    assert!(m.apply_active().is_success());
    let second = fs::read_to_string(dir.path().join("hosts")).unwrap();
    assert_eq!(first, second);
}

#[test]
fn manual_edits_outside_region_survive() {
    let dir = tempfile::tempdir().unwrap();
    let hosts = dir.path().join("hosts");
    fs::write(&hosts, "127.0.0.1 localhost\n").unwrap();
    let (mut m, _) = manager(dir.path(), Box::new(DirectElevator));
    let id = m.add_config("dev", "10.0.0.1 dev.local");
    m.toggle_and_apply(id, true).unwrap();

    let mut edited = fs::read_to_string(&hosts).unwrap();
    edited.push_str("10.9.9.9 added-by-hand\n");
    fs::write(&hosts, edited).unwrap();

    assert!(m.apply_active().is_success());
    let written = fs::read_to_string(&hosts).unwrap();
    assert!(written.starts_with("127.0.0.1 localhost\n\n\n10.9.9.9 added-by-hand\n\n"));
    assert_eq!(written.matches("10.0.0.1 dev.local").count(), 1);
    assert_eq!(
        m.system_config().content,
        "127.0.0.1 localhost\n\n\n10.9.9.9 added-by-hand"
    );

    // The joined base is stable from here on.
    assert!(m.apply_active().is_success());
    assert_eq!(fs::read_to_string(&hosts).unwrap(), written);
}

#[test]
fn cancelled_apply_leaves_target_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let hosts = dir.path().join("hosts");
    fs::write(&hosts, "127.0.0.1 localhost\n").unwrap();
    let (mut m, flushes) = manager(
        dir.path(),
        Box::new(StderrElevator("0:123: execution error: User canceled. (-128)")),
    );
    let id = m.add_config("dev", "10.0.0.1 dev.local");
    let before = fs::read(&hosts).unwrap();

    let report = m.toggle_and_apply(id, true).unwrap();
    assert!(!report.is_success());
    assert!(report.failure().unwrap().is_cancelled());
    assert!(m.last_error().unwrap().is_cancelled());
    assert!(m.config(id).unwrap().is_active);
    assert_eq!(fs::read(&hosts).unwrap(), before);
    assert_eq!(flushes.load(Ordering::SeqCst), 0);
    assert_eq!(fs::read_dir(dir.path().join(".swHosts")).unwrap().count(), 1);
}

#[test]
fn unclassified_failure_carries_stderr() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("hosts"), "127.0.0.1 localhost\n").unwrap();
    let (mut m, _) = manager(dir.path(), Box::new(StderrElevator("cp: hosts: Operation not permitted")));

    let report = m.apply_active();
    match m.last_error() {
        Some(HostsError::PrivilegedWriteFailed(detail)) => {
            assert_eq!(detail, "cp: hosts: Operation not permitted");
        }
        other => panic!("unexpected last error: {other:?}"),
    }
    assert_eq!(report.message(), "Failed to update hosts: cp: hosts: Operation not permitted");
}

#[test]
fn remove_deletes_from_store_file() {
    let dir = tempfile::tempdir().unwrap();
    let (mut m, _) = manager(dir.path(), Box::new(DirectElevator));
    let id = m.add_config("gone", "10.0.0.1 gone.local");
    let store = dir.path().join(".swHosts/host_configs.json");
    assert!(fs::read_to_string(&store).unwrap().contains(&id.to_string()));

    m.remove_config(id).unwrap();
    assert!(m.config(id).is_none());
    assert!(!fs::read_to_string(&store).unwrap().contains(&id.to_string()));
}

#[test]
fn missing_target_applies_with_empty_base() {
    let dir = tempfile::tempdir().unwrap();
    let (mut m, _) = manager(dir.path(), Box::new(DirectElevator));
    assert!(matches!(m.last_error(), Some(HostsError::ReadFailure { .. })));

    let report = m.apply_active();
    assert!(report.is_success());
    assert!(matches!(report.merge_warning, Some(HostsError::ReadFailure { .. })));
    assert_eq!(
        fs::read_to_string(dir.path().join("hosts")).unwrap(),
        format!("\n\n{START_MARKER}\n{END_MARKER}\n")
    );
}

// ---------------------------------------------------------------------------
// macOS-only tests
// ---------------------------------------------------------------------------

#[test]
#[ignore = "requires macOS and prompts for administrator credentials"]
fn real_reapply_keeps_hosts_file() {
    let mut m = HostsManager::new(HostsSettings::new());
    let report = m.apply_active();
    assert!(report.is_success(), "{}", report.message());

    let hosts = fs::read_to_string("/etc/hosts").unwrap();
    assert_eq!(hosts, report.content);
}
