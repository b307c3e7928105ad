//! Directory scanner — periodic polling and diffing against the previous
//! observation.
//!
//! Runs on a dedicated OS thread rather than the tokio runtime: it blocks
//! on filesystem syscalls and on its own sleep between ticks, so it must
//! never run as a tokio task that would starve the runtime's worker
//! threads. Scan diffs cross into the async side of the engine over a
//! bounded `crossbeam-channel`, the same sync-thread/async-runtime bridge
//! pattern used elsewhere to connect a blocking callback source to tokio.

use std::collections::HashMap;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::Sender;
use tracing::{debug, warn};

use dirshare_core::ident::FileIdent;
use dirshare_core::types::{FileMetadata, Timestamp};

use crate::fs_adapter::FilesystemAdapter;
use crate::suppression::SuppressionSet;

/// One filesystem observation: everything the scanner needs to decide
/// whether a file changed, without re-reading its bytes on every tick.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Observation {
    size: u64,
    mtime: Timestamp,
    crc32: u32,
}

/// The three change sets a tick produces, already filtered through the
/// [`SuppressionSet`].
#[derive(Debug, Default, Clone)]
pub struct ScanDiff {
    pub created: Vec<FileMetadata>,
    pub modified: Vec<FileMetadata>,
    pub deleted: Vec<FileIdent>,
}

impl ScanDiff {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }
}

/// Polls a shared directory at a fixed interval and diffs it against the
/// last successfully observed snapshot.
pub struct DirectoryScanner {
    fs: FilesystemAdapter,
    suppression: SuppressionSet,
    previous_state: HashMap<FileIdent, Observation>,
}

impl DirectoryScanner {
    pub fn new(fs: FilesystemAdapter, suppression: SuppressionSet) -> Self {
        Self {
            fs,
            suppression,
            previous_state: HashMap::new(),
        }
    }

    /// Run one scan tick: list, observe, diff, filter through suppression,
    /// then replace `previous_state` with the full current observation
    /// (including filtered-out suppressed entries, so the next tick sees
    /// a resumed ident as already tracked and does not emit a spurious
    /// create).
    ///
    /// If listing the directory itself fails, the tick emits an empty
    /// diff and leaves `previous_state` untouched, so a transient listing
    /// error can't manufacture a burst of spurious deletes on the next
    /// successful tick.
    pub fn tick(&mut self) -> ScanDiff {
        let idents = match self.fs.list_regular_files() {
            Ok(idents) => idents,
            Err(e) => {
                warn!("scan tick: failed to list shared directory: {}", e);
                return ScanDiff::default();
            }
        };

        let mut current_state = HashMap::with_capacity(idents.len());
        for ident in idents {
            match self.observe(&ident) {
                Some(obs) => {
                    current_state.insert(ident, obs);
                }
                None => continue, // vanished or unreadable between list and hash; skip this tick
            }
        }

        let mut diff = ScanDiff::default();

        for (ident, obs) in &current_state {
            match self.previous_state.get(ident) {
                None => diff.created.push(self.to_metadata(ident, obs)),
                Some(prev) if prev != obs => diff.modified.push(self.to_metadata(ident, obs)),
                Some(_) => {}
            }
        }

        for ident in self.previous_state.keys() {
            if !current_state.contains_key(ident) {
                diff.deleted.push(ident.clone());
            }
        }

        self.filter_suppressed(&mut diff);

        self.previous_state = current_state;
        diff
    }

    fn observe(&self, ident: &FileIdent) -> Option<Observation> {
        let size = self.fs.get_size(ident).ok()?;
        let mtime = self.fs.get_mtime(ident).ok()?;
        let bytes = self.fs.read_all(ident).ok()?;
        let crc32 = dirshare_core::integrity::crc32(&bytes);
        Some(Observation { size, mtime, crc32 })
    }

    fn to_metadata(&self, ident: &FileIdent, obs: &Observation) -> FileMetadata {
        FileMetadata {
            ident: ident.clone(),
            size: obs.size,
            mtime: obs.mtime,
            crc32: obs.crc32,
        }
    }

    /// Remove any ident currently marked suppressed from all three sets.
    /// The scanner logs but never publishes for a suppressed ident.
    fn filter_suppressed(&self, diff: &mut ScanDiff) {
        diff.created.retain(|m| self.retain_unsuppressed(&m.ident));
        diff.modified.retain(|m| self.retain_unsuppressed(&m.ident));
        diff.deleted.retain(|i| self.retain_unsuppressed(i));
    }

    fn retain_unsuppressed(&self, ident: &FileIdent) -> bool {
        if self.suppression.is_suppressed(ident) {
            debug!("suppressing scan event for {}", ident);
            false
        } else {
            true
        }
    }
}

/// Drives a [`DirectoryScanner`] on its own thread, sending each
/// non-empty-or-empty diff to `tx` every `interval`. Returns the thread's
/// `JoinHandle` so `EngineLoop` can join it during shutdown after the
/// current tick completes.
pub fn spawn(
    mut scanner: DirectoryScanner,
    interval: Duration,
    tx: Sender<ScanDiff>,
    shutdown: crossbeam_channel::Receiver<()>,
) -> JoinHandle<()> {
    std::thread::spawn(move || loop {
        let diff = scanner.tick();
        if tx.send(diff).is_err() {
            break; // receiver gone, engine is shutting down
        }

        if shutdown.recv_timeout(interval).is_ok() {
            break;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn scanner_in(dir: &std::path::Path) -> (DirectoryScanner, SuppressionSet) {
        let suppression = SuppressionSet::new();
        let fs_adapter = FilesystemAdapter::new(dir);
        (DirectoryScanner::new(fs_adapter, suppression.clone()), suppression)
    }

    #[test]
    fn quiescent_filesystem_yields_empty_diffs() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"hello").unwrap();
        let (mut scanner, _sup) = scanner_in(dir.path());

        let first = scanner.tick();
        assert_eq!(first.created.len(), 1);

        for _ in 0..5 {
            let diff = scanner.tick();
            assert!(diff.is_empty(), "expected no events on a quiet filesystem");
        }
    }

    #[test]
    fn single_create_fires_exactly_once() {
        let dir = tempdir().unwrap();
        let (mut scanner, _sup) = scanner_in(dir.path());

        assert!(scanner.tick().is_empty());

        fs::write(dir.path().join("new.txt"), b"content").unwrap();
        let diff = scanner.tick();
        assert_eq!(diff.created.len(), 1);
        assert_eq!(diff.created[0].ident.as_str(), "new.txt");

        for _ in 0..3 {
            assert!(scanner.tick().is_empty());
        }
    }

    #[test]
    fn modification_is_detected() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"v1").unwrap();
        let (mut scanner, _sup) = scanner_in(dir.path());
        scanner.tick();

        fs::write(dir.path().join("a.txt"), b"v2-longer").unwrap();
        let diff = scanner.tick();
        assert_eq!(diff.modified.len(), 1);
        assert_eq!(diff.modified[0].size, 9);
    }

    #[test]
    fn deletion_is_detected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, b"v1").unwrap();
        let (mut scanner, _sup) = scanner_in(dir.path());
        scanner.tick();

        fs::remove_file(&path).unwrap();
        let diff = scanner.tick();
        assert_eq!(diff.deleted, vec![FileIdent::new("a.txt").unwrap()]);
    }

    #[test]
    fn suppressed_write_produces_no_event_and_is_tracked_afterward() {
        let dir = tempdir().unwrap();
        let (mut scanner, suppression) = scanner_in(dir.path());
        assert!(scanner.tick().is_empty());

        let ident = FileIdent::new("remote.txt").unwrap();
        suppression.suppress(ident.clone());
        fs::write(dir.path().join("remote.txt"), b"written by remote").unwrap();
        suppression.resume(&ident);

        // Tick N+1: suppression was held for the whole window, so no event.
        let diff = scanner.tick();
        assert!(diff.is_empty());

        // Tick N+2: file is now tracked, still no spurious create.
        let diff = scanner.tick();
        assert!(diff.is_empty());
    }

    #[test]
    fn listing_failure_leaves_previous_state_untouched() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"v1").unwrap();
        let (mut scanner, _sup) = scanner_in(dir.path());
        scanner.tick();

        // Point the adapter at a directory that doesn't exist to force a
        // listing failure, without touching the scanner's internal state.
        scanner.fs = FilesystemAdapter::new(dir.path().join("missing"));
        let diff = scanner.tick();
        assert!(diff.is_empty());

        // Restore and confirm state survived: no spurious delete/create.
        scanner.fs = FilesystemAdapter::new(dir.path());
        let diff = scanner.tick();
        assert!(diff.is_empty());
    }
}
