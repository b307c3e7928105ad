//! Filesystem adapter — the only module that touches the shared directory
//! directly.
//!
//! Every other component goes through here so the rest of the engine never
//! has to reason about platform-specific filesystem quirks (symlinks,
//! mtime precision, special files). Operations are plain blocking
//! `std::fs` calls — the engine always calls them from a dedicated
//! blocking context (the scanner thread, or a `spawn_blocking` task)
//! rather than from the async runtime's worker threads.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::warn;

use dirshare_core::ident::FileIdent;
use dirshare_core::types::Timestamp;

/// Root handle for filesystem operations against one shared directory.
#[derive(Clone)]
pub struct FilesystemAdapter {
    root: PathBuf,
}

impl FilesystemAdapter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, ident: &FileIdent) -> PathBuf {
        self.root.join(ident.as_str())
    }

    /// Non-recursive listing of regular files in the shared directory.
    ///
    /// Skips "." and "..", and anything that is not a regular file —
    /// symlinks, directories, and special files are ignored outright, per
    /// the non-goals around subdirectory sync and symlink handling.
    /// Results are filtered through [`FileIdent`] validation; invalid
    /// names are dropped with a logged error rather than failing the
    /// whole listing.
    pub fn list_regular_files(&self) -> io::Result<Vec<FileIdent>> {
        let mut out = Vec::new();

        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => return Err(e),
        };

        for entry in entries {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!("error reading directory entry: {}", e);
                    continue;
                }
            };

            let file_type = match entry.file_type() {
                Ok(ft) => ft,
                Err(e) => {
                    warn!("cannot stat {:?}: {}", entry.path(), e);
                    continue;
                }
            };

            if !file_type.is_file() {
                // Symlinks, directories, FIFOs, sockets, etc. are ignored.
                continue;
            }

            let name = entry.file_name();
            let name = match name.to_str() {
                Some(n) => n,
                None => {
                    warn!("skipping non-UTF-8 filename {:?}", name);
                    continue;
                }
            };

            match FileIdent::new(name) {
                Ok(ident) => out.push(ident),
                Err(e) => warn!("dropping invalid filename {:?}: {}", name, e),
            }
        }

        Ok(out)
    }

    pub fn read_all(&self, ident: &FileIdent) -> io::Result<Vec<u8>> {
        fs::read(self.path_of(ident))
    }

    /// Create-or-truncate write. Not required to be atomic (the design
    /// explicitly does not require a temp-file-and-rename dance here).
    pub fn write_all(&self, ident: &FileIdent, bytes: &[u8]) -> io::Result<()> {
        fs::write(self.path_of(ident), bytes)
    }

    pub fn get_size(&self, ident: &FileIdent) -> io::Result<u64> {
        Ok(fs::metadata(self.path_of(ident))?.len())
    }

    /// `(sec, nsec)` modification time. `nsec` precision depends on the
    /// host filesystem; platforms that only expose second granularity
    /// report 0.
    pub fn get_mtime(&self, ident: &FileIdent) -> io::Result<Timestamp> {
        let meta = fs::metadata(self.path_of(ident))?;
        Ok(system_time_to_timestamp(meta.modified()?))
    }

    /// Best-effort mtime set. Failure is the caller's to log as a
    /// warning, never a fatal error — the design explicitly downgrades
    /// this to non-fatal.
    pub fn set_mtime(&self, ident: &FileIdent, mtime: Timestamp) -> io::Result<()> {
        let path = self.path_of(ident);
        let time = UNIX_EPOCH + Duration::new(mtime.sec, mtime.nsec);
        set_file_mtime(&path, time)
    }

    pub fn exists_regular(&self, ident: &FileIdent) -> bool {
        fs::metadata(self.path_of(ident))
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    pub fn is_directory(&self, ident: &FileIdent) -> bool {
        fs::metadata(self.path_of(ident))
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    pub fn remove(&self, ident: &FileIdent) -> bool {
        fs::remove_file(self.path_of(ident)).is_ok()
    }
}

fn system_time_to_timestamp(time: SystemTime) -> Timestamp {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => Timestamp::new(d.as_secs(), d.subsec_nanos()),
        Err(_) => Timestamp::ZERO,
    }
}

/// `std::fs::File::set_modified` maps to `utimensat`/`SetFileTime` on the
/// platforms Rust supports, giving portable mtime-setting without a
/// separate dependency.
fn set_file_mtime(path: &Path, time: SystemTime) -> io::Result<()> {
    let file = fs::OpenOptions::new().write(true).open(path)?;
    file.set_modified(time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn lists_only_regular_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"a").unwrap();
        fs::write(dir.path().join("b.txt"), b"b").unwrap();
        fs::create_dir(dir.path().join("subdir")).unwrap();
        #[cfg(unix)]
        std::os::unix::fs::symlink(dir.path().join("a.txt"), dir.path().join("link.txt")).unwrap();

        let adapter = FilesystemAdapter::new(dir.path());
        let mut names: Vec<String> = adapter
            .list_regular_files()
            .unwrap()
            .into_iter()
            .map(|i| i.into_string())
            .collect();
        names.sort();

        assert_eq!(names, vec!["a.txt".to_string(), "b.txt".to_string()]);
    }

    #[test]
    fn drops_invalid_filenames_without_failing_listing() {
        // Every filename std::fs can actually create is a valid single
        // path component, so this test exercises the "valid" path and
        // simply documents the invariant; invalid-name rejection itself
        // is covered by dirshare_core::ident's tests.
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("ok.txt"), b"x").unwrap();
        let adapter = FilesystemAdapter::new(dir.path());
        assert_eq!(adapter.list_regular_files().unwrap().len(), 1);
    }

    #[test]
    fn read_write_roundtrip() {
        let dir = tempdir().unwrap();
        let adapter = FilesystemAdapter::new(dir.path());
        let ident = FileIdent::new("round.bin").unwrap();

        adapter.write_all(&ident, b"payload").unwrap();
        assert!(adapter.exists_regular(&ident));
        assert_eq!(adapter.read_all(&ident).unwrap(), b"payload");
        assert_eq!(adapter.get_size(&ident).unwrap(), 7);
    }

    #[test]
    fn set_mtime_then_get_mtime_is_best_effort_but_usually_exact() {
        let dir = tempdir().unwrap();
        let adapter = FilesystemAdapter::new(dir.path());
        let ident = FileIdent::new("stamped.txt").unwrap();
        adapter.write_all(&ident, b"x").unwrap();

        let target = Timestamp::new(1_700_000_000, 0);
        adapter.set_mtime(&ident, target).unwrap();
        let observed = adapter.get_mtime(&ident).unwrap();
        assert_eq!(observed.sec, target.sec);
    }

    #[test]
    fn remove_reports_success_and_absence() {
        let dir = tempdir().unwrap();
        let adapter = FilesystemAdapter::new(dir.path());
        let ident = FileIdent::new("gone.txt").unwrap();
        adapter.write_all(&ident, b"x").unwrap();

        assert!(adapter.remove(&ident));
        assert!(!adapter.exists_regular(&ident));
        assert!(!adapter.remove(&ident));
    }
}
