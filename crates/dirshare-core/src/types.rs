//! Core data model shared by every engine component.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::ident::FileIdent;

/// Wall-clock timestamp with the precision DDS-style transports expose:
/// whole seconds plus nanoseconds. Ordered lexicographically on
/// `(sec, nsec)`, which is the "last-write-wins" comparison used
/// throughout the engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp {
    pub sec: u64,
    pub nsec: u32,
}

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp { sec: 0, nsec: 0 };

    pub const fn new(sec: u64, nsec: u32) -> Self {
        Self { sec, nsec }
    }

    /// Current wall-clock time, used by the publisher when stamping
    /// outbound events. Saturates to [`Timestamp::ZERO`] on a clock error
    /// rather than panicking.
    pub fn now() -> Self {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(d) => Timestamp::new(d.as_secs(), d.subsec_nanos()),
            Err(_) => Timestamp::ZERO,
        }
    }
}

/// The kind of local/remote change a [`FileEvent`] announces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileOp {
    Create,
    Modify,
    Delete,
}

/// A file's externally observable identity at a point in time: everything
/// needed to tell whether two observations of the same ident refer to the
/// same bytes, without comparing the bytes themselves.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub ident: FileIdent,
    pub size: u64,
    pub mtime: Timestamp,
    pub crc32: u32,
}

/// A create/modify/delete notification. `metadata` is meaningful for
/// `Create`/`Modify`; for `Delete` only `ident` and `event_time` are
/// authoritative.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileEvent {
    pub ident: FileIdent,
    pub op: FileOp,
    pub event_time: Timestamp,
    pub metadata: Option<FileMetadata>,
}

/// A whole-file payload, used when `size < CHUNK_THRESHOLD`.
///
/// `size` and `crc32` are derived from `bytes` at construction so they can
/// never drift from the payload they describe.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileContent {
    pub ident: FileIdent,
    pub bytes: Vec<u8>,
    pub size: u64,
    pub crc32: u32,
    pub mtime: Timestamp,
}

impl FileContent {
    pub fn new(ident: FileIdent, bytes: Vec<u8>, mtime: Timestamp) -> Self {
        let size = bytes.len() as u64;
        let crc32 = crate::integrity::crc32(&bytes);
        Self {
            ident,
            bytes,
            size,
            crc32,
            mtime,
        }
    }
}

/// One fragment of a large file, used when `size >= CHUNK_THRESHOLD`.
///
/// `chunk_crc32` covers only `bytes`; `file_crc32` and `file_size` are
/// copied into every chunk so the reassembler can validate the whole file
/// without a side channel.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileChunk {
    pub ident: FileIdent,
    pub chunk_id: u32,
    pub total_chunks: u32,
    pub bytes: Vec<u8>,
    pub chunk_crc32: u32,
    pub file_size: u64,
    pub file_crc32: u32,
    pub mtime: Timestamp,
}

/// Full directory listing published at startup and on demand, used only
/// for late-joiner catch-up (`SnapshotReconciler`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DirectorySnapshot {
    pub participant_id: String,
    pub files: Vec<FileMetadata>,
    pub snapshot_time: Timestamp,
}

impl DirectorySnapshot {
    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}
