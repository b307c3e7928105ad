//! DirShare Core - shared data model, wire protocol, integrity, and config
//!
//! This crate contains the foundational types used by the synchronisation
//! engine. It has no dependency on networking or filesystem-IO code: those
//! concerns live in `dirshare-engine`.

pub mod config;
pub mod error;
pub mod ident;
pub mod integrity;
pub mod protocol;
pub mod types;

pub use config::Config;
pub use error::SyncError;
pub use ident::FileIdent;
pub use integrity::{crc32, crc32_file, crc32_finalize, crc32_update, Crc32State};
pub use protocol::DirShareMessage;
pub use types::*;

/// Chunk granularity for large-file transfer (1 MiB).
pub const CHUNK_SIZE: u64 = 1024 * 1024;

/// Files at or above this size are sent as chunks instead of a single
/// `FileContent` payload (10 MiB).
pub const CHUNK_THRESHOLD: u64 = 10 * 1024 * 1024;

/// Default directory-scan polling interval.
pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 2;

/// Files larger than this are rejected outright (~1 GiB), per the
/// "more than ~1 GB per file" non-goal.
pub const MAX_FILE_SIZE: u64 = 1024 * 1024 * 1024;
