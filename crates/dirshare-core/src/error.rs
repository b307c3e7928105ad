//! Error taxonomy for the synchronisation engine.
//!
//! Filesystem and transport failures keep their own types at the boundary
//! that produces them (`std::io::Error`, `dirshare_engine::transport::TransportError`);
//! `SyncError` covers the kinds the applier itself decides on — a bad
//! ident, a failed integrity check, a stale update — all of which are
//! recovered locally (logged, item dropped, ident resumed) rather than
//! propagated.

use thiserror::Error;

/// A [`FileIdent`](crate::FileIdent) failed validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("empty filename")]
    Empty,
    #[error("filename contains a path separator")]
    PathSeparator,
    #[error("filename begins with a path separator")]
    LeadingSeparator,
    #[error("filename contains \"..\"")]
    ParentReference,
    #[error("filename looks like a drive-letter prefix")]
    DriveLetterPrefix,
}

/// Errors the [`InboundApplier`](crate) decides about and recovers from
/// without propagating: the item is dropped, logged, and the ident is
/// resumed.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("invalid ident {ident:?}: {source}")]
    InvalidIdent {
        ident: String,
        #[source]
        source: ValidationError,
    },

    #[error("integrity check failed for {ident:?}: {reason}")]
    Integrity { ident: String, reason: String },

    #[error("stale update for {ident:?} rejected (local is newer or equal)")]
    Stale { ident: String },
}
