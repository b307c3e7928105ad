//! Inbound applier — the heart of the engine.
//!
//! Subscribes (conceptually; `EngineLoop` owns the actual channel tasks) to
//! the Events, Content, and Chunks side of the bus and applies remote state
//! locally while maintaining the suppression contract. Every code path
//! that suppresses an ident goes through a [`SuppressionGuard`] so
//! `resume` always runs, no matter which of the early returns below fires.

use tracing::{debug, error, info, warn};

use dirshare_core::ident::FileIdent;
use dirshare_core::types::{FileContent, FileEvent, FileOp, Timestamp};
use dirshare_core::SyncError;

use crate::fs_adapter::FilesystemAdapter;
use crate::reassembler::ChunkReassembler;
use crate::suppression::SuppressionSet;

/// Applies inbound events and payloads to the local shared directory.
pub struct InboundApplier {
    fs: FilesystemAdapter,
    suppression: SuppressionSet,
    reassembler: ChunkReassembler,
}

impl InboundApplier {
    pub fn new(fs: FilesystemAdapter, suppression: SuppressionSet) -> Self {
        Self {
            fs,
            suppression,
            reassembler: ChunkReassembler::new(),
        }
    }

    /// Handle one inbound [`FileEvent`].
    pub fn handle_event(&self, event: FileEvent) {
        if let Err(e) = validate_ident(&event.ident) {
            error!("{}", e);
            return;
        }

        match event.op {
            FileOp::Create | FileOp::Modify => self.handle_upsert_event(&event),
            FileOp::Delete => self.handle_delete_event(&event),
        }
    }

    fn handle_upsert_event(&self, event: &FileEvent) {
        if matches!(event.op, FileOp::Create) && self.fs.exists_regular(&event.ident) {
            info!("{}: already present, ignoring CREATE", event.ident);
            return;
        }

        // Arm suppression; the payload on Content or Chunks does the
        // actual write. Payload-before-event is tolerated: the payload
        // handler arms suppression itself if it is not already armed.
        self.suppression.suppress(event.ident.clone());
    }

    fn handle_delete_event(&self, event: &FileEvent) {
        let ident = &event.ident;

        if !self.fs.exists_regular(ident) {
            return;
        }

        let local_mtime = match self.fs.get_mtime(ident) {
            Ok(t) => t,
            Err(e) => {
                warn!("{}: failed to stat for delete conflict check: {}", ident, e);
                return;
            }
        };

        if event.event_time <= local_mtime {
            debug!("{}: local is newer or equal, ignoring remote DELETE", ident);
            return;
        }

        let guard = self.suppression.guard(ident.clone());
        if self.fs.remove(ident) {
            info!("{}: removed (remote delete wins)", ident);
        } else {
            warn!("{}: remote delete won but local removal failed", ident);
        }
        guard.dismiss();
        self.suppression.resume(ident);
    }

    /// Handle one inbound [`FileContent`] (small-file payload).
    pub fn handle_content(&self, content: FileContent) {
        if let Err(e) = validate_ident(&content.ident) {
            error!("{}", e);
            // Defensive: an earlier FileEvent for this same (invalid)
            // ident could in principle have armed suppression before this
            // payload's own validation failed.
            self.suppression.resume(&content.ident);
            return;
        }

        let ident = content.ident.clone();

        // Arm suppression in case this payload beat its FileEvent onto
        // the bus; idempotent if the event handler already armed it.
        let guard = self.suppression.guard(ident.clone());

        if let Err(e) = self.validate_upsert(&ident, content.size, content.bytes.len() as u64, content.crc32, &content.bytes, content.mtime) {
            warn!("{}", e);
            return; // guard drops here, resuming the ident
        }

        self.write_verified(&ident, &content.bytes, content.mtime, guard);
    }

    /// Called by `EngineLoop` after the [`ChunkReassembler`] yields a
    /// [`crate::reassembler::Complete`] for this applier's reassembler
    /// (owned here so a single applier fronts both Content and Chunks).
    pub fn handle_chunk(&self, chunk: dirshare_core::types::FileChunk) {
        if let Err(e) = validate_ident(&chunk.ident) {
            error!("{}", e);
            return;
        }

        let ident = chunk.ident.clone();
        if let Some(complete) = self.reassembler.accept(chunk) {
            let guard = self.suppression.guard(ident.clone());

            if let Err(e) = self.validate_upsert(
                &ident,
                complete.file_size,
                complete.bytes.len() as u64,
                complete.file_crc32,
                &complete.bytes,
                complete.mtime,
            ) {
                warn!("{}", e);
                return;
            }

            self.write_verified(&ident, &complete.bytes, complete.mtime, guard);
        }
    }

    /// Staleness then integrity checks shared by the Content and
    /// reassembled-Chunk paths. Returns `Ok(())` only once both have
    /// passed; the caller still owns the suppression guard and must let
    /// it drop (or dismiss it after a successful write) on every path.
    fn validate_upsert(
        &self,
        ident: &FileIdent,
        declared_size: u64,
        actual_len: u64,
        declared_crc32: u32,
        bytes: &[u8],
        mtime: Timestamp,
    ) -> Result<(), SyncError> {
        if self.fs.exists_regular(ident) {
            if let Ok(local_mtime) = self.fs.get_mtime(ident) {
                if local_mtime >= mtime {
                    return Err(SyncError::Stale {
                        ident: ident.to_string(),
                    });
                }
            }
        }

        if declared_size != actual_len {
            return Err(SyncError::Integrity {
                ident: ident.to_string(),
                reason: format!("size mismatch: declared {declared_size}, got {actual_len}"),
            });
        }

        let actual_crc32 = dirshare_core::integrity::crc32(bytes);
        if actual_crc32 != declared_crc32 {
            return Err(SyncError::Integrity {
                ident: ident.to_string(),
                reason: format!("checksum mismatch: declared {declared_crc32:#x}, got {actual_crc32:#x}"),
            });
        }

        Ok(())
    }

    fn write_verified(
        &self,
        ident: &FileIdent,
        bytes: &[u8],
        mtime: Timestamp,
        guard: crate::suppression::SuppressionGuard,
    ) {
        if let Err(e) = self.fs.write_all(ident, bytes) {
            error!("{}: failed to write local copy: {}", ident, e);
            return; // guard drops, resume runs
        }

        if let Err(e) = self.fs.set_mtime(ident, mtime) {
            warn!("{}: failed to set mtime after write: {}", ident, e);
        }

        guard.dismiss();
        self.suppression.resume(ident);
    }
}

/// `FileIdent` derives `Deserialize` as a transparent string wrapper, so an
/// ident arriving over the wire has not actually passed through
/// `FileIdent::new`'s validation the way a locally-scanned one has;
/// re-validate every inbound ident before it reaches the filesystem.
fn validate_ident(ident: &FileIdent) -> Result<(), SyncError> {
    dirshare_core::ident::validate_filename(ident.as_str()).map_err(|source| SyncError::InvalidIdent {
        ident: ident.as_str().to_string(),
        source,
    })
}
