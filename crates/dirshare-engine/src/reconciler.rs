//! Snapshot reconciler — late-joiner catch-up.
//!
//! At startup the engine publishes a [`DirectorySnapshot`] of everything it
//! currently holds, then republishes every file's content so a late-joining
//! peer converges without an explicit pull protocol. This module is the
//! inbound half: what to do with a snapshot received from a peer.
//!
//! The reconciler is intentionally passive in this push model — it never
//! issues a pull request. It is kept as a named component because a
//! request/response variant is a natural next step once the transport
//! exposes one, not because it currently does more than log.

use tracing::{debug, info};

use dirshare_core::types::DirectorySnapshot;

use crate::fs_adapter::FilesystemAdapter;

/// Reacts to inbound [`DirectorySnapshot`]s from remote participants.
pub struct SnapshotReconciler {
    fs: FilesystemAdapter,
    own_participant_id: String,
}

impl SnapshotReconciler {
    pub fn new(fs: FilesystemAdapter, own_participant_id: String) -> Self {
        Self {
            fs,
            own_participant_id,
        }
    }

    /// Handle one inbound snapshot. Own-origin snapshots (an echo of our
    /// own startup publication, or a loopback bus that doesn't filter by
    /// writer) are ignored outright.
    pub fn handle_snapshot(&self, snapshot: DirectorySnapshot) {
        if snapshot.participant_id == self.own_participant_id {
            return;
        }

        debug!(
            "reconciling snapshot from {} ({} files)",
            snapshot.participant_id,
            snapshot.file_count()
        );

        for remote_file in &snapshot.files {
            if !self.fs.exists_regular(&remote_file.ident) {
                info!(
                    "{}: present on {} but not locally; awaiting catch-up push",
                    remote_file.ident, snapshot.participant_id
                );
            }
        }
    }
}
