//! Wire protocol: the messages carried on each of the four transport
//! channels described in the design's external-interfaces section.
//!
//! Messages are serialized with `bincode`; the transport is responsible
//! for framing (length-prefixing) and for routing each variant onto the
//! channel its doc comment names — the engine itself never inspects a
//! topic name, only the `DirShareMessage` variant it already received.

use serde::{Deserialize, Serialize};

use crate::types::{DirectorySnapshot, FileChunk, FileContent, FileEvent};

/// Every message the engine can send or receive, tagged by which of the
/// four logical channels (Events / Content / Chunks / Snapshots) carries
/// it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum DirShareMessage {
    /// `DirShare_FileEvents`: reliable, persistent-for-late-joiners,
    /// retains last 100, per-ident FIFO.
    Event(FileEvent),
    /// `DirShare_FileContent`: reliable, volatile, retains last 1 per
    /// ident, per-ident FIFO, single exclusive writer per ident.
    Content(FileContent),
    /// `DirShare_FileChunks`: reliable, volatile, retains all, keyed by
    /// (ident, chunk_id), single exclusive writer per ident.
    Chunk(FileChunk),
    /// `DirShare_DirectorySnapshot`: reliable, persistent-for-late-joiners,
    /// retains last 1 per participant_id.
    Snapshot(DirectorySnapshot),
}

/// Current protocol version, bumped whenever a `DirShareMessage` variant's
/// shape changes in a way that is not wire-compatible.
pub const PROTOCOL_VERSION: u32 = 1;
