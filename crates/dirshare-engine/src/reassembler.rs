//! Chunk reassembler — buffers inbound chunks per ident and produces a
//! complete, integrity-verified byte blob.
//!
//! Per the design notes, the `ChunkedFile` container (chunk_id ->
//! present-bit plus a byte buffer) is modelled here as a fixed-size bit
//! set plus a contiguous `Vec<u8>` sized at allocation time, rather than a
//! map of per-chunk buffers — the whole-file layout is known as soon as
//! the first chunk for an ident arrives.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::{debug, error, warn};

use dirshare_core::ident::FileIdent;
use dirshare_core::types::{FileChunk, Timestamp};
use dirshare_core::CHUNK_SIZE;

/// A fully reassembled file, ready for the same conflict-resolution and
/// write pipeline a whole-file `FileContent` goes through.
#[derive(Debug, Clone)]
pub struct Complete {
    pub ident: FileIdent,
    pub bytes: Vec<u8>,
    pub file_size: u64,
    pub file_crc32: u32,
    pub mtime: Timestamp,
}

/// Minimal fixed-size bit set over `[0, len)`.
struct BitSet {
    words: Vec<u64>,
    len: usize,
    set_count: usize,
}

impl BitSet {
    fn new(len: usize) -> Self {
        Self {
            words: vec![0u64; len.div_ceil(64)],
            len,
            set_count: 0,
        }
    }

    fn set(&mut self, index: usize) {
        let word = index / 64;
        let bit = index % 64;
        let mask = 1u64 << bit;
        if self.words[word] & mask == 0 {
            self.words[word] |= mask;
            self.set_count += 1;
        }
    }

    fn all_set(&self) -> bool {
        self.set_count == self.len
    }
}

struct ReassemblyEntry {
    total_chunks: u32,
    file_size: u64,
    file_crc32: u32,
    mtime: Timestamp,
    buffer: Vec<u8>,
    received: BitSet,
}

impl ReassemblyEntry {
    fn new(chunk: &FileChunk) -> Self {
        Self {
            total_chunks: chunk.total_chunks,
            file_size: chunk.file_size,
            file_crc32: chunk.file_crc32,
            mtime: chunk.mtime,
            buffer: vec![0u8; chunk.file_size as usize],
            received: BitSet::new(chunk.total_chunks as usize),
        }
    }

    fn matches_header(&self, chunk: &FileChunk) -> bool {
        self.total_chunks == chunk.total_chunks
            && self.file_size == chunk.file_size
            && self.file_crc32 == chunk.file_crc32
    }
}

/// Buffers inbound [`FileChunk`]s per ident; call [`ChunkReassembler::accept`]
/// for every chunk received on the Chunks channel.
#[derive(Default)]
pub struct ChunkReassembler {
    state: RwLock<HashMap<FileIdent, ReassemblyEntry>>,
}

impl ChunkReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one inbound chunk. Returns `Some(Complete)` once every chunk
    /// for that ident has arrived and the whole-file CRC verifies; `None`
    /// otherwise (including for a rejected chunk — rejection never
    /// invalidates an already-accepted partial buffer).
    pub fn accept(&self, chunk: FileChunk) -> Option<Complete> {
        if dirshare_core::integrity::crc32(&chunk.bytes) != chunk.chunk_crc32 {
            warn!(
                "dropping chunk {}/{} for {}: chunk checksum mismatch",
                chunk.chunk_id, chunk.total_chunks, chunk.ident
            );
            return None;
        }

        if chunk.chunk_id >= chunk.total_chunks {
            error!(
                "dropping chunk for {}: chunk_id {} out of range (total {})",
                chunk.ident, chunk.chunk_id, chunk.total_chunks
            );
            return None;
        }

        let offset = chunk.chunk_id as u64 * CHUNK_SIZE;
        if offset + chunk.bytes.len() as u64 > chunk.file_size {
            error!(
                "dropping chunk {} for {}: offset {} + len {} exceeds file_size {}",
                chunk.chunk_id,
                chunk.ident,
                offset,
                chunk.bytes.len(),
                chunk.file_size
            );
            return None;
        }

        let mut state = self.state.write();

        let needs_fresh_entry = match state.get(&chunk.ident) {
            None => true,
            Some(entry) => !entry.matches_header(&chunk),
        };

        if needs_fresh_entry {
            if state.contains_key(&chunk.ident) {
                debug!(
                    "restarting reassembly for {}: chunk metadata changed mid-transfer",
                    chunk.ident
                );
            }
            state.insert(chunk.ident.clone(), ReassemblyEntry::new(&chunk));
        }

        let entry = state.get_mut(&chunk.ident).expect("just inserted or already present");

        let offset = offset as usize;
        entry.buffer[offset..offset + chunk.bytes.len()].copy_from_slice(&chunk.bytes);
        entry.received.set(chunk.chunk_id as usize);

        if !entry.received.all_set() {
            return None;
        }

        let entry = state.remove(&chunk.ident).expect("entry present, just checked");

        let actual_crc = dirshare_core::integrity::crc32(&entry.buffer);
        if actual_crc != entry.file_crc32 {
            error!(
                "reassembly of {} failed: whole-file checksum mismatch (expected {:#x}, got {:#x})",
                chunk.ident, entry.file_crc32, actual_crc
            );
            return None;
        }

        Some(Complete {
            ident: chunk.ident,
            bytes: entry.buffer,
            file_size: entry.file_size,
            file_crc32: entry.file_crc32,
            mtime: entry.mtime,
        })
    }
}
