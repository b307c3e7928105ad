//! Outbound publisher — turns a locally detected change into the message
//! sequence the design's component table prescribes.
//!
//! | Local op                              | Sequence emitted                                  |
//! |----------------------------------------|---------------------------------------------------|
//! | Create/Modify, size < CHUNK_THRESHOLD   | `FileEvent` then `FileContent`                     |
//! | Create/Modify, size >= CHUNK_THRESHOLD  | `FileEvent` then `FileChunk` x total_chunks         |
//! | Delete                                  | `FileEvent` only                                   |
//!
//! The file is read and checksummed exactly once — never re-read after
//! the CRC is computed — so `file_crc32` is guaranteed to match the sum
//! of what was actually sent, keeping a manifest's hash consistent with
//! the chunks it describes even under concurrent local modification.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, warn};

use dirshare_core::ident::FileIdent;
use dirshare_core::types::{FileChunk, FileContent, FileEvent, FileMetadata, FileOp, Timestamp};
use dirshare_core::{CHUNK_SIZE, CHUNK_THRESHOLD};

use crate::fs_adapter::FilesystemAdapter;
use crate::transport::Transport;

/// Publishes the outbound side of a locally detected filesystem change.
pub struct OutboundPublisher {
    fs: FilesystemAdapter,
    transport: Arc<dyn Transport>,
    chunk_size: u64,
    chunk_threshold: u64,
    chunk_pacing: Duration,
}

impl OutboundPublisher {
    pub fn new(fs: FilesystemAdapter, transport: Arc<dyn Transport>) -> Self {
        Self {
            fs,
            transport,
            chunk_size: CHUNK_SIZE,
            chunk_threshold: CHUNK_THRESHOLD,
            chunk_pacing: Duration::from_millis(10),
        }
    }

    pub fn with_chunking(mut self, chunk_size: u64, chunk_threshold: u64) -> Self {
        self.chunk_size = chunk_size;
        self.chunk_threshold = chunk_threshold;
        self
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.chunk_pacing = pacing;
        self
    }

    /// Publish a `Create` or `Modify` for `metadata`, reading the file's
    /// bytes once and sending either a single `FileContent` or a sequence
    /// of `FileChunk`s depending on size.
    ///
    /// A transport write failure on any single message is logged and the
    /// remaining payload for this file is abandoned — there is no retry
    /// loop here; the next successful scan that re-detects the file will
    /// republish it.
    pub async fn publish_upsert(&self, op: FileOp, metadata: FileMetadata) {
        debug_assert!(matches!(op, FileOp::Create | FileOp::Modify));

        let event = FileEvent {
            ident: metadata.ident.clone(),
            op,
            event_time: Timestamp::now(),
            metadata: Some(metadata.clone()),
        };

        if let Err(e) = self.transport.send_event(event).await {
            error!("failed to publish event for {}: {}", metadata.ident, e);
            return;
        }

        let bytes = match self.fs.read_all(&metadata.ident) {
            Ok(b) => b,
            Err(e) => {
                warn!("file {} vanished before publish could read it: {}", metadata.ident, e);
                return;
            }
        };

        if (bytes.len() as u64) < self.chunk_threshold {
            self.publish_content(metadata, bytes).await;
        } else {
            self.publish_chunks(metadata, bytes).await;
        }
    }

    /// Publish just the payload (`FileContent` or `FileChunk` sequence)
    /// for `metadata`, with no accompanying `FileEvent`. Used for startup
    /// catch-up republishing: the design's startup sequence is "publish
    /// DirectorySnapshot, then republish all files' content" — no event,
    /// since the file isn't a newly detected change.
    pub async fn publish_payload(&self, metadata: FileMetadata) {
        let bytes = match self.fs.read_all(&metadata.ident) {
            Ok(b) => b,
            Err(e) => {
                warn!("file {} vanished before startup republish could read it: {}", metadata.ident, e);
                return;
            }
        };

        if (bytes.len() as u64) < self.chunk_threshold {
            self.publish_content(metadata, bytes).await;
        } else {
            self.publish_chunks(metadata, bytes).await;
        }
    }

    /// Publish a `Delete`. Only the event is sent; there is no payload.
    pub async fn publish_delete(&self, ident: FileIdent) {
        let event = FileEvent {
            ident: ident.clone(),
            op: FileOp::Delete,
            event_time: Timestamp::now(),
            metadata: None,
        };

        if let Err(e) = self.transport.send_event(event).await {
            error!("failed to publish delete for {}: {}", ident, e);
        }
    }

    async fn publish_content(&self, metadata: FileMetadata, bytes: Vec<u8>) {
        let content = FileContent {
            ident: metadata.ident.clone(),
            bytes,
            size: metadata.size,
            crc32: metadata.crc32,
            mtime: metadata.mtime,
        };

        if let Err(e) = self.transport.send_content(content).await {
            error!("failed to publish content for {}: {}", metadata.ident, e);
        }
    }

    async fn publish_chunks(&self, metadata: FileMetadata, bytes: Vec<u8>) {
        let chunk_size = self.chunk_size as usize;
        let total_chunks = bytes.len().div_ceil(chunk_size) as u32;

        for (chunk_id, slice) in bytes.chunks(chunk_size).enumerate() {
            let chunk = FileChunk {
                ident: metadata.ident.clone(),
                chunk_id: chunk_id as u32,
                total_chunks,
                bytes: slice.to_vec(),
                chunk_crc32: dirshare_core::integrity::crc32(slice),
                file_size: metadata.size,
                file_crc32: metadata.crc32,
                mtime: metadata.mtime,
            };

            if let Err(e) = self.transport.send_chunk(chunk).await {
                error!(
                    "failed to publish chunk {} of {} for {}: {}",
                    chunk_id, total_chunks, metadata.ident, e
                );
                return; // abandon remaining chunks; next scan republishes
            }

            if chunk_id + 1 < total_chunks as usize {
                tokio::time::sleep(self.chunk_pacing).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::LoopbackTransport;
    use std::fs;
    use tempfile::tempdir;

    fn metadata_for(dir: &std::path::Path, name: &str, bytes: &[u8]) -> FileMetadata {
        fs::write(dir.join(name), bytes).unwrap();
        FileMetadata {
            ident: FileIdent::new(name).unwrap(),
            size: bytes.len() as u64,
            mtime: Timestamp::now(),
            crc32: dirshare_core::integrity::crc32(bytes),
        }
    }

    #[tokio::test]
    async fn small_file_emits_event_then_content() {
        let dir = tempdir().unwrap();
        let bus = LoopbackTransport::new();
        let (tx_a, _inbound_a) = bus.participant();
        let (_tx_b, mut inbound_b) = bus.participant();

        let fs_adapter = FilesystemAdapter::new(dir.path());
        let publisher = OutboundPublisher::new(fs_adapter, Arc::new(tx_a));

        let metadata = metadata_for(dir.path(), "hello.txt", b"Hello\n");
        publisher.publish_upsert(FileOp::Create, metadata.clone()).await;

        let event = inbound_b.events.recv().await.unwrap();
        assert_eq!(event.ident, metadata.ident);
        assert!(matches!(event.op, FileOp::Create));

        let content = inbound_b.content.recv().await.unwrap();
        assert_eq!(content.bytes, b"Hello\n");
        assert_eq!(content.crc32, metadata.crc32);
    }

    #[tokio::test]
    async fn large_file_emits_event_then_chunk_sequence() {
        let dir = tempdir().unwrap();
        let bus = LoopbackTransport::new();
        let (tx_a, _inbound_a) = bus.participant();
        let (_tx_b, mut inbound_b) = bus.participant();

        let fs_adapter = FilesystemAdapter::new(dir.path());
        let publisher = OutboundPublisher::new(fs_adapter, Arc::new(tx_a))
            .with_chunking(4, 8) // tiny sizes so the test stays fast
            .with_pacing(Duration::from_millis(0));

        let payload = vec![7u8; 12]; // 3 chunks of 4 bytes
        let metadata = metadata_for(dir.path(), "blob.bin", &payload);
        publisher.publish_upsert(FileOp::Create, metadata.clone()).await;

        inbound_b.events.recv().await.unwrap();

        let mut received = Vec::new();
        for _ in 0..3 {
            received.push(inbound_b.chunks.recv().await.unwrap());
        }

        assert!(received.iter().all(|c| c.total_chunks == 3));
        assert!(received.iter().all(|c| c.file_crc32 == metadata.crc32));
        let reassembled: Vec<u8> = {
            let mut sorted = received.clone();
            sorted.sort_by_key(|c| c.chunk_id);
            sorted.into_iter().flat_map(|c| c.bytes).collect()
        };
        assert_eq!(reassembled, payload);
    }

    #[tokio::test]
    async fn delete_emits_only_an_event() {
        let dir = tempdir().unwrap();
        let bus = LoopbackTransport::new();
        let (tx_a, _inbound_a) = bus.participant();
        let (_tx_b, mut inbound_b) = bus.participant();

        let fs_adapter = FilesystemAdapter::new(dir.path());
        let publisher = OutboundPublisher::new(fs_adapter, Arc::new(tx_a));

        publisher.publish_delete(FileIdent::new("gone.txt").unwrap()).await;

        let event = inbound_b.events.recv().await.unwrap();
        assert!(matches!(event.op, FileOp::Delete));
        assert!(inbound_b.content.try_recv().is_err());
        assert!(inbound_b.chunks.try_recv().is_err());
    }

    #[tokio::test]
    async fn payload_only_publish_emits_no_event() {
        let dir = tempdir().unwrap();
        let bus = LoopbackTransport::new();
        let (tx_a, _inbound_a) = bus.participant();
        let (_tx_b, mut inbound_b) = bus.participant();

        let fs_adapter = FilesystemAdapter::new(dir.path());
        let publisher = OutboundPublisher::new(fs_adapter, Arc::new(tx_a));

        let metadata = metadata_for(dir.path(), "startup.txt", b"catch-up");
        publisher.publish_payload(metadata.clone()).await;

        let content = inbound_b.content.recv().await.unwrap();
        assert_eq!(content.bytes, b"catch-up");
        assert!(inbound_b.events.try_recv().is_err(), "startup republish must not emit a FileEvent");
    }
}
