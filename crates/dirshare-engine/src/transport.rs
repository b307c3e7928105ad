//! The transport abstraction the engine depends on.
//!
//! The real pub/sub bus (topic creation, QoS plumbing, discovery) is an
//! external collaborator — out of scope for this crate. What the engine
//! needs from it is exactly the four typed channels and delivery
//! guarantees listed below; [`Transport`] is that contract, and
//! [`LoopbackTransport`] is the one concrete, in-memory implementation
//! shipped here (useful for tests and as a local demo bus). A production
//! deployment supplies its own `Transport` impl backed by a real
//! DDS/MQTT/etc backend.
//!
//! | Channel   | Delivery profile (assumed, not enforced here)                                   |
//! |-----------|-----------------------------------------------------------------------------------|
//! | Events    | reliable; persistent-for-late-joiners; retains last 100; per-ident FIFO           |
//! | Content   | reliable; volatile; retains last 1/ident; per-ident FIFO; single writer/ident     |
//! | Chunks    | reliable; volatile; retains all; keyed by (ident, chunk_id); single writer/ident   |
//! | Snapshots | reliable; persistent-for-late-joiners; retains last 1 per participant_id          |

use async_trait::async_trait;
use tokio::sync::mpsc;

use dirshare_core::types::{DirectorySnapshot, FileChunk, FileContent, FileEvent};

/// Bounded channel depth for the loopback transport's per-subscriber
/// queues. Mirrors the "O(1000) outstanding samples per ident" guidance
/// for the Chunks channel in the design's external-interfaces section.
pub const CHANNEL_DEPTH: usize = 1024;

/// Outbound half of the transport contract: one method per logical
/// channel.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_event(&self, event: FileEvent) -> Result<(), TransportError>;
    async fn send_content(&self, content: FileContent) -> Result<(), TransportError>;
    async fn send_chunk(&self, chunk: FileChunk) -> Result<(), TransportError>;
    async fn send_snapshot(&self, snapshot: DirectorySnapshot) -> Result<(), TransportError>;
}

/// A transport send failed. The engine's policy is to log and abandon the
/// remaining payload for that file, relying on the next scan tick to
/// republish — never retry inside the publisher itself.
#[derive(Debug, Clone, thiserror::Error)]
#[error("transport send failed: {0}")]
pub struct TransportError(pub String);

/// Inbound halves of the four channels, handed to `EngineLoop` so it can
/// spawn one task per channel.
pub struct InboundChannels {
    pub events: mpsc::Receiver<FileEvent>,
    pub content: mpsc::Receiver<FileContent>,
    pub chunks: mpsc::Receiver<FileChunk>,
    pub snapshots: mpsc::Receiver<DirectorySnapshot>,
}

/// In-memory, multi-participant pub/sub bus.
///
/// Every [`LoopbackTransport::participant`] handle shares the same set of
/// broadcast queues; a message sent by one participant is delivered to
/// every *other* participant's inbound channels (a publisher does not
/// receive its own publications back, matching how a real bus's
/// subscriber-side loopback suppression would behave for a single
/// writer).
#[derive(Clone)]
pub struct LoopbackTransport {
    peers: std::sync::Arc<parking_lot::Mutex<Vec<PeerSenders>>>,
}

struct PeerSenders {
    events: mpsc::Sender<FileEvent>,
    content: mpsc::Sender<FileContent>,
    chunks: mpsc::Sender<FileChunk>,
    snapshots: mpsc::Sender<DirectorySnapshot>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self {
            peers: std::sync::Arc::new(parking_lot::Mutex::new(Vec::new())),
        }
    }

    /// Register a new participant on the bus and return its outbound
    /// handle (a [`Transport`] impl) plus its inbound channels.
    pub fn participant(&self) -> (LoopbackParticipant, InboundChannels) {
        let (ev_tx, ev_rx) = mpsc::channel(CHANNEL_DEPTH);
        let (ct_tx, ct_rx) = mpsc::channel(CHANNEL_DEPTH);
        let (ch_tx, ch_rx) = mpsc::channel(CHANNEL_DEPTH);
        let (sn_tx, sn_rx) = mpsc::channel(CHANNEL_DEPTH);

        let id = {
            let mut peers = self.peers.lock();
            peers.push(PeerSenders {
                events: ev_tx,
                content: ct_tx,
                chunks: ch_tx,
                snapshots: sn_tx,
            });
            peers.len() - 1
        };

        (
            LoopbackParticipant {
                bus: self.clone(),
                self_index: id,
            },
            InboundChannels {
                events: ev_rx,
                content: ct_rx,
                chunks: ch_rx,
                snapshots: sn_rx,
            },
        )
    }
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// A single participant's outbound handle on a [`LoopbackTransport`] bus.
#[derive(Clone)]
pub struct LoopbackParticipant {
    bus: LoopbackTransport,
    self_index: usize,
}

#[async_trait]
impl Transport for LoopbackParticipant {
    async fn send_event(&self, event: FileEvent) -> Result<(), TransportError> {
        let peers = self.bus.peers.lock();
        for (i, peer) in peers.iter().enumerate() {
            if i == self.self_index {
                continue;
            }
            let _ = peer.events.try_send(event.clone());
        }
        Ok(())
    }

    async fn send_content(&self, content: FileContent) -> Result<(), TransportError> {
        let peers = self.bus.peers.lock();
        for (i, peer) in peers.iter().enumerate() {
            if i == self.self_index {
                continue;
            }
            let _ = peer.content.try_send(content.clone());
        }
        Ok(())
    }

    async fn send_chunk(&self, chunk: FileChunk) -> Result<(), TransportError> {
        let peers = self.bus.peers.lock();
        for (i, peer) in peers.iter().enumerate() {
            if i == self.self_index {
                continue;
            }
            let _ = peer.chunks.try_send(chunk.clone());
        }
        Ok(())
    }

    async fn send_snapshot(&self, snapshot: DirectorySnapshot) -> Result<(), TransportError> {
        let peers = self.bus.peers.lock();
        for (i, peer) in peers.iter().enumerate() {
            if i == self.self_index {
                continue;
            }
            let _ = peer.snapshots.try_send(snapshot.clone());
        }
        Ok(())
    }
}
