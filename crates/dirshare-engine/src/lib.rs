//! DirShare Engine — the per-participant synchronisation engine.
//!
//! This crate contains no transport and no CLI: it consumes an abstract
//! [`transport::Transport`] handle and a filesystem root, and drives the
//! detect → publish → apply → reconcile pipeline described by the
//! components below.
//!
//! # Architecture
//!
//! The scanner runs on a dedicated blocking OS thread (it polls the
//! filesystem and sleeps between ticks) while everything else — transport
//! I/O, chunk reassembly, the applier's write pipeline — runs on the
//! tokio runtime. The two worlds meet over a bounded `crossbeam-channel`:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Scanner Thread (sync)                      │
//! │  polls the shared directory, diffs against previous state   │
//! └─────────────────────────────┬───────────────────────────────┘
//!                               │ crossbeam-channel
//!                               │ (ScanDiff, unbounded but low-rate)
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Tokio Runtime (async)                      │
//! │  - OutboundPublisher: diff -> FileEvent/Content/Chunk sends  │
//! │  - InboundApplier: Events/Content/Chunks -> local writes     │
//! │  - SnapshotReconciler: late-joiner visibility                │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod applier;
pub mod engine;
pub mod fs_adapter;
pub mod publisher;
pub mod reassembler;
pub mod reconciler;
pub mod scanner;
pub mod suppression;
pub mod transport;

pub use applier::InboundApplier;
pub use engine::EngineLoop;
pub use fs_adapter::FilesystemAdapter;
pub use publisher::OutboundPublisher;
pub use reassembler::{ChunkReassembler, Complete};
pub use reconciler::SnapshotReconciler;
pub use scanner::{DirectoryScanner, ScanDiff};
pub use suppression::{SuppressionGuard, SuppressionSet};
pub use transport::{InboundChannels, LoopbackParticipant, LoopbackTransport, Transport, TransportError};
