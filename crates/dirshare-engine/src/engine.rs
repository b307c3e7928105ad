//! EngineLoop — owns every component instance for one participant and
//! drives its lifecycle end to end.
//!
//! Bridges the synchronous scanner thread into the async world: a bounded
//! `crossbeam-channel` carries scan diffs out of the blocking thread, and
//! a `spawn_blocking` task drains it, calling back into async publisher
//! code via the current `Handle`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use dirshare_core::types::{DirectorySnapshot, FileOp, Timestamp};

use crate::applier::InboundApplier;
use crate::fs_adapter::FilesystemAdapter;
use crate::publisher::OutboundPublisher;
use crate::reconciler::SnapshotReconciler;
use crate::scanner::{self, DirectoryScanner, ScanDiff};
use crate::suppression::SuppressionSet;
use crate::transport::{InboundChannels, Transport};

/// One running participant: scanner thread, four inbound dispatch tasks,
/// and the publisher/applier/reconciler components that connect them.
pub struct EngineLoop {
    fs: FilesystemAdapter,
    transport: Arc<dyn Transport>,
    inbound: Option<InboundChannels>,
    suppression: SuppressionSet,
    scan_interval: Duration,
    participant_id: String,
}

impl EngineLoop {
    pub fn new(
        root: impl Into<PathBuf>,
        transport: Arc<dyn Transport>,
        inbound: InboundChannels,
        scan_interval: Duration,
    ) -> Self {
        Self {
            fs: FilesystemAdapter::new(root),
            transport,
            inbound: Some(inbound),
            suppression: SuppressionSet::new(),
            scan_interval,
            participant_id: generate_participant_id(),
        }
    }

    pub fn participant_id(&self) -> &str {
        &self.participant_id
    }

    /// Run until a shutdown signal arrives. Startup publishes a full
    /// snapshot and republishes every local file so late joiners
    /// converge; then the scanner, publisher, and the four inbound
    /// dispatch tasks run concurrently until `ctrl_c` (or a caller-driven
    /// cancellation via [`EngineLoop::run_until`]) fires.
    pub async fn run(self) {
        self.run_until(tokio::signal::ctrl_c()).await;
    }

    /// Same as [`EngineLoop::run`], but shuts down as soon as `until`
    /// resolves instead of waiting specifically for `ctrl_c`. Used by
    /// tests and by any embedder that wants programmatic shutdown.
    pub async fn run_until(mut self, until: impl std::future::Future<Output = std::io::Result<()>>) {
        let publisher = Arc::new(OutboundPublisher::new(self.fs.clone(), self.transport.clone()));
        let applier = Arc::new(InboundApplier::new(self.fs.clone(), self.suppression.clone()));
        let reconciler = Arc::new(SnapshotReconciler::new(self.fs.clone(), self.participant_id.clone()));

        self.publish_startup_snapshot(&publisher).await;

        let (scan_tx, scan_rx) = crossbeam_channel::unbounded();
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
        let scanner = DirectoryScanner::new(self.fs.clone(), self.suppression.clone());
        let scanner_handle = scanner::spawn(scanner, self.scan_interval, scan_tx, shutdown_rx);

        let publisher_for_scan = publisher.clone();
        let scan_bridge = tokio::task::spawn_blocking(move || {
            let handle = tokio::runtime::Handle::current();
            while let Ok(diff) = scan_rx.recv() {
                handle.block_on(dispatch_scan_diff(&publisher_for_scan, diff));
            }
        });

        let InboundChannels {
            mut events,
            mut content,
            mut chunks,
            mut snapshots,
        } = self.inbound.take().expect("inbound channels consumed exactly once");

        let applier_for_events = applier.clone();
        let events_task = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                applier_for_events.handle_event(event);
            }
        });

        let applier_for_content = applier.clone();
        let content_task = tokio::spawn(async move {
            while let Some(content) = content.recv().await {
                applier_for_content.handle_content(content);
            }
        });

        let applier_for_chunks = applier.clone();
        let chunks_task = tokio::spawn(async move {
            while let Some(chunk) = chunks.recv().await {
                applier_for_chunks.handle_chunk(chunk);
            }
        });

        let reconciler_for_snapshots = reconciler;
        let snapshots_task = tokio::spawn(async move {
            while let Some(snapshot) = snapshots.recv().await {
                reconciler_for_snapshots.handle_snapshot(snapshot);
            }
        });

        if until.await.is_err() {
            warn!("shutdown signal source errored; shutting down anyway");
        }
        info!("{}: shutdown requested, draining in-flight work", self.participant_id);

        let _ = shutdown_tx.send(());
        let _ = tokio::task::spawn_blocking(move || scanner_handle.join()).await;
        let _ = scan_bridge.await;

        events_task.abort();
        content_task.abort();
        chunks_task.abort();
        snapshots_task.abort();
    }

    async fn publish_startup_snapshot(&self, publisher: &OutboundPublisher) {
        let idents = match self.fs.list_regular_files() {
            Ok(idents) => idents,
            Err(e) => {
                warn!("startup: failed to list shared directory: {}", e);
                return;
            }
        };

        let mut files = Vec::with_capacity(idents.len());
        for ident in &idents {
            let size = self.fs.get_size(ident).unwrap_or(0);
            let mtime = self.fs.get_mtime(ident).unwrap_or(Timestamp::ZERO);
            let crc32 = self
                .fs
                .read_all(ident)
                .map(|bytes| dirshare_core::integrity::crc32(&bytes))
                .unwrap_or(0);
            files.push(dirshare_core::types::FileMetadata {
                ident: ident.clone(),
                size,
                mtime,
                crc32,
            });
        }

        let snapshot = DirectorySnapshot {
            participant_id: self.participant_id.clone(),
            files: files.clone(),
            snapshot_time: Timestamp::now(),
        };

        debug!(
            "{}: publishing startup snapshot ({} files)",
            self.participant_id,
            snapshot.file_count()
        );

        if let Err(e) = self.transport.send_snapshot(snapshot).await {
            warn!("{}: failed to publish startup snapshot: {}", self.participant_id, e);
        }

        for metadata in files {
            publisher.publish_payload(metadata).await;
        }
    }
}

async fn dispatch_scan_diff(publisher: &OutboundPublisher, diff: ScanDiff) {
    for metadata in diff.created {
        publisher.publish_upsert(FileOp::Create, metadata).await;
    }
    for metadata in diff.modified {
        publisher.publish_upsert(FileOp::Modify, metadata).await;
    }
    for ident in diff.deleted {
        publisher.publish_delete(ident).await;
    }
}

/// A short random identifier, unique enough to distinguish participants
/// on the same bus across a session; not a stable long-term identity.
fn generate_participant_id() -> String {
    let mut buf = [0u8; 8];
    if getrandom::getrandom(&mut buf).is_err() {
        // getrandom failing means the host entropy source is broken; fall
        // back to a fixed id rather than panicking the engine at startup.
        return "participant-unknown".to_string();
    }
    format!("participant-{}", hex_encode(&buf))
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{:02x}", b);
    }
    out
}
