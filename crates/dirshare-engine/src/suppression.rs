//! Suppression set — the loop-prevention mechanism.
//!
//! Shared by the scanner (reader) and the applier (writer): while an
//! ident is suppressed, the scanner must never publish an event for it,
//! because its content is currently being written from a remote peer and
//! would otherwise echo straight back onto the bus.
//!
//! `resume` must run on every exit path of applier processing — success,
//! stale-timestamp rejection, integrity failure, disk-write failure.
//! [`SuppressionGuard`] implements that as a scoped drop guard: acquire, do
//! fallible work, release unconditionally unless explicitly dismissed —
//! the same return-to-pool-on-drop shape as a checked-out resource guard.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use dirshare_core::ident::FileIdent;

/// Thread-safe set of idents currently being written from a remote peer.
///
/// Implementation is a mutex-protected `HashSet`; no ordering guarantees
/// beyond individual-operation atomicity. `suppress`/`resume` are
/// idempotent: suppressing an already-suppressed ident, or resuming one
/// that isn't suppressed, is a no-op.
#[derive(Clone, Default)]
pub struct SuppressionSet {
    inner: Arc<Mutex<HashSet<FileIdent>>>,
}

impl SuppressionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn suppress(&self, ident: FileIdent) {
        let inserted = self.inner.lock().insert(ident.clone());
        if inserted {
            debug!("suppressing {}", ident);
        }
    }

    pub fn resume(&self, ident: &FileIdent) {
        let removed = self.inner.lock().remove(ident);
        if removed {
            debug!("resuming {}", ident);
        }
    }

    pub fn is_suppressed(&self, ident: &FileIdent) -> bool {
        self.inner.lock().contains(ident)
    }

    /// Arm suppression for `ident` and return a guard that calls
    /// [`SuppressionSet::resume`] on drop unless [`SuppressionGuard::dismiss`]
    /// is called first. Every applier code path that suppresses an ident
    /// should hold one of these for the duration of the write so a `?`
    /// early-return or a panic-free error path can't leak a permanently
    /// suppressed ident.
    pub fn guard(&self, ident: FileIdent) -> SuppressionGuard {
        self.suppress(ident.clone());
        SuppressionGuard {
            set: self.clone(),
            ident: Some(ident),
        }
    }
}

/// RAII guard returned by [`SuppressionSet::guard`].
pub struct SuppressionGuard {
    set: SuppressionSet,
    ident: Option<FileIdent>,
}

impl SuppressionGuard {
    /// Release the ident without calling `resume` on drop — used when the
    /// caller is about to call `resume` itself (after a successful write,
    /// so the ident stays suppressed for the fewest possible instructions)
    /// rather than leaving it to the guard's `Drop` impl.
    pub fn dismiss(mut self) {
        self.ident = None;
    }
}

impl Drop for SuppressionGuard {
    fn drop(&mut self) {
        if let Some(ident) = self.ident.take() {
            self.set.resume(&ident);
        }
    }
}
