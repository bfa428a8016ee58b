//! Cooperative cancellation predicate.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Polled predicate drivers consult at every work-item boundary and
/// primitives consult at every chunk.
///
/// The gate is usually backed by the liveness of the progress surface: once
/// the user dismisses it, the gate reports canceled. Nothing is pushed to the
/// driver; it has to ask.
#[derive(Clone)]
pub struct CancellationGate {
    predicate: Arc<dyn Fn() -> bool + Send + Sync>,
}

impl CancellationGate {
    /// Build a gate from an arbitrary predicate.
    pub fn from_fn(predicate: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        Self {
            predicate: Arc::new(predicate),
        }
    }

    /// A gate that never cancels.
    pub fn never() -> Self {
        Self::from_fn(|| false)
    }

    /// A gate that reads a shared flag.
    pub fn from_flag(flag: Arc<AtomicBool>) -> Self {
        Self::from_fn(move || flag.load(Ordering::Relaxed))
    }

    /// Check whether the operation should stop.
    pub fn is_canceled(&self) -> bool {
        (self.predicate)()
    }
}

impl Default for CancellationGate {
    fn default() -> Self {
        Self::never()
    }
}

impl fmt::Debug for CancellationGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationGate")
            .field("canceled", &self.is_canceled())
            .finish()
    }
}
