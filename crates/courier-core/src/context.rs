//! The hooks threaded through every low-level primitive call.

use crate::cancel::CancellationGate;
use crate::progress::ProgressSink;

/// How a primitive finished when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// All requested work was done.
    Done,
    /// The primitive observed cancellation and stopped early.
    Stopped,
}

impl Flow {
    pub fn is_stopped(self) -> bool {
        matches!(self, Self::Stopped)
    }
}

/// Progress and cancellation hooks for one operation.
///
/// A driver builds this once and hands the same context to every primitive
/// it calls, so heterogeneous primitives all feed one accumulator.
#[derive(Clone, Copy)]
pub struct TransferContext<'a> {
    sink: &'a ProgressSink,
    gate: &'a CancellationGate,
    report: Option<&'a (dyn Fn(u64, u64) + Sync)>,
}

impl<'a> TransferContext<'a> {
    pub fn new(sink: &'a ProgressSink, gate: &'a CancellationGate) -> Self {
        Self {
            sink,
            gate,
            report: None,
        }
    }

    /// Attach an observer called with `(completed, total)` after each advance.
    pub fn with_report(mut self, report: &'a (dyn Fn(u64, u64) + Sync)) -> Self {
        self.report = Some(report);
        self
    }

    /// Record `delta` completed units.
    pub fn advance(&self, delta: u64) {
        self.sink.advance(delta);
        if let Some(report) = self.report {
            report(self.sink.completed(), self.sink.total());
        }
    }

    pub fn is_canceled(&self) -> bool {
        self.gate.is_canceled()
    }

    pub fn total(&self) -> u64 {
        self.sink.total()
    }
}

impl std::fmt::Debug for TransferContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferContext")
            .field("progress", &self.sink.snapshot())
            .field("gate", self.gate)
            .finish()
    }
}
