//! Async front end that runs engine operations on blocking workers.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

use courier_core::{CancellationGate, Notice, OperationError, ProgressSurface, WorkList};

use crate::OPERATION_CHANNEL_SIZE;
use crate::copy::CopyRequest;
use crate::engine::{Engine, OperationResult};
use crate::primitives::HashAlgorithm;

/// Everything an operation reports while it runs.
#[derive(Debug, Clone)]
pub enum OperationEvent {
    Percentage(u8),
    Throughput(String),
    CurrentFile(String),
    Info(Notice),
    Error(i32),
    /// The surface was closed; the terminal result follows.
    Closed,
    /// Always the last event of an operation.
    Finished(OperationResult),
}

/// Handle to a launched operation.
#[derive(Debug)]
pub struct OperationHandle {
    pub events: mpsc::Receiver<OperationEvent>,
    pub cancel: CancellationToken,
}

impl OperationHandle {
    /// Ask the operation to stop at its next cancellation check.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Drain events until the terminal result arrives.
    pub async fn wait(mut self) -> OperationResult {
        while let Some(event) = self.events.recv().await {
            if let OperationEvent::Finished(result) = event {
                return result;
            }
        }
        OperationResult::Failed(OperationError::Worker {
            message: "operation ended without a result".to_string(),
        })
    }
}

/// [`ProgressSurface`] that forwards everything into an operation's channel.
///
/// Intermediate progress updates are dropped when the receiver lags; the
/// first and last percentages and terminal messages wait for room.
struct ChannelSurface {
    tx: mpsc::Sender<OperationEvent>,
    token: CancellationToken,
}

impl ChannelSurface {
    fn post(&self, event: OperationEvent) {
        let _ = self.tx.try_send(event);
    }

    fn deliver(&self, event: OperationEvent) {
        let _ = self.tx.blocking_send(event);
    }
}

impl ProgressSurface for ChannelSurface {
    fn set_percentage(&self, percent: u8) {
        // The first and last percentages always reach the receiver.
        if percent == 0 || percent >= 100 {
            self.deliver(OperationEvent::Percentage(percent));
        } else {
            self.post(OperationEvent::Percentage(percent));
        }
    }

    fn set_throughput_label(&self, label: &str) {
        self.post(OperationEvent::Throughput(label.to_string()));
    }

    fn set_current_file(&self, name: &str) {
        self.post(OperationEvent::CurrentFile(name.to_string()));
    }

    fn close(&self) {
        self.deliver(OperationEvent::Closed);
    }

    fn report_error(&self, code: i32) {
        self.deliver(OperationEvent::Error(code));
    }

    fn report_info(&self, notice: &Notice) {
        self.deliver(OperationEvent::Info(notice.clone()));
    }

    fn is_alive(&self) -> bool {
        !self.token.is_cancelled() && !self.tx.is_closed()
    }
}

/// Launches engine operations one at a time.
///
/// Each `start_*` call returns immediately; the operation waits for any
/// earlier one to finish, then runs on tokio's blocking pool. Must be called
/// from within a tokio runtime.
#[derive(Debug, Clone)]
pub struct OperationExecutor {
    engine: Arc<Engine>,
    turn: Arc<Mutex<()>>,
}

impl OperationExecutor {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine: Arc::new(engine),
            turn: Arc::new(Mutex::new(())),
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn start_delete(&self, list: WorkList) -> OperationHandle {
        self.launch(move |engine, surface, gate| engine.delete(&list, surface, gate))
    }

    pub fn start_copy(&self, request: CopyRequest) -> OperationHandle {
        self.launch(move |engine, surface, gate| engine.copy(&request, surface, gate))
    }

    pub fn start_export(&self, list: WorkList) -> OperationHandle {
        self.launch(move |engine, surface, gate| engine.export(&list, surface, gate))
    }

    pub fn start_hash(&self, path: PathBuf, algorithm: HashAlgorithm) -> OperationHandle {
        self.launch(move |engine, surface, gate| engine.hash(&path, algorithm, surface, gate))
    }

    pub fn start_download(&self, url: String, destination: PathBuf) -> OperationHandle {
        self.launch(move |engine, surface, gate| engine.download(&url, &destination, surface, gate))
    }

    fn launch<F>(&self, job: F) -> OperationHandle
    where
        F: FnOnce(&Engine, &dyn ProgressSurface, &CancellationGate) -> OperationResult + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(OPERATION_CHANNEL_SIZE);
        let token = CancellationToken::new();

        let engine = Arc::clone(&self.engine);
        let turn = Arc::clone(&self.turn);
        let task_token = token.clone();

        tokio::spawn(async move {
            let _turn = turn.lock_owned().await;

            let surface = ChannelSurface {
                tx: tx.clone(),
                token: task_token.clone(),
            };
            let gate = {
                let token = task_token;
                let tx = tx.clone();
                CancellationGate::from_fn(move || token.is_cancelled() || tx.is_closed())
            };

            let result = tokio::task::spawn_blocking(move || job(&engine, &surface, &gate))
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!("operation worker failed: {e}");
                    OperationResult::Failed(OperationError::Worker {
                        message: e.to_string(),
                    })
                });

            let _ = tx.send(OperationEvent::Finished(result)).await;
        });

        OperationHandle { events: rx, cancel: token }
    }
}
