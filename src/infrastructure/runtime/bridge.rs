//! Runtime bridge - connects sync TUI thread with async Tokio runtime
//!
//! The TUI never awaits. It sends [`RuntimeCommand`]s to a worker thread that
//! owns its own Tokio runtime and polls [`RuntimeEvent`]s back every frame.
//! Long-running requests carry a generation number so the UI can drop
//! results that a newer request has superseded.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use tokio::runtime::Runtime;
use tracing::error;

use crate::config::Config;
use crate::domain::Transaction;
use crate::infrastructure::explorer::FetchOutcome;
use crate::infrastructure::runtime::worker::run_async_worker;
use crate::modules::annotate::{SuggestOptions, SuggestionRun};

/// Commands sent from the TUI to the async worker
#[derive(Debug, Clone)]
pub enum RuntimeCommand {
    /// Fetch the address's history
    Refresh { address: String, generation: u64 },
    /// Request suggestions for the given list
    Analyze {
        transactions: Vec<Transaction>,
        generation: u64,
    },
    /// Check the explorer with a balance query
    CheckExplorer { address: String },
    /// Shutdown the worker
    Shutdown,
}

/// Events sent from the async worker to the TUI
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    Fetched {
        address: String,
        generation: u64,
        outcome: FetchOutcome,
    },
    SuggestionsReady {
        generation: u64,
        run: SuggestionRun,
    },
    ExplorerStatus {
        reachable: bool,
        detail: String,
    },
    /// Error occurred
    Error { message: String },
}

/// Everything the worker needs to build its clients
#[derive(Clone)]
pub struct WorkerSettings {
    pub explorer_url: String,
    pub explorer_key: Option<String>,
    pub completion_url: String,
    pub completion_key: Option<String>,
    pub model: String,
    pub suggest: SuggestOptions,
}

impl From<&Config> for WorkerSettings {
    fn from(config: &Config) -> Self {
        Self {
            explorer_url: config.explorer.base_url.clone(),
            explorer_key: config.explorer_key(),
            completion_url: config.completion.base_url.clone(),
            completion_key: config.completion_key(),
            model: config.completion.model.clone(),
            suggest: SuggestOptions::from(&config.completion),
        }
    }
}

/// Bridge between sync TUI thread and async Tokio runtime
pub struct RuntimeBridge {
    cmd_tx: Sender<RuntimeCommand>,
    evt_rx: Receiver<RuntimeEvent>,
}

impl RuntimeBridge {
    pub fn new(settings: WorkerSettings) -> anyhow::Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<RuntimeCommand>();
        let (evt_tx, evt_rx) = mpsc::channel::<RuntimeEvent>();

        thread::Builder::new()
            .name("txmark-worker".into())
            .spawn(move || {
                let rt = match Runtime::new() {
                    Ok(rt) => rt,
                    Err(err) => {
                        error!("failed to create Tokio runtime: {err}");
                        let _ = evt_tx.send(RuntimeEvent::Error {
                            message: format!("Failed to start worker: {err}"),
                        });
                        return;
                    }
                };
                rt.block_on(async {
                    if let Err(err) = run_async_worker(settings, cmd_rx, evt_tx.clone()).await {
                        let _ = evt_tx.send(RuntimeEvent::Error {
                            message: format!("Worker exited: {:#}", err),
                        });
                    }
                });
            })?;

        Ok(Self { cmd_tx, evt_rx })
    }

    /// Send a command to the async worker
    pub fn send(&self, cmd: RuntimeCommand) -> anyhow::Result<()> {
        self.cmd_tx
            .send(cmd)
            .map_err(|_| anyhow::anyhow!("Worker channel closed"))
    }

    /// Poll for events (non-blocking)
    pub fn poll_events(&self) -> Vec<RuntimeEvent> {
        let mut events = Vec::new();
        while let Ok(evt) = self.evt_rx.try_recv() {
            events.push(evt);
        }
        events
    }
}

impl Drop for RuntimeBridge {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(RuntimeCommand::Shutdown);
    }
}
