use std::sync::Arc;
use std::time::Duration;
use serde::Deserialize;
use tracing::warn;

use crate::analytics::{EventStore, ReportView};

/// One line of ingest input.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum IngestCommand {
    Request {
        #[serde(default)]
        client: Option<String>,
        #[serde(default)]
        question: String,
        #[serde(default)]
        session: Option<String>,
    },
    Error {
        #[serde(default)]
        client: Option<String>,
        #[serde(default)]
        message: String,
    },
    Report,
}

impl IngestCommand {
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

/// Async front of the event store.
///
/// Store calls may touch the disk, so each one runs on the blocking pool under a
/// hard timeout. A call that overruns is abandoned by the caller; it still
/// completes on its own thread and holds the store lock until then.
#[derive(Debug, Clone)]
pub struct Driver {
    store: Arc<EventStore>,
    io_timeout: Duration,
}

impl Driver {
    pub fn new(store: Arc<EventStore>, io_timeout: Duration) -> Self {
        Self { store, io_timeout }
    }

    /// Applies one command. Only `Report` yields a value, and only if it finished in time.
    pub async fn handle(&self, command: IngestCommand) -> Option<ReportView> {
        match command {
            IngestCommand::Request { client, question, session } => {
                self.run("record_request", move |store| {
                    store.record_request(client.as_deref(), &question, session.as_deref())
                })
                .await;
                None
            }
            IngestCommand::Error { client, message } => {
                self.run("record_error", move |store| {
                    store.record_error(&message, client.as_deref())
                })
                .await;
                None
            }
            IngestCommand::Report => self.report().await,
        }
    }

    pub async fn report(&self) -> Option<ReportView> {
        self.run("report", |store| store.report()).await
    }

    async fn run<T, F>(&self, op: &'static str, f: F) -> Option<T>
    where
        T: Send + 'static,
        F: FnOnce(&EventStore) -> T + Send + 'static,
    {
        let store = self.store.clone();
        let task = tokio::task::spawn_blocking(move || f(&store));

        match tokio::time::timeout(self.io_timeout, task).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                warn!(op, error = %e, "analytics task failed");
                None
            }
            Err(_) => {
                warn!(
                    op,
                    timeout_ms = self.io_timeout.as_millis() as u64,
                    "analytics call timed out"
                );
                None
            }
        }
    }
}
