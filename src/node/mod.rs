//! Node API access.
//!
//! `SourceLoader` issues the three listing requests as independent tasks; each
//! reports back on the event channel when it finishes, in whatever order.

mod client;

pub use client::NodeClient;
pub(crate) use client::parse_base_url;

#[cfg(test)]
pub(crate) use client::tests as test_support;

use crate::model::{PresenterEvent, SourcePayload, SourceUpdate};
use std::future::Future;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

/// Handles for one generation of in-flight loads.
pub struct LoadSet {
    #[cfg_attr(not(feature = "tui"), allow(dead_code))]
    pub generation: u64,
    handles: Vec<JoinHandle<()>>,
}

impl LoadSet {
    #[cfg(feature = "tui")]
    pub fn is_finished(&self) -> bool {
        self.handles.iter().all(|h| h.is_finished())
    }

    /// Abort whatever is still in flight.
    #[cfg(feature = "tui")]
    pub fn abort(&self) {
        for h in &self.handles {
            h.abort();
        }
    }

    /// Wait for every load of this generation to report.
    pub async fn join(self) {
        for res in futures::future::join_all(self.handles).await {
            if let Err(e) = res {
                if !e.is_cancelled() {
                    tracing::error!("source load task failed: {e}");
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceLoader {
    client: NodeClient,
}

impl SourceLoader {
    pub fn new(client: NodeClient) -> Self {
        Self { client }
    }

    /// Spawn the backup-index, device and run-list fetches for `generation`.
    pub fn spawn(&self, generation: u64, event_tx: &UnboundedSender<PresenterEvent>) -> LoadSet {
        let backup = {
            let client = self.client.clone();
            spawn_fetch(generation, event_tx.clone(), async move {
                SourcePayload::BackupIndex(
                    client.fetch_backup_index().await.map_err(|e| e.to_string()),
                )
            })
        };
        let devices = {
            let client = self.client.clone();
            spawn_fetch(generation, event_tx.clone(), async move {
                SourcePayload::Devices(client.fetch_devices().await.map_err(|e| e.to_string()))
            })
        };
        let runs = {
            let client = self.client.clone();
            spawn_fetch(generation, event_tx.clone(), async move {
                SourcePayload::Runs(client.fetch_runs().await.map_err(|e| e.to_string()))
            })
        };

        LoadSet {
            generation,
            handles: vec![backup, devices, runs],
        }
    }
}

fn spawn_fetch<F>(
    generation: u64,
    event_tx: UnboundedSender<PresenterEvent>,
    fetch: F,
) -> JoinHandle<()>
where
    F: Future<Output = SourcePayload> + Send + 'static,
{
    tokio::spawn(async move {
        let payload = fetch.await;
        match &payload {
            SourcePayload::BackupIndex(Ok(index)) => {
                tracing::info!(generation, files = index.len(), "backup index loaded")
            }
            SourcePayload::Devices(Ok(_)) => tracing::info!(generation, "device list loaded"),
            SourcePayload::Runs(Ok(runs)) => {
                tracing::info!(generation, runs = runs.len(), "run list loaded")
            }
            SourcePayload::BackupIndex(Err(e))
            | SourcePayload::Devices(Err(e))
            | SourcePayload::Runs(Err(e)) => {
                tracing::warn!(generation, source = payload.source_name(), "load failed: {e}")
            }
        }
        let _ = event_tx.send(PresenterEvent::Source(SourceUpdate {
            generation,
            payload,
        }));
    })
}
