//! Application-level orchestration.
//!
//! Owns the view lifecycle (initial load, reloads, periodic tick, teardown) and
//! the merge of fetched sources into the view model. UI/CLI layers call into
//! this module and only ever read the resulting `ViewModel`.

#[cfg(feature = "tui")]
mod controller;
mod merge;
#[cfg(feature = "tui")]
mod timer;

#[cfg(feature = "tui")]
pub(crate) use controller::{run_controller, UiCommand};
pub(crate) use merge::{Sources, ViewModel};

use crate::model::{NodeConfig, PresenterEvent};
use crate::node::{NodeClient, SourceLoader};
use anyhow::{Context, Result};
use tokio::sync::mpsc;

/// Fetch every source once and build the view model after all of them resolved.
pub(crate) async fn load_snapshot(cfg: &NodeConfig) -> Result<ViewModel> {
    let client = NodeClient::new(cfg).context("failed to set up node client")?;
    let loader = SourceLoader::new(client);

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<PresenterEvent>();
    let loads = loader.spawn(1, &event_tx);
    drop(event_tx);

    let mut sources = Sources::default();
    while let Some(ev) = event_rx.recv().await {
        if let PresenterEvent::Source(update) = ev {
            sources.apply(update);
        }
    }
    loads.join().await;

    Ok(ViewModel::build(&sources))
}
