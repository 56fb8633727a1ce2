//! View lifecycle controller.
//!
//! Owns the refresh timer and the in-flight loads for as long as the view is
//! open, and releases both when the view goes away.

use super::timer::RefreshTimer;
use crate::model::{NodeConfig, PresenterEvent};
use crate::node::{LoadSet, SourceLoader};
use anyhow::Result;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Commands emitted by UI layers.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    Reload,
    Quit,
}

struct Loads {
    loader: SourceLoader,
    generation: u64,
    in_flight: Vec<LoadSet>,
}

impl Loads {
    fn start_next(&mut self, event_tx: &UnboundedSender<PresenterEvent>) {
        self.in_flight.retain(|set| !set.is_finished());
        self.generation += 1;
        tracing::debug!(generation = self.generation, "loading sources");
        self.in_flight.push(self.loader.spawn(self.generation, event_tx));
    }

    fn abort_all(&mut self) {
        for set in self.in_flight.drain(..) {
            tracing::debug!(generation = set.generation, "aborting loads");
            set.abort();
        }
    }
}

/// Load all sources, then serve UI commands and timer ticks until the view quits.
pub(crate) async fn run_controller(
    cfg: &NodeConfig,
    loader: SourceLoader,
    event_tx: UnboundedSender<PresenterEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let mut loads = Loads {
        loader,
        generation: 0,
        in_flight: Vec::new(),
    };
    loads.start_next(&event_tx);

    let (tick_tx, mut tick_rx) = mpsc::unbounded_channel::<()>();
    let mut timer = RefreshTimer::start(cfg.refresh_interval, move || {
        tracing::debug!("refresh");
        let _ = tick_tx.send(());
    });

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UiCommand::Reload) => {
                        let _ = event_tx.send(PresenterEvent::Info("Reloading…".into()));
                        loads.start_next(&event_tx);
                    }
                    // A closed command channel means the view is gone.
                    Some(UiCommand::Quit) | None => break,
                }
            }
            Some(()) = tick_rx.recv() => {
                let _ = event_tx.send(PresenterEvent::Tick);
                if cfg.auto_refresh {
                    loads.start_next(&event_tx);
                }
            }
        }
    }

    timer.cancel();
    loads.abort_all();
    tracing::debug!(timer_active = timer.is_active(), "view closed");
    Ok(())
}
