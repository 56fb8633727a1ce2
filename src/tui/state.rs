use crate::model::{NodeConfig, PresenterEvent, SourcePayload};
use crate::orchestrator::{Sources, ViewModel};
use std::time::Instant;

pub const TAB_RUNS: usize = 0;
pub const TAB_DEVICES: usize = 1;
pub const TAB_HELP: usize = 2;
pub const TAB_COUNT: usize = 3;

/// UI-thread view state. Only the TUI thread touches it.
pub struct UiState {
    pub tab: usize,
    pub info: String,
    pub base_url: String,
    pub auto_refresh: bool,

    pub sources: Sources,
    pub view: ViewModel,
    pub last_update: Option<Instant>,
    pub ticks: u64,

    pub runs_selected: usize,
    pub devices_selected: usize,
}

impl UiState {
    pub fn new(cfg: &NodeConfig) -> Self {
        Self {
            tab: TAB_RUNS,
            info: "Loading…".into(),
            base_url: cfg.base_url.clone(),
            auto_refresh: cfg.auto_refresh,
            sources: Sources::default(),
            view: ViewModel::default(),
            last_update: None,
            ticks: 0,
            runs_selected: 0,
            devices_selected: 0,
        }
    }

    pub fn apply_event(&mut self, ev: PresenterEvent) {
        match ev {
            PresenterEvent::Source(update) => {
                let name = update.payload.source_name();
                let failure = match &update.payload {
                    SourcePayload::BackupIndex(Err(e))
                    | SourcePayload::Devices(Err(e))
                    | SourcePayload::Runs(Err(e)) => Some(e.clone()),
                    _ => None,
                };
                if self.sources.apply(update) {
                    self.view = ViewModel::build(&self.sources);
                    self.last_update = Some(Instant::now());
                    self.clamp_selection();
                    self.info = match failure {
                        Some(e) => format!("Failed to load {name}: {e}"),
                        None if self.sources.all_resolved() => format!(
                            "Loaded {} runs, {} devices",
                            self.view.run_count(),
                            self.device_count()
                        ),
                        None => format!("Loaded {name}"),
                    };
                }
            }
            PresenterEvent::Tick => self.ticks += 1,
            PresenterEvent::Info(msg) => self.info = msg,
        }
    }

    pub fn device_count(&self) -> usize {
        self.view
            .devices
            .as_ref()
            .map_or(0, |d| crate::model::device_rows(d).len())
    }

    fn row_count(&self) -> usize {
        match self.tab {
            TAB_RUNS => self.view.run_count(),
            TAB_DEVICES => self.device_count(),
            _ => 0,
        }
    }

    fn selected_mut(&mut self) -> Option<&mut usize> {
        match self.tab {
            TAB_RUNS => Some(&mut self.runs_selected),
            TAB_DEVICES => Some(&mut self.devices_selected),
            _ => None,
        }
    }

    pub fn select_next(&mut self) {
        let last = self.row_count().saturating_sub(1);
        if let Some(sel) = self.selected_mut() {
            *sel = (*sel + 1).min(last);
        }
    }

    pub fn select_prev(&mut self) {
        if let Some(sel) = self.selected_mut() {
            *sel = sel.saturating_sub(1);
        }
    }

    pub fn next_tab(&mut self) {
        self.tab = (self.tab + 1) % TAB_COUNT;
    }

    /// Keep selections inside the current row counts after a rebuild.
    pub fn clamp_selection(&mut self) {
        self.runs_selected = self
            .runs_selected
            .min(self.view.run_count().saturating_sub(1));
        self.devices_selected = self
            .devices_selected
            .min(self.device_count().saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SourceUpdate;
    use crate::node::test_support::test_config;
    use serde_json::json;

    fn runs_event(generation: u64, n: usize) -> PresenterEvent {
        let runs = (0..n)
            .map(|i| {
                serde_json::from_value(json!({
                    "experimental_data": format!("/srv/run{i}.db"),
                    "start_time": "2024-01-15 14:30:45"
                }))
                .unwrap()
            })
            .collect();
        PresenterEvent::Source(SourceUpdate {
            generation,
            payload: SourcePayload::Runs(Ok(runs)),
        })
    }

    fn backup_event(generation: u64) -> PresenterEvent {
        PresenterEvent::Source(SourceUpdate {
            generation,
            payload: SourcePayload::BackupIndex(Ok(Default::default())),
        })
    }

    #[test]
    fn rebuilds_view_on_source_updates() {
        let mut state = UiState::new(&test_config("http://localhost"));
        state.apply_event(runs_event(1, 3));
        assert!(state.view.runs.is_none());
        assert_eq!(state.info, "Loaded runs");

        state.apply_event(backup_event(1));
        assert_eq!(state.view.run_count(), 3);
        assert!(state.last_update.is_some());

        state.apply_event(PresenterEvent::Tick);
        state.apply_event(PresenterEvent::Tick);
        assert_eq!(state.ticks, 2);
    }

    #[test]
    fn failures_show_in_info() {
        let mut state = UiState::new(&test_config("http://localhost"));
        state.apply_event(PresenterEvent::Source(SourceUpdate {
            generation: 1,
            payload: SourcePayload::Devices(Err("HTTP 500".into())),
        }));
        assert_eq!(state.info, "Failed to load devices: HTTP 500");
        assert_eq!(state.view.errors, vec!["devices: HTTP 500".to_string()]);
    }

    #[test]
    fn selection_stays_in_bounds() {
        let mut state = UiState::new(&test_config("http://localhost"));
        state.apply_event(backup_event(1));
        state.apply_event(runs_event(1, 3));

        for _ in 0..10 {
            state.select_next();
        }
        assert_eq!(state.runs_selected, 2);

        // A reload with fewer runs pulls the selection back.
        state.apply_event(runs_event(2, 1));
        assert_eq!(state.runs_selected, 0);

        state.select_prev();
        assert_eq!(state.runs_selected, 0);

        state.next_tab();
        state.next_tab();
        state.next_tab();
        assert_eq!(state.tab, TAB_RUNS);
    }
}
