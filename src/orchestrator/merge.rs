//! Source bookkeeping and the pure run/backup merge.
//!
//! `Sources` accumulates the latest outcome of each fetch; `ViewModel::build`
//! derives everything the presentation layers show from it. Runs are only
//! published once the backup index request has resolved, so a fast run list
//! can never be enriched against an index that has not arrived yet.

use crate::model::{BackupIndex, Run, RunView, SourcePayload, SourceUpdate};
use crate::timefmt::{backup_basename, normalize_timestamp};
use serde::Serialize;

/// Latest known state of one source.
#[derive(Debug, Clone)]
pub struct Source<T> {
    value: Option<T>,
    generation: u64,
    last_error: Option<String>,
    resolved: bool,
}

impl<T> Default for Source<T> {
    fn default() -> Self {
        Self {
            value: None,
            generation: 0,
            last_error: None,
            resolved: false,
        }
    }
}

impl<T> Source<T> {
    /// Apply a fetch outcome. Returns false when the update is older than what
    /// is already applied. A failure keeps the previous value.
    fn apply(&mut self, generation: u64, result: Result<T, String>) -> bool {
        if generation < self.generation {
            return false;
        }
        self.generation = generation;
        self.resolved = true;
        match result {
            Ok(v) => {
                self.value = Some(v);
                self.last_error = None;
            }
            Err(e) => self.last_error = Some(e),
        }
        true
    }

    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Sources {
    pub backup_index: Source<BackupIndex>,
    pub devices: Source<serde_json::Value>,
    pub runs: Source<Vec<Run>>,
}

impl Sources {
    /// Returns true when the update changed what the view model would show.
    pub fn apply(&mut self, update: SourceUpdate) -> bool {
        let SourceUpdate {
            generation,
            payload,
        } = update;
        match payload {
            SourcePayload::BackupIndex(r) => self.backup_index.apply(generation, r),
            SourcePayload::Devices(r) => self.devices.apply(generation, r),
            SourcePayload::Runs(r) => self.runs.apply(generation, r),
        }
    }

    #[cfg(any(test, feature = "tui"))]
    pub fn all_resolved(&self) -> bool {
        self.backup_index.is_resolved() && self.devices.is_resolved() && self.runs.is_resolved()
    }

    fn generation(&self) -> u64 {
        self.backup_index
            .generation
            .max(self.devices.generation)
            .max(self.runs.generation)
    }
}

/// Everything the view shows, derived from `Sources` and never mutated in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ViewModel {
    pub generation: u64,
    /// `None` until both the run list and the backup index outcome are known.
    pub runs: Option<Vec<RunView>>,
    pub devices: Option<serde_json::Value>,
    pub backup_index_available: bool,
    pub errors: Vec<String>,
}

impl ViewModel {
    pub fn build(sources: &Sources) -> Self {
        let index = sources.backup_index.value();
        let runs = match (sources.runs.value(), sources.backup_index.is_resolved()) {
            (Some(runs), true) => Some(enrich_runs(runs, index)),
            _ => None,
        };

        let errors = [
            ("backup index", sources.backup_index.last_error()),
            ("devices", sources.devices.last_error()),
            ("runs", sources.runs.last_error()),
        ]
        .into_iter()
        .filter_map(|(name, err)| err.map(|e| format!("{name}: {e}")))
        .collect();

        Self {
            generation: sources.generation(),
            runs,
            devices: sources.devices.value().cloned(),
            backup_index_available: index.is_some(),
            errors,
        }
    }

    pub fn run_count(&self) -> usize {
        self.runs.as_ref().map_or(0, Vec::len)
    }

    pub fn backed_up_count(&self) -> usize {
        self.runs
            .as_ref()
            .map_or(0, |runs| runs.iter().filter(|r| r.has_backup).count())
    }
}

/// Normalise run times and attach backup status. A missing index is treated as
/// empty.
pub fn enrich_runs(runs: &[Run], index: Option<&BackupIndex>) -> Vec<RunView> {
    runs.iter()
        .map(|run| {
            let mut run = run.clone();
            if !run.end_time.is_empty() {
                run.end_time = normalize_timestamp(&run.end_time);
            }
            run.start_time = normalize_timestamp(&run.start_time);

            let backup = index.and_then(|idx| idx.get(backup_basename(&run.experimental_data)));

            RunView {
                has_backup: backup.is_some(),
                last_backup: backup.and_then(|file| file.mtime.clone()),
                run,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BackupFile, Timestamp};
    use serde_json::json;

    fn run(data: &str, start: &str, end: &str) -> Run {
        serde_json::from_value(json!({
            "experimental_data": data,
            "start_time": start,
            "end_time": end,
        }))
        .unwrap()
    }

    fn index(entries: &[(&str, f64)]) -> BackupIndex {
        entries
            .iter()
            .map(|(name, mtime)| {
                (
                    name.to_string(),
                    BackupFile {
                        mtime: Some(Timestamp::Unix(*mtime)),
                        extra: Default::default(),
                    },
                )
            })
            .collect()
    }

    fn runs_update(generation: u64, runs: Vec<Run>) -> SourceUpdate {
        SourceUpdate {
            generation,
            payload: SourcePayload::Runs(Ok(runs)),
        }
    }

    fn backup_update(generation: u64, result: Result<BackupIndex, String>) -> SourceUpdate {
        SourceUpdate {
            generation,
            payload: SourcePayload::BackupIndex(result),
        }
    }

    #[test]
    fn enrich_normalises_times() {
        let views = enrich_runs(
            &[
                run("a.db", "2024-01-15 14:30:45.123456", "2024-01-15 16:00:45.5"),
                run("b.db", "2024-01-16 09:00:00", ""),
            ],
            None,
        );

        assert_eq!(views[0].run.start_time, "2024/01/15 14:30:45");
        assert_eq!(views[0].run.end_time, "2024/01/15 16:00:45");
        assert_eq!(views[1].run.start_time, "2024/01/16 09:00:00");
        assert_eq!(views[1].run.end_time, "");
        for v in &views {
            assert!(!v.run.start_time.contains('-'));
            assert!(!v.run.end_time.contains('-') && !v.run.end_time.contains('.'));
        }
    }

    #[test]
    fn enrich_matches_backups_by_basename() {
        let idx = index(&[("run1.db", 1700000000.0)]);
        let views = enrich_runs(
            &[
                run("C:\\data\\run1.db", "2024-01-15 14:30:45", ""),
                run("/srv/data/run2.db", "2024-01-15 14:30:45", ""),
            ],
            Some(&idx),
        );

        assert!(views[0].has_backup);
        assert_eq!(views[0].last_backup, Some(Timestamp::Unix(1700000000.0)));
        assert!(!views[1].has_backup);
        assert_eq!(views[1].last_backup, None);
    }

    #[test]
    fn key_presence_decides_has_backup() {
        let mut idx = index(&[]);
        idx.insert("run1.db".into(), BackupFile::default());
        let views = enrich_runs(&[run("/srv/data/run1.db", "2024-01-15 14:30:45", "")], Some(&idx));

        assert!(views[0].has_backup);
        assert_eq!(views[0].last_backup, None);
    }

    #[test]
    fn runs_wait_for_backup_index() {
        let mut sources = Sources::default();
        sources.apply(runs_update(1, vec![run("/srv/run1.db", "2024-01-15 14:30:45", "")]));

        let vm = ViewModel::build(&sources);
        assert!(vm.runs.is_none(), "runs published before backup index resolved");

        sources.apply(backup_update(1, Ok(index(&[("run1.db", 1.0)]))));
        let vm = ViewModel::build(&sources);
        let runs = vm.runs.unwrap();
        assert!(runs[0].has_backup);
        assert!(vm.backup_index_available);
    }

    #[test]
    fn failed_backup_index_still_publishes_runs() {
        let mut sources = Sources::default();
        sources.apply(backup_update(1, Err("connection refused".into())));
        sources.apply(runs_update(1, vec![run("/srv/run1.db", "2024-01-15 14:30:45", "")]));

        let vm = ViewModel::build(&sources);
        assert!(!vm.backup_index_available);
        assert!(!vm.runs.unwrap()[0].has_backup);
        assert_eq!(vm.errors, vec!["backup index: connection refused".to_string()]);
    }

    #[test]
    fn stale_generations_are_ignored() {
        let mut sources = Sources::default();
        assert!(sources.apply(runs_update(2, vec![run("new.db", "2024-01-15 14:30:45", "")])));
        assert!(!sources.apply(runs_update(1, vec![run("old.db", "2024-01-15 14:30:45", "")])));
        assert_eq!(sources.runs.value().unwrap()[0].experimental_data, "new.db");
    }

    #[test]
    fn failure_keeps_previous_value() {
        let mut sources = Sources::default();
        sources.apply(backup_update(1, Ok(index(&[("run1.db", 1.0)]))));
        sources.apply(backup_update(2, Err("timeout".into())));

        assert!(sources.backup_index.value().unwrap().contains_key("run1.db"));
        assert_eq!(sources.backup_index.last_error(), Some("timeout"));

        sources.apply(backup_update(3, Ok(index(&[]))));
        assert_eq!(sources.backup_index.last_error(), None);
    }

    #[test]
    fn view_model_counts() {
        let mut sources = Sources::default();
        sources.apply(backup_update(1, Ok(index(&[("a.db", 1.0)]))));
        sources.apply(runs_update(
            1,
            vec![
                run("a.db", "2024-01-15 14:30:45", ""),
                run("b.db", "2024-01-15 14:30:45", ""),
            ],
        ));
        sources.apply(SourceUpdate {
            generation: 1,
            payload: SourcePayload::Devices(Ok(json!([]))),
        });

        assert!(sources.all_resolved());
        let vm = ViewModel::build(&sources);
        assert_eq!(vm.generation, 1);
        assert_eq!(vm.run_count(), 2);
        assert_eq!(vm.backed_up_count(), 1);
        assert_eq!(vm.devices, Some(json!([])));
    }
}
