//! Text summary builder for CLI output.
//!
//! Also hosts the duration and backup labels the TUI tables reuse.

use crate::model::{device_rows, RunView, Timestamp};
use crate::orchestrator::ViewModel;
use crate::timefmt::compare_time;
use time::OffsetDateTime;

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

/// `"1h 05m"` style rendering of a minute count.
pub(crate) fn format_minutes(minutes: i64) -> String {
    let sign = if minutes < 0 { "-" } else { "" };
    let m = minutes.unsigned_abs();
    match m {
        0..=59 => format!("{sign}{m}m"),
        60..=1439 => format!("{sign}{}h {:02}m", m / 60, m % 60),
        _ => format!("{sign}{}d {:02}h", m / 1440, (m % 1440) / 60),
    }
}

/// Run length, or time running so far when no end time is recorded.
pub(crate) fn duration_label(view: &RunView, now: OffsetDateTime) -> String {
    let start = Timestamp::from(view.run.start_time.as_str());
    if view.run.end_time.is_empty() {
        match compare_time(&start, None, now) {
            Ok(m) => format!("running {}", format_minutes(m)),
            Err(_) => "running".into(),
        }
    } else {
        let end = Timestamp::from(view.run.end_time.as_str());
        match compare_time(&start, Some(&end), now) {
            Ok(m) => format_minutes(m),
            Err(_) => "-".into(),
        }
    }
}

pub(crate) fn backup_label(view: &RunView, now: OffsetDateTime) -> String {
    match (&view.last_backup, view.has_backup) {
        (Some(ts), true) => match compare_time(ts, None, now) {
            Ok(m) => format!("{} ({} ago)", ts.display(), format_minutes(m)),
            Err(_) => ts.display(),
        },
        (None, true) => "present".into(),
        _ => "none".into(),
    }
}

/// Build a text summary from a loaded view model.
pub(crate) fn build_text_summary(vm: &ViewModel, now: OffsetDateTime) -> TextSummary {
    let mut lines = Vec::new();

    match vm.runs.as_ref() {
        Some(runs) => {
            lines.push(format!(
                "Runs: {} ({} backed up)",
                runs.len(),
                vm.backed_up_count()
            ));
            if !vm.backup_index_available {
                lines.push("Backup index unavailable; backup status not known".into());
            }
            for view in runs {
                let end = if view.run.end_time.is_empty() {
                    "-"
                } else {
                    view.run.end_time.as_str()
                };
                lines.push(format!(
                    "  {}  start {}  end {}  [{}]  backup: {}",
                    view.run.display_name(),
                    view.run.start_time,
                    end,
                    duration_label(view, now),
                    backup_label(view, now)
                ));
            }
        }
        None => lines.push("Runs: unavailable".into()),
    }

    match vm.devices.as_ref() {
        Some(devices) => {
            let rows = device_rows(devices);
            lines.push(format!("Devices: {}", rows.len()));
            for d in rows {
                lines.push(format!("  {} {} {} {}", d.id, d.name, d.status, d.ip));
            }
        }
        None => lines.push("Devices: unavailable".into()),
    }

    for e in &vm.errors {
        lines.push(format!("Error: {e}"));
    }

    TextSummary { lines }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Run;
    use serde_json::json;

    fn view(start: &str, end: &str, last_backup: Option<f64>) -> RunView {
        let run: Run = serde_json::from_value(json!({
            "experimental_data": "/srv/data/run1.db",
            "start_time": start,
            "end_time": end,
            "ethoscope_name": "ETHOSCOPE_001"
        }))
        .unwrap();
        RunView {
            run,
            has_backup: last_backup.is_some(),
            last_backup: last_backup.map(Timestamp::Unix),
        }
    }

    #[test]
    fn minutes_formatting() {
        assert_eq!(format_minutes(0), "0m");
        assert_eq!(format_minutes(59), "59m");
        assert_eq!(format_minutes(65), "1h 05m");
        assert_eq!(format_minutes(1500), "1d 01h");
        assert_eq!(format_minutes(-5), "-5m");
    }

    #[test]
    fn labels_for_finished_run_with_backup() {
        let now = OffsetDateTime::from_unix_timestamp(7200).unwrap();
        let v = view("2024/01/15 14:30:45", "2024/01/15 16:00:45", Some(3600.0));
        assert_eq!(duration_label(&v, now), "1h 30m");
        assert!(backup_label(&v, now).ends_with("(1h 00m ago)"));
    }

    #[test]
    fn running_run_without_backup() {
        let now = OffsetDateTime::from_unix_timestamp(600).unwrap();
        let v = view("0", "", None);
        assert_eq!(duration_label(&v, now), "running 10m");
        assert_eq!(backup_label(&v, now), "none");
    }

    #[test]
    fn backup_without_mtime_is_still_present() {
        let now = OffsetDateTime::from_unix_timestamp(600).unwrap();
        let mut v = view("0", "", None);
        v.has_backup = true;
        assert_eq!(backup_label(&v, now), "present");
    }

    #[test]
    fn summary_lists_runs_devices_and_errors() {
        let vm = ViewModel {
            generation: 1,
            runs: Some(vec![view("2024/01/15 14:30:45", "", Some(1.0))]),
            devices: Some(json!({"abc": {"name": "ETHOSCOPE_001", "status": "running"}})),
            backup_index_available: true,
            errors: vec!["devices: timeout".into()],
        };
        let now = OffsetDateTime::now_utc();
        let summary = build_text_summary(&vm, now);

        assert_eq!(summary.lines[0], "Runs: 1 (1 backed up)");
        assert!(summary.lines[1].contains("ETHOSCOPE_001"));
        assert!(summary.lines.iter().any(|l| l == "Devices: 1"));
        assert_eq!(summary.lines.last().unwrap(), "Error: devices: timeout");
    }

    #[test]
    fn summary_when_nothing_loaded() {
        let summary = build_text_summary(&ViewModel::default(), OffsetDateTime::now_utc());
        assert_eq!(
            summary.lines,
            vec!["Runs: unavailable".to_string(), "Devices: unavailable".to_string()]
        );
    }
}
