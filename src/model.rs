use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub base_url: String,
    #[serde(with = "humantime_serde")]
    pub refresh_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    pub auto_refresh: bool,
    pub user_agent: String,
}

/// A point in time as reported by the node: Unix seconds or a date string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Unix(f64),
    Text(String),
}

/// One experiment run as listed by `runs_list`.
///
/// Fields the presenter does not interpret are kept in `extra` and written back
/// out unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    #[serde(default, deserialize_with = "lenient_string")]
    pub experimental_data: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub start_time: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub end_time: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Run {
    /// Best human label for the run, falling back to the data file name.
    pub fn display_name(&self) -> String {
        for key in ["ethoscope_name", "name", "run_id", "id"] {
            match self.extra.get(key) {
                Some(serde_json::Value::String(s)) if !s.is_empty() => return s.clone(),
                Some(serde_json::Value::Number(n)) => return n.to_string(),
                _ => {}
            }
        }
        crate::timefmt::backup_basename(&self.experimental_data).to_string()
    }

    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(|v| v.as_str())
    }
}

/// Strings pass through, numbers are rendered, anything else becomes empty.
fn lenient_string<'de, D>(de: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(de)? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

/// `runs_list` is normally an array. Object-shaped responses keyed by run id are
/// flattened with integer keys first in numeric order, then the rest.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RunsResponse {
    List(Vec<serde_json::Value>),
    Keyed(serde_json::Map<String, serde_json::Value>),
}

impl RunsResponse {
    /// Decode each record on its own; records that are not objects are skipped.
    pub fn into_runs(self) -> Vec<Run> {
        let records: Vec<(String, serde_json::Value)> = match self {
            RunsResponse::List(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v))
                .collect(),
            RunsResponse::Keyed(map) => {
                let mut entries: Vec<_> = map.into_iter().collect();
                entries.sort_by_key(|(k, _)| array_index(k).map_or((1, 0), |i| (0, i)));
                entries
            }
        };

        records
            .into_iter()
            .filter_map(|(key, record)| match serde_json::from_value::<Run>(record) {
                Ok(run) => Some(run),
                Err(e) => {
                    tracing::warn!(record = %key, "skipping run record: {e}");
                    None
                }
            })
            .collect()
    }
}

/// Canonical non-negative integer keys, which object iteration visits first.
fn array_index(key: &str) -> Option<u32> {
    let n: u32 = key.parse().ok()?;
    (n.to_string() == key && n != u32::MAX).then_some(n)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackupFile {
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub mtime: Option<Timestamp>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Backup files present on the node, keyed by file basename.
pub type BackupIndex = BTreeMap<String, BackupFile>;

fn lenient_timestamp<'de, D>(de: D) -> Result<Option<Timestamp>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(de)? {
        serde_json::Value::Number(n) => n.as_f64().map(Timestamp::Unix),
        serde_json::Value::String(s) => Some(Timestamp::Text(s)),
        _ => None,
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrowseResponse {
    #[serde(default, deserialize_with = "backup_entries")]
    pub files: BackupIndex,
}

/// Every key is kept; entries whose metadata is not an object carry no mtime.
fn backup_entries<'de, D>(de: D) -> Result<BackupIndex, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<serde_json::Map<String, serde_json::Value>>::deserialize(de)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(name, meta)| (name, serde_json::from_value(meta).unwrap_or_default()))
        .collect())
}

/// A run with the fields derived by the presenter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunView {
    #[serde(flatten)]
    pub run: Run,
    pub has_backup: bool,
    /// Modification time of the matching backup, when the index reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_backup: Option<Timestamp>,
}

/// Display fields pulled out of one device record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceRow {
    pub id: String,
    pub name: String,
    pub status: String,
    pub ip: String,
}

fn field_str(record: &serde_json::Value, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|k| record.get(*k))
        .find_map(|v| match v {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_default()
}

fn device_row(key: Option<&str>, record: &serde_json::Value) -> DeviceRow {
    let id = match key {
        Some(k) => k.to_string(),
        None => field_str(record, &["id"]),
    };
    DeviceRow {
        id,
        name: field_str(record, &["name", "ethoscope_name"]),
        status: field_str(record, &["status"]),
        ip: field_str(record, &["ip"]),
    }
}

/// Device list as table rows. Object-shaped lists use their keys as ids.
pub fn device_rows(devices: &serde_json::Value) -> Vec<DeviceRow> {
    match devices {
        serde_json::Value::Array(items) => items.iter().map(|r| device_row(None, r)).collect(),
        serde_json::Value::Object(map) => map
            .iter()
            .map(|(k, r)| device_row(Some(k), r))
            .collect(),
        _ => Vec::new(),
    }
}

/// Outcome of one source fetch. Errors are carried as rendered messages so the
/// update can be cloned across the UI boundary.
#[derive(Debug, Clone)]
pub enum SourcePayload {
    BackupIndex(Result<BackupIndex, String>),
    Devices(Result<serde_json::Value, String>),
    Runs(Result<Vec<Run>, String>),
}

impl SourcePayload {
    pub fn source_name(&self) -> &'static str {
        match self {
            SourcePayload::BackupIndex(_) => "backup index",
            SourcePayload::Devices(_) => "devices",
            SourcePayload::Runs(_) => "runs",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceUpdate {
    pub generation: u64,
    pub payload: SourcePayload,
}

/// Events delivered from the controller to presentation layers.
#[derive(Debug, Clone)]
pub enum PresenterEvent {
    Source(SourceUpdate),
    #[cfg_attr(not(feature = "tui"), allow(dead_code))]
    Tick,
    #[cfg_attr(not(feature = "tui"), allow(dead_code))]
    Info(String),
}
