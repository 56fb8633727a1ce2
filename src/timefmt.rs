//! Timestamp normalisation and elapsed-time helpers.
//!
//! The node reports run times as `YYYY-MM-DD HH:MM:SS.ffffff` strings and backup
//! mtimes as Unix seconds; both end up here.

use crate::error::TimeError;
use crate::model::Timestamp;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// Drop everything from the first `.` and turn every `-` into `/`.
///
/// `"2024-01-15 14:30:45.123456"` becomes `"2024/01/15 14:30:45"`.
pub fn normalize_timestamp(raw: &str) -> String {
    raw.split('.').next().unwrap_or_default().replace('-', "/")
}

/// File name part of a data path, accepting either `\` or `/` separators.
pub fn backup_basename(path: &str) -> &str {
    let after_backslash = path.rsplit('\\').next().unwrap_or(path);
    after_backslash.rsplit('/').next().unwrap_or(after_backslash)
}

fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

fn from_unix_seconds(secs: f64) -> Result<OffsetDateTime, TimeError> {
    if !secs.is_finite() {
        return Err(TimeError::Unparseable(secs.to_string()));
    }
    let millis = (secs * 1000.0).trunc() as i128;
    OffsetDateTime::from_unix_timestamp_nanos(millis * 1_000_000)
        .map_err(|_| TimeError::Unparseable(secs.to_string()))
}

fn parse_date_text(raw: &str) -> Result<OffsetDateTime, TimeError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TimeError::Empty);
    }
    if let Ok(dt) = OffsetDateTime::parse(trimmed, &time::format_description::well_known::Rfc3339)
    {
        return Ok(dt);
    }
    // ISO date-only strings are UTC midnight, as browsers read them.
    if let Ok(date) = time::Date::parse(trimmed, &format_description!("[year]-[month]-[day]")) {
        return Ok(date.midnight().assume_utc());
    }

    // Other naive date strings are read in local time.
    let naive = normalize_timestamp(trimmed).replace('T', " ");
    let naive = naive.trim_end_matches('Z');
    let with_seconds = format_description!("[year]/[month]/[day] [hour]:[minute]:[second]");
    let without_seconds = format_description!("[year]/[month]/[day] [hour]:[minute]");
    let date_only = format_description!("[year]/[month]/[day]");

    let primitive = PrimitiveDateTime::parse(naive, &with_seconds)
        .or_else(|_| PrimitiveDateTime::parse(naive, &without_seconds))
        .or_else(|_| time::Date::parse(naive, &date_only).map(|d| d.midnight()))
        .map_err(|_| TimeError::Unparseable(raw.to_string()))?;
    Ok(primitive.assume_offset(local_offset()))
}

impl Timestamp {
    /// Resolve to an instant. Numeric strings count as Unix seconds.
    pub fn resolve(&self) -> Result<OffsetDateTime, TimeError> {
        match self {
            Timestamp::Unix(secs) => from_unix_seconds(*secs),
            Timestamp::Text(s) => match s.trim().parse::<f64>() {
                Ok(secs) => from_unix_seconds(secs),
                Err(_) => parse_date_text(s),
            },
        }
    }

    /// Local `YYYY-MM-DD HH:MM` rendering, or the raw text when it does not parse.
    pub fn display(&self) -> String {
        let fmt = format_description!("[year]-[month]-[day] [hour]:[minute]");
        match self.resolve() {
            Ok(dt) => dt
                .to_offset(local_offset())
                .format(&fmt)
                .unwrap_or_else(|_| self.raw()),
            Err(_) => self.raw(),
        }
    }

    fn raw(&self) -> String {
        match self {
            Timestamp::Unix(secs) => secs.to_string(),
            Timestamp::Text(s) => s.clone(),
        }
    }
}

impl From<&str> for Timestamp {
    fn from(s: &str) -> Self {
        Timestamp::Text(s.to_string())
    }
}

impl From<f64> for Timestamp {
    fn from(secs: f64) -> Self {
        Timestamp::Unix(secs)
    }
}

/// Whole minutes from `t1` to `t2`, floored. Negative when `t1` is later.
///
/// An omitted `t2` means `now`; callers pass one instant for a whole table so
/// every row is measured against the same moment.
pub fn compare_time(
    t1: &Timestamp,
    t2: Option<&Timestamp>,
    now: OffsetDateTime,
) -> Result<i64, TimeError> {
    let start = t1.resolve()?;
    let end = match t2 {
        Some(t) => t.resolve()?,
        None => now,
    };
    let millis = (end - start).whole_milliseconds();
    Ok(millis.div_euclid(60_000) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minutes(t1: &Timestamp, t2: &Timestamp) -> Result<i64, TimeError> {
        compare_time(t1, Some(t2), OffsetDateTime::now_utc())
    }

    #[test]
    fn normalize_drops_fraction_and_dashes() {
        assert_eq!(
            normalize_timestamp("2024-01-15 14:30:45.123456"),
            "2024/01/15 14:30:45"
        );
        assert_eq!(normalize_timestamp("2024-01-15 14:30:45"), "2024/01/15 14:30:45");
        assert_eq!(normalize_timestamp(""), "");
        // Idempotent on already normalised values.
        assert_eq!(normalize_timestamp("2024/01/15 14:30:45"), "2024/01/15 14:30:45");
    }

    #[test]
    fn basename_handles_both_separators() {
        assert_eq!(backup_basename("C:\\data\\run1.db"), "run1.db");
        assert_eq!(backup_basename("/srv/data/run2.db"), "run2.db");
        assert_eq!(backup_basename("C:\\data/mixed/run3.db"), "run3.db");
        assert_eq!(backup_basename("run4.db"), "run4.db");
        assert_eq!(backup_basename(""), "");
    }

    #[test]
    fn numeric_difference_in_minutes() {
        assert_eq!(minutes(&0.0.into(), &600.0.into()), Ok(10));
        assert_eq!(minutes(&0.0.into(), &659.0.into()), Ok(10));
        assert_eq!(minutes(&600.0.into(), &0.0.into()), Ok(-10));
        assert_eq!(minutes(&30.0.into(), &0.0.into()), Ok(-1));
    }

    #[test]
    fn numeric_strings_are_unix_seconds() {
        assert_eq!(minutes(&"0".into(), &"120".into()), Ok(2));
    }

    #[test]
    fn omitted_end_means_now() {
        let now = OffsetDateTime::from_unix_timestamp(3600).unwrap();
        assert_eq!(compare_time(&0.0.into(), None, now), Ok(60));

        let wall = OffsetDateTime::now_utc();
        let hour_ago = (wall.unix_timestamp() - 3600) as f64;
        assert_eq!(compare_time(&hour_ago.into(), None, wall), Ok(60));
    }

    #[test]
    fn date_strings_in_node_formats() {
        let start: Timestamp = "2024/01/15 14:30:45".into();
        let end: Timestamp = "2024-01-15 16:00:45.999".into();
        assert_eq!(minutes(&start, &end), Ok(90));

        let rfc_start: Timestamp = "2024-01-15T14:30:00Z".into();
        let rfc_end: Timestamp = "2024-01-15T15:00:00+00:00".into();
        assert_eq!(minutes(&rfc_start, &rfc_end), Ok(30));

        let day: Timestamp = "2024/01/15".into();
        let next_day: Timestamp = "2024/01/16".into();
        assert_eq!(minutes(&day, &next_day), Ok(24 * 60));
    }

    #[test]
    fn iso_date_only_is_utc_midnight() {
        let day: Timestamp = "2024-01-15".into();
        assert_eq!(day.resolve().unwrap().unix_timestamp(), 1_705_276_800);
        assert_eq!(minutes(&"1970-01-01".into(), &600.0.into()), Ok(10));
    }

    #[test]
    fn rfc3339_against_unix() {
        let t1: Timestamp = "1970-01-01T00:00:00Z".into();
        assert_eq!(minutes(&t1, &600.0.into()), Ok(10));
    }

    #[test]
    fn invalid_inputs_are_errors() {
        let now = OffsetDateTime::now_utc();
        assert_eq!(compare_time(&"".into(), None, now), Err(TimeError::Empty));
        assert!(matches!(
            compare_time(&"yesterday".into(), None, now),
            Err(TimeError::Unparseable(_))
        ));
        assert!(minutes(&0.0.into(), &"nope".into()).is_err());
    }
}
