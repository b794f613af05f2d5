//! Effective-date derivation shared by every stage.
//!
//! Stages never pass an identifier to each other. Each one recomputes the
//! effective date from the same `run_date`, so this module is the only place
//! that derivation may live.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{FxFlowError, Result};

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// The date of record a run processes: run timestamp (UTC) minus one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EffectiveDate(NaiveDate);

impl EffectiveDate {
    /// Wrap a calendar date that is already the effective date.
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Derive the effective date from an ISO-8601 run timestamp.
    ///
    /// Accepts RFC 3339 (`Z` or an offset, converted to UTC), a naive
    /// date-time (taken as UTC) or a bare date (midnight UTC).
    pub fn from_run_date(raw: &str) -> Result<Self> {
        let run_at = parse_run_timestamp(raw)?;
        let date = run_at.date_naive() - Duration::days(1);
        Ok(Self(date))
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// Four-digit year partition value.
    pub fn year(&self) -> String {
        format!("{:04}", self.0.year())
    }

    /// Two-digit month partition value.
    pub fn month(&self) -> String {
        format!("{:02}", self.0.month())
    }

    /// Two-digit day partition value.
    pub fn day(&self) -> String {
        format!("{:02}", self.0.day())
    }

    /// `YYYY-MM-DD`.
    pub fn iso(&self) -> String {
        format!("{}-{}-{}", self.year(), self.month(), self.day())
    }

    /// The effective date one day earlier.
    pub fn previous(&self) -> Self {
        Self(self.0 - Duration::days(1))
    }

    /// Monday through Friday.
    pub fn is_market_open(&self) -> bool {
        !self.is_weekend()
    }

    pub fn is_weekend(&self) -> bool {
        matches!(self.0.weekday(), Weekday::Sat | Weekday::Sun)
    }
}

impl fmt::Display for EffectiveDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.iso())
    }
}

/// Parse a run timestamp into UTC.
pub fn parse_run_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }

    Err(FxFlowError::Validation(format!(
        "run_date is not an ISO-8601 timestamp: {raw:?}"
    )))
}
