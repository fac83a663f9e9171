//! RCM record format conversion.
//!
//! The RCM record is the time-series layout expected by downstream benthic
//! modelling code: a calendar-anchored time axis, the speed/direction/u/v
//! columns and the instrument height above the sea bed. Time values are
//! serial days counted from 1970-01-01T00:00:00.

use crate::constants::{DEFAULT_ANCHOR_DAYS, MILLIS_PER_DAY};
use crate::error::{CurrentMeterError, Result};
use crate::series::CurrentTimeSeries;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Current record in the downstream consumer layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RcmRecord {
    /// Absolute time of each sample in serial days
    pub time: Vec<f64>,
    pub speed: Vec<f64>,
    pub direction: Vec<f64>,
    pub u: Vec<f64>,
    pub v: Vec<f64>,
    /// `abs(siteDepth - meterDepth)`, `None` only for an empty series
    /// without depths
    pub height_above_bed: Option<f64>,
    pub name: String,
    pub variable: String,
    pub is_sns: bool,
}

impl RcmRecord {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Time axis as calendar datetimes, `None` where a value is out of range
    pub fn datetimes(&self) -> Vec<Option<NaiveDateTime>> {
        self.time.iter().map(|&t| serial_day_to_datetime(t)).collect()
    }

    /// Time axis as whole milliseconds since the Unix epoch
    pub fn time_millis(&self) -> Vec<i64> {
        self.time
            .iter()
            .map(|t| (t * MILLIS_PER_DAY).round() as i64)
            .collect()
    }
}

/// Stateless converter from [`CurrentTimeSeries`] to [`RcmRecord`]
#[derive(Debug, Clone, Copy, Default)]
pub struct RcmConverter;

impl RcmConverter {
    /// Convert `series`, anchoring its first sample at `anchor` (serial days)
    /// or at [`DEFAULT_ANCHOR_DAYS`] when none is given
    pub fn convert(series: &CurrentTimeSeries, anchor: Option<f64>) -> Result<RcmRecord> {
        series.to_rcm_record(anchor.unwrap_or(DEFAULT_ANCHOR_DAYS))
    }

    /// Serial day value of a calendar datetime
    pub fn anchor_from_datetime(datetime: NaiveDateTime) -> f64 {
        datetime.and_utc().timestamp_millis() as f64 / MILLIS_PER_DAY
    }
}

/// Calendar datetime of a serial day value, rounded to the millisecond
pub fn serial_day_to_datetime(days: f64) -> Option<NaiveDateTime> {
    if !days.is_finite() {
        return None;
    }
    let millis = (days * MILLIS_PER_DAY).round() as i64;
    DateTime::from_timestamp_millis(millis).map(|dt| dt.naive_utc())
}

/// Parse a time anchor given as an ISO datetime, an ISO date, or a bare
/// serial day number
pub fn parse_anchor(value: &str) -> Result<f64> {
    let value = value.trim();

    if let Ok(days) = value.parse::<f64>() {
        if days.is_finite() {
            return Ok(days);
        }
    }

    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(RcmConverter::anchor_from_datetime(datetime));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(datetime) = date.and_hms_opt(0, 0, 0) {
            return Ok(RcmConverter::anchor_from_datetime(datetime));
        }
    }

    Err(CurrentMeterError::configuration(format!(
        "invalid time anchor '{}': expected YYYY-MM-DD[THH:MM:SS] or serial days",
        value
    )))
}
