//! Parallel-array series handling.
//!
//! The store keeps four lists per sensor; everything above this module works
//! on aligned [`Reading`] rows. Zipping happens in exactly one place so a
//! length divergence is detected here and nowhere else.

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::models::Reading;

pub const TEMPERATURE: &str = "temperature";
pub const HUMIDITY: &str = "humidity";
pub const CO2: &str = "co2";
pub const TIMESTAMP: &str = "timestamp";
pub const COLUMNS: [&str; 4] = [TEMPERATURE, HUMIDITY, CO2, TIMESTAMP];

/// Zips the four raw series into rows. Diverged lengths (possible under
/// concurrent writers, per-key store atomicity only) are logged and the
/// view truncated to the shortest series; stored data is left as-is for
/// operational remediation.
pub fn zip_rows(
    serial_num: &str,
    temperature: Vec<String>,
    humidity: Vec<String>,
    co2: Vec<String>,
    timestamp: Vec<String>,
) -> Vec<Reading> {
    let len = temperature
        .len()
        .min(humidity.len())
        .min(co2.len())
        .min(timestamp.len());

    let max = temperature
        .len()
        .max(humidity.len())
        .max(co2.len())
        .max(timestamp.len());
    if max != len {
        warn!(
            serial_num = %serial_num,
            temperature = temperature.len(),
            humidity = humidity.len(),
            co2 = co2.len(),
            timestamp = timestamp.len(),
            "sensor series lengths diverge; truncating view to shortest"
        );
    }

    (0..len)
        .map(|i| Reading {
            temperature: parse_value(&temperature[i]),
            humidity: parse_value(&humidity[i]),
            co2: parse_value(&co2[i]),
            timestamp: timestamp[i].clone(),
        })
        .collect()
}

fn parse_value(raw: &str) -> f64 {
    raw.parse().unwrap_or_default()
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

// ---------------------------------------------------------------------------
// Query windows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    Hours(i64),
    Days(i64),
}

impl Window {
    /// Hours take precedence when both are supplied.
    pub fn from_params(hours: Option<i64>, days: Option<i64>) -> Option<Self> {
        hours.map(Window::Hours).or(days.map(Window::Days))
    }

    pub fn millis(self) -> i64 {
        match self {
            Window::Hours(h) => h * 3_600_000,
            Window::Days(d) => d * 86_400_000,
        }
    }
}

/// Keeps rows whose age at `now` is within the window, boundary inclusive.
/// Rows are dropped and kept as whole units, so the four columns stay
/// aligned by construction. Rows with unparseable timestamps fall outside
/// every window.
pub fn filter_window(rows: Vec<Reading>, window: Option<Window>, now: DateTime<Utc>) -> Vec<Reading> {
    let Some(window) = window else {
        return rows;
    };
    let horizon_ms = window.millis();

    rows.into_iter()
        .filter(|row| match parse_timestamp(&row.timestamp) {
            Some(ts) => now.signed_duration_since(ts).num_milliseconds() <= horizon_ms,
            None => false,
        })
        .collect()
}
