use std::fmt::Display;

use chrono::DateTime;
use chrono_tz::Tz;

use crate::models::{DataPoint, Series};

/// RFC 1123 layout, e.g. `Sun, 24 Dec 2017 00:00:00 UTC`.
pub const RFC1123_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %Z";

/// Render an epoch timestamp as RFC 1123 in `tz`.
///
/// Timestamps outside chrono's range are rendered as the raw number.
///
/// # Examples
///
/// ```
/// use taxis_core::formatting::format_rfc1123;
///
/// assert_eq!(
///     format_rfc1123(1_514_073_600, chrono_tz::UTC),
///     "Sun, 24 Dec 2017 00:00:00 UTC"
/// );
/// ```
pub fn format_rfc1123(timestamp: i64, tz: Tz) -> String {
    match DateTime::from_timestamp(timestamp, 0) {
        Some(dt) => dt.with_timezone(&tz).format(RFC1123_FORMAT).to_string(),
        None => timestamp.to_string(),
    }
}

/// Format one point as `<epoch> <RFC 1123 time> <value>`.
pub fn format_point<V: Display>(point: &DataPoint<V>, tz: Tz) -> String {
    format!(
        "{} {} {}",
        point.timestamp,
        format_rfc1123(point.timestamp, tz),
        point.value
    )
}

/// Format every point of `series` as text lines, in order.
pub fn format_series(series: &Series, tz: Tz) -> Vec<String> {
    match series {
        Series::Counts(points) => points.iter().map(|p| format_point(p, tz)).collect(),
        Series::Averages(points) => points.iter().map(|p| format_point(p, tz)).collect(),
    }
}

/// Serialize `series` as a JSON array of `{"timestamp", "value"}` objects.
pub fn series_to_json(series: &Series) -> serde_json::Result<String> {
    serde_json::to_string_pretty(series)
}
