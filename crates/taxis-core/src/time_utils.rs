use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use tracing::warn;

use crate::error::{Result, TripsError};

/// Layout of the pickup / dropoff columns, e.g. `04/20/2018 09:57:26 PM`.
pub const TRIP_TIME_FORMAT: &str = "%m/%d/%Y %I:%M:%S %p";

// ── Trip timestamps ───────────────────────────────────────────────────────────

/// Parse a trip time column into epoch seconds.
///
/// The dataset carries no zone information, so the value is read as UTC.
pub fn parse_trip_time(s: &str) -> Option<i64> {
    NaiveDateTime::parse_from_str(s, TRIP_TIME_FORMAT)
        .ok()
        .map(|naive| naive.and_utc().timestamp())
}

// ── Query bounds ──────────────────────────────────────────────────────────────

/// Parse a `--from` / `--to` bound.
///
/// Accepts RFC 3339 (`2018-01-09T12:00:00Z`), a naive `YYYY-MM-DD HH:MM:SS`
/// read as UTC, or a bare `YYYY-MM-DD` meaning midnight UTC.
pub fn parse_date_bound(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    const FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];
    for fmt in FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| TripsError::InvalidDate(s.to_string()))
}

// ── Time zones ────────────────────────────────────────────────────────────────

/// Detect the IANA timezone name of the running system.
///
/// Falls back to `"UTC"` if detection fails.
pub fn get_system_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

/// Resolve a timezone name for display.
///
/// `"auto"` means the system zone. Unknown names fall back to UTC with a
/// warning.
pub fn resolve_timezone(name: &str) -> Tz {
    let name = if name.eq_ignore_ascii_case("auto") {
        get_system_timezone()
    } else {
        name.to_string()
    };

    name.parse::<Tz>().unwrap_or_else(|_| {
        warn!("unrecognised timezone \"{}\", falling back to UTC", name);
        Tz::UTC
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_trip_time_pm() {
        assert_eq!(parse_trip_time("04/20/2018 09:57:26 PM"), Some(1_524_261_446));
    }

    #[test]
    fn test_parse_trip_time_midnight_and_noon() {
        let midnight = Utc.with_ymd_and_hms(2018, 1, 1, 0, 0, 0).unwrap().timestamp();
        let noon = Utc.with_ymd_and_hms(2018, 1, 1, 12, 0, 0).unwrap().timestamp();
        assert_eq!(parse_trip_time("01/01/2018 12:00:00 AM"), Some(midnight));
        assert_eq!(parse_trip_time("01/01/2018 12:00:00 PM"), Some(noon));
    }

    #[test]
    fn test_parse_trip_time_rejects_other_layouts() {
        assert_eq!(parse_trip_time("2018-04-20 21:57:26"), None);
        assert_eq!(parse_trip_time("04/20/2018 21:57:26"), None);
        assert_eq!(parse_trip_time(""), None);
    }

    #[test]
    fn test_parse_date_bound_date_only() {
        let dt = parse_date_bound("2017-12-24").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2017, 12, 24, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_date_bound_rfc3339() {
        let dt = parse_date_bound("2018-01-09T10:00:00+02:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2018, 1, 9, 8, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_date_bound_naive_datetime() {
        let dt = parse_date_bound("2018-01-09 23:59:59").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2018, 1, 9, 23, 59, 59).unwrap());
    }

    #[test]
    fn test_parse_date_bound_invalid() {
        match parse_date_bound("yesterday") {
            Err(TripsError::InvalidDate(s)) => assert_eq!(s, "yesterday"),
            other => panic!("expected InvalidDate, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_timezone_known_and_unknown() {
        assert_eq!(resolve_timezone("America/New_York"), chrono_tz::America::New_York);
        assert_eq!(resolve_timezone("Not/AZone"), Tz::UTC);
    }

    #[test]
    fn test_get_system_timezone_non_empty() {
        assert!(!get_system_timezone().is_empty());
    }
}
