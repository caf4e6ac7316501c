use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Result, TripsError};
use crate::record::Field;

// ── QueryOpts ─────────────────────────────────────────────────────────────────

/// Everything a single aggregation run needs.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOpts {
    /// CSV file with the trip data.
    pub path: PathBuf,

    /// Number of parsing workers. Resolved by the caller; always at least 1.
    pub workers: usize,

    /// Bucket width in seconds.
    pub interval: i64,

    /// Trips picked up before this instant are ignored. The whole file is
    /// still read since it is not necessarily sorted.
    pub from_date: Option<DateTime<Utc>>,

    /// Trips picked up after this instant are ignored.
    pub to_date: Option<DateTime<Utc>>,
}

impl QueryOpts {
    /// Options with no date bounds.
    pub fn new(path: impl Into<PathBuf>, workers: usize, interval: i64) -> Self {
        Self {
            path: path.into(),
            workers,
            interval,
            from_date: None,
            to_date: None,
        }
    }

    pub fn with_from_date(mut self, from: DateTime<Utc>) -> Self {
        self.from_date = Some(from);
        self
    }

    pub fn with_to_date(mut self, to: DateTime<Utc>) -> Self {
        self.to_date = Some(to);
        self
    }

    /// Reject options the pipeline can not execute.
    pub fn validate(&self) -> Result<()> {
        if self.interval <= 0 {
            return Err(TripsError::InvalidQuery(format!(
                "interval must be a positive number of seconds, got {}",
                self.interval
            )));
        }
        if self.workers == 0 {
            return Err(TripsError::InvalidQuery(
                "at least one worker is required".to_string(),
            ));
        }
        Ok(())
    }

    /// `true` when a pickup at `timestamp` (epoch seconds) is inside the
    /// `[from_date, to_date]` window. Both bounds are inclusive.
    pub fn in_range(&self, timestamp: i64) -> bool {
        if let Some(from) = self.from_date {
            // Pickups carry whole seconds, so a fractional lower bound rounds up.
            let lower = from.timestamp() + i64::from(from.timestamp_subsec_nanos() > 0);
            if timestamp < lower {
                return false;
            }
        }
        if let Some(to) = self.to_date {
            if timestamp > to.timestamp() {
                return false;
            }
        }
        true
    }

    /// Left-aligned bucket key for `timestamp`.
    ///
    /// pickup=24, interval=5 → 20, giving the series `[0, 5, 10, 15, 20]`.
    pub fn bucket(&self, timestamp: i64) -> i64 {
        timestamp - timestamp.rem_euclid(self.interval)
    }
}

// ── DataPoint ─────────────────────────────────────────────────────────────────

/// One output row: a bucket start time and its aggregated value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DataPoint<V> {
    /// Bucket start, epoch seconds.
    pub timestamp: i64,
    pub value: V,
}

// ── Metric ────────────────────────────────────────────────────────────────────

/// The statistic a query computes per bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// Number of trips.
    Counter,
    /// Mean trip distance.
    Distance,
    /// Mean fare amount.
    Fare,
    /// Mean tip amount.
    Tip,
    /// Mean total amount.
    Total,
    /// Mean passenger count.
    Passengers,
}

impl Metric {
    pub const NAMES: [&'static str; 6] =
        ["counter", "distance", "fare", "tip", "total", "passengers"];

    pub fn name(self) -> &'static str {
        match self {
            Metric::Counter => "counter",
            Metric::Distance => "distance",
            Metric::Fare => "fare",
            Metric::Tip => "tip",
            Metric::Total => "total",
            Metric::Passengers => "passengers",
        }
    }

    /// The column averaged by this metric, or `None` for [`Metric::Counter`].
    pub fn averaged_field(self) -> Option<Field> {
        match self {
            Metric::Counter => None,
            Metric::Distance => Some(Field::TripDistance),
            Metric::Fare => Some(Field::FareAmount),
            Metric::Tip => Some(Field::TipAmount),
            Metric::Total => Some(Field::TotalAmount),
            Metric::Passengers => Some(Field::PassengerCount),
        }
    }
}

impl FromStr for Metric {
    type Err = TripsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "counter" => Ok(Metric::Counter),
            "distance" => Ok(Metric::Distance),
            "fare" => Ok(Metric::Fare),
            "tip" => Ok(Metric::Tip),
            "total" => Ok(Metric::Total),
            "passengers" => Ok(Metric::Passengers),
            other => Err(TripsError::UnknownMetric(other.to_string())),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Series ────────────────────────────────────────────────────────────────────

/// Result of running a [`Metric`]: counts or averages, ascending by bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Series {
    Counts(Vec<DataPoint<u64>>),
    Averages(Vec<DataPoint<f64>>),
}

impl Series {
    pub fn len(&self) -> usize {
        match self {
            Series::Counts(points) => points.len(),
            Series::Averages(points) => points.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn opts() -> QueryOpts {
        QueryOpts::new("trips.csv", 2, 5)
    }

    #[test]
    fn test_bucket_left_closed() {
        let q = opts();
        assert_eq!(q.bucket(24), 20);
        assert_eq!(q.bucket(20), 20);
        assert_eq!(q.bucket(0), 0);
        assert_eq!(q.bucket(4), 0);
    }

    #[test]
    fn test_bucket_negative_timestamps_stay_left_aligned() {
        let q = opts();
        assert_eq!(q.bucket(-1), -5);
        assert_eq!(q.bucket(-5), -5);
    }

    #[test]
    fn test_bucket_daily() {
        let q = QueryOpts::new("trips.csv", 1, 86_400);
        // 2018-04-20 21:57:26 UTC → 2018-04-20 00:00:00 UTC
        assert_eq!(q.bucket(1_524_261_446), 1_524_182_400);
    }

    #[test]
    fn test_in_range_inclusive_bounds() {
        let from = Utc.timestamp_opt(1_000, 0).unwrap();
        let to = Utc.timestamp_opt(2_000, 0).unwrap();
        let q = opts().with_from_date(from).with_to_date(to);

        assert!(q.in_range(1_000));
        assert!(q.in_range(2_000));
        assert!(q.in_range(1_500));
        assert!(!q.in_range(999));
        assert!(!q.in_range(2_001));
    }

    #[test]
    fn test_in_range_fractional_lower_bound() {
        let from = Utc.timestamp_opt(1_000, 500_000_000).unwrap();
        let q = opts().with_from_date(from);
        assert!(!q.in_range(1_000));
        assert!(q.in_range(1_001));
    }

    #[test]
    fn test_in_range_unbounded() {
        let q = opts();
        assert!(q.in_range(i64::MIN));
        assert!(q.in_range(i64::MAX));
    }

    #[test]
    fn test_validate() {
        assert!(opts().validate().is_ok());
        assert!(matches!(
            QueryOpts::new("x", 1, 0).validate(),
            Err(TripsError::InvalidQuery(_))
        ));
        assert!(matches!(
            QueryOpts::new("x", 1, -60).validate(),
            Err(TripsError::InvalidQuery(_))
        ));
        assert!(matches!(
            QueryOpts::new("x", 0, 60).validate(),
            Err(TripsError::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_metric_from_str() {
        for name in Metric::NAMES {
            let metric: Metric = name.parse().unwrap();
            assert_eq!(metric.name(), name);
        }
        assert!(matches!(
            "median".parse::<Metric>(),
            Err(TripsError::UnknownMetric(s)) if s == "median"
        ));
    }

    #[test]
    fn test_metric_averaged_field() {
        assert_eq!(Metric::Counter.averaged_field(), None);
        assert_eq!(Metric::Distance.averaged_field(), Some(Field::TripDistance));
        for name in Metric::NAMES {
            let metric: Metric = name.parse().unwrap();
            if let Some(field) = metric.averaged_field() {
                assert!(field.is_numeric());
            }
        }
    }

    #[test]
    fn test_series_len() {
        let series = Series::Counts(vec![DataPoint {
            timestamp: 0,
            value: 3,
        }]);
        assert_eq!(series.len(), 1);
        assert!(Series::Averages(Vec::new()).is_empty());
    }
}
