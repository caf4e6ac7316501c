//! Query entry points: trip counts and averages per time bucket.
//!
//! Every query runs the same pipeline:
//!
//! 1. Open the input with a [`LineStreamer`] (fatal if it can not be opened).
//! 2. Fan the lines out to `opts.workers` threads with [`process_lines`].
//! 3. Each worker parses the columns it needs, drops trips outside the date
//!    window, and folds the rest into a private [`BucketMap`].
//! 4. Merge the partial maps and finalize them into a sorted series.

use std::io::BufRead;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use taxis_core::error::{Result, TripsError};
use taxis_core::models::{DataPoint, Metric, QueryOpts, Series};
use taxis_core::record::{Field, FieldSet, Trip};
use tracing::{debug, info, warn};

use crate::aggregator::{Accumulator, BucketMap, Count, Mean};
use crate::pool::process_lines;
use crate::stream::LineStreamer;

// ── Worker bookkeeping ────────────────────────────────────────────────────────

/// Unparseable lines reported individually at warn level; the rest go to debug.
pub const WARNED_SKIPS: u64 = 5;

/// Per-worker line counters, logged once the query finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Lines received from the streamer.
    pub lines: u64,
    /// Lines dropped because they could not be parsed.
    pub skipped: u64,
    /// Trips dropped by the date window.
    pub filtered: u64,
}

impl WorkerStats {
    fn add(&mut self, other: &WorkerStats) {
        self.lines += other.lines;
        self.skipped += other.skipped;
        self.filtered += other.filtered;
    }
}

struct Partial<A> {
    buckets: BucketMap<A>,
    stats: WorkerStats,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Number of trips per bucket.
pub fn counter(opts: &QueryOpts) -> Result<Vec<DataPoint<u64>>> {
    aggregate::<Count, _>(opts, FieldSet::empty(), |_| ())
}

/// Mean trip distance per bucket.
pub fn average_distance(opts: &QueryOpts) -> Result<Vec<DataPoint<f64>>> {
    average(opts, Field::TripDistance)
}

/// Mean of a numeric column per bucket.
///
/// Fails with [`TripsError::InvalidQuery`] for the store-and-forward flag,
/// which has no numeric value.
pub fn average(opts: &QueryOpts, field: Field) -> Result<Vec<DataPoint<f64>>> {
    if !field.is_numeric() {
        return Err(TripsError::InvalidQuery(format!(
            "can not average non-numeric column {}",
            field
        )));
    }
    aggregate::<Mean, _>(opts, FieldSet::of(&[field]), move |trip| {
        trip.numeric(field).unwrap_or_default()
    })
}

/// Run the query selected by `metric`.
pub fn run_metric(metric: Metric, opts: &QueryOpts) -> Result<Series> {
    match metric.averaged_field() {
        None => counter(opts).map(Series::Counts),
        Some(field) => average(opts, field).map(Series::Averages),
    }
}

/// Shared pipeline behind every query.
///
/// `fields` lists the columns `input` reads; the pickup time is always parsed
/// for filtering and bucketing. `input` maps a qualifying trip to the value
/// folded into its bucket.
///
/// The first [`WARNED_SKIPS`] unparseable lines are logged at warn level with
/// the reason; later ones only at debug, followed by one warn with the total.
pub fn aggregate<A, F>(
    opts: &QueryOpts,
    fields: FieldSet,
    input: F,
) -> Result<Vec<DataPoint<A::Output>>>
where
    A: Accumulator,
    F: Fn(&Trip) -> A::Input + Sync,
{
    opts.validate()?;
    let streamer = LineStreamer::open(&opts.path)?;
    aggregate_stream::<_, A, F>(streamer, opts, fields, input)
}

/// Run the pipeline over an already open streamer; `opts.path` is only logged.
fn aggregate_stream<R, A, F>(
    streamer: LineStreamer<R>,
    opts: &QueryOpts,
    fields: FieldSet,
    input: F,
) -> Result<Vec<DataPoint<A::Output>>>
where
    R: BufRead + Send,
    A: Accumulator,
    F: Fn(&Trip) -> A::Input + Sync,
{
    let wanted = fields.with(Field::PickupDatetime);
    let warned = AtomicU64::new(0);

    let started = Instant::now();
    info!(
        "processing {} with {} workers, interval {}s",
        opts.path.display(),
        opts.workers,
        opts.interval
    );

    let output = process_lines(streamer, opts.workers, |worker, lines| {
        let mut partial = Partial {
            buckets: BucketMap::<A>::new(),
            stats: WorkerStats::default(),
        };

        for line in lines.iter() {
            partial.stats.lines += 1;
            let trip = match Trip::parse(&line, wanted) {
                Ok(trip) => trip,
                Err(e) => {
                    if first_skips(&warned) {
                        warn!("worker {}: skipping line: {}", worker, e);
                    } else {
                        debug!("worker {}: skipping line: {}", worker, e);
                    }
                    partial.stats.skipped += 1;
                    continue;
                }
            };

            if !opts.in_range(trip.pickup_datetime) {
                partial.stats.filtered += 1;
                continue;
            }

            partial
                .buckets
                .record(opts.bucket(trip.pickup_datetime), input(&trip));
        }

        debug!(
            "worker {}: {} lines, {} skipped, {} filtered, {} buckets",
            worker,
            partial.stats.lines,
            partial.stats.skipped,
            partial.stats.filtered,
            partial.buckets.len()
        );
        partial
    })?;

    let mut totals = WorkerStats::default();
    let mut global = BucketMap::<A>::new();
    for partial in output.partials {
        totals.add(&partial.stats);
        global.merge(partial.buckets);
    }

    if totals.skipped > 0 {
        warn!(
            "skipped {} of {} lines that could not be parsed",
            totals.skipped, totals.lines
        );
    }

    let data = global.into_series();
    info!(
        "{} lines, {} filtered, {} buckets in {:.2?}",
        output.stream.lines,
        totals.filtered,
        data.len(),
        started.elapsed()
    );
    Ok(data)
}

/// `true` while fewer than [`WARNED_SKIPS`] skips have been reported.
fn first_skips(warned: &AtomicU64) -> bool {
    warned.fetch_add(1, Ordering::Relaxed) < WARNED_SKIPS
}

// ── Tests ─────────────────────────────────────────────────────────────────────
