//! Per-bucket accumulators and the merge / sort stage.
//!
//! Every worker fills its own [`BucketMap`]; once all workers are done the
//! maps are merged into one and finalized into a sorted series. Merging only
//! needs [`Accumulator::combine`] to be associative and commutative, so the
//! order in which lines or partials arrive never changes the result.

use std::collections::HashMap;

use taxis_core::models::DataPoint;

// ── Accumulator ───────────────────────────────────────────────────────────────

/// Running state for one bucket.
pub trait Accumulator: Default + Send {
    /// Value contributed by a single record.
    type Input;
    /// Finalized bucket value.
    type Output;

    /// Fold one record into the state.
    fn update(&mut self, input: Self::Input);

    /// Fold another partial state into this one.
    fn combine(&mut self, other: Self);

    /// Final value, or `None` when the state holds no records.
    fn finalize(self) -> Option<Self::Output>;
}

/// Number of records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Count(pub u64);

impl Accumulator for Count {
    type Input = ();
    type Output = u64;

    fn update(&mut self, _: ()) {
        self.0 += 1;
    }

    fn combine(&mut self, other: Self) {
        self.0 += other.0;
    }

    fn finalize(self) -> Option<u64> {
        (self.0 > 0).then_some(self.0)
    }
}

/// Sum and count of a numeric column.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Mean {
    pub sum: f64,
    pub count: u64,
}

impl Mean {
    /// Current mean; `None` before any update.
    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

impl Accumulator for Mean {
    type Input = f64;
    type Output = f64;

    fn update(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn combine(&mut self, other: Self) {
        self.sum += other.sum;
        self.count += other.count;
    }

    fn finalize(self) -> Option<f64> {
        self.mean()
    }
}

// ── BucketMap ─────────────────────────────────────────────────────────────────

/// Accumulators keyed by bucket start time.
///
/// Used both as a worker's partial aggregate and as the merged global
/// aggregate. No ordering is kept until [`BucketMap::into_series`].
#[derive(Debug, Clone)]
pub struct BucketMap<A> {
    buckets: HashMap<i64, A>,
}

impl<A> Default for BucketMap<A> {
    fn default() -> Self {
        Self {
            buckets: HashMap::new(),
        }
    }
}

impl<A: Accumulator> BucketMap<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one record into the bucket starting at `bucket`.
    pub fn record(&mut self, bucket: i64, input: A::Input) {
        self.buckets.entry(bucket).or_default().update(input);
    }

    /// Combine every bucket of `other` into this map.
    pub fn merge(&mut self, other: BucketMap<A>) {
        for (bucket, acc) in other.buckets {
            self.buckets.entry(bucket).or_default().combine(acc);
        }
    }

    /// Merge any number of partial maps into one.
    pub fn merge_all(partials: impl IntoIterator<Item = BucketMap<A>>) -> Self {
        let mut global = Self::new();
        for partial in partials {
            global.merge(partial);
        }
        global
    }

    /// Finalize each bucket and sort ascending by bucket time.
    ///
    /// Buckets whose accumulator finalizes to `None` are dropped.
    pub fn into_series(self) -> Vec<DataPoint<A::Output>> {
        let mut data: Vec<DataPoint<A::Output>> = self
            .buckets
            .into_iter()
            .filter_map(|(timestamp, acc)| {
                acc.finalize().map(|value| DataPoint { timestamp, value })
            })
            .collect();
        data.sort_by_key(|p| p.timestamp);
        data
    }

    pub fn get(&self, bucket: i64) -> Option<&A> {
        self.buckets.get(&bucket)
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
