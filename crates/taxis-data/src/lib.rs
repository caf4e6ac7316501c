//! Concurrent aggregation pipeline for taxis.
//!
//! Streams the trip CSV line by line, fans the lines out to a fixed pool of
//! worker threads that parse and partially aggregate them, then merges the
//! partial results into one sorted time series.

pub mod aggregator;
pub mod pool;
pub mod query;
pub mod stream;
