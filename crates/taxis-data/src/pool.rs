//! Fixed-size worker pool fed by a [`LineStreamer`].
//!
//! One producer thread streams lines through a zero-capacity channel; `G`
//! worker threads compete for them, so faster workers simply take more lines.
//! Each worker returns one partial result, which is handed to the caller
//! through a completion channel with exactly `G` slots.

use std::io::BufRead;
use std::thread;

use crossbeam_channel::{bounded, Receiver};
use taxis_core::error::{Result, TripsError};
use tracing::{debug, error};

use crate::stream::{LineStreamer, StreamSummary};

/// Everything the pool produced once all threads have finished.
#[derive(Debug)]
pub struct PoolOutput<P> {
    /// One partial per worker, in completion order.
    pub partials: Vec<P>,
    /// How the producer finished.
    pub stream: StreamSummary,
}

/// Run `work` on `workers` threads over the lines of `streamer`.
///
/// `work` receives the worker id and the shared line receiver; it should
/// drain the receiver and return its partial result. This function returns
/// only after the producer and every worker have been joined.
///
/// A value of `0` for `workers` is treated as 1.
///
/// # Errors
/// * [`TripsError::SourceRead`] when the input fails mid-stream.
/// * [`TripsError::WorkerPanicked`] when any thread panicked.
/// * [`TripsError::Io`] when a thread could not be spawned.
pub fn process_lines<R, P, F>(
    streamer: LineStreamer<R>,
    workers: usize,
    work: F,
) -> Result<PoolOutput<P>>
where
    R: BufRead + Send,
    P: Send,
    F: Fn(usize, &Receiver<String>) -> P + Sync,
{
    let workers = workers.max(1);

    // Rendezvous: the producer blocks until some worker is ready.
    let (line_tx, line_rx) = bounded::<String>(0);
    // Every worker contributes exactly one partial, so sends never block.
    let (done_tx, done_rx) = bounded::<P>(workers);

    let stream = thread::scope(|s| -> Result<StreamSummary> {
        let producer = thread::Builder::new()
            .name("trips-stream".to_string())
            .spawn_scoped(s, move || streamer.run(line_tx))?;

        let work = &work;
        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers {
            let rx = line_rx.clone();
            let tx = done_tx.clone();
            let handle = thread::Builder::new()
                .name(format!("trips-worker-{id}"))
                .spawn_scoped(s, move || {
                    let partial = work(id, &rx);
                    // The receiver outlives the scope, so this can not fail.
                    let _ = tx.send(partial);
                })?;
            handles.push(handle);
        }
        drop(line_rx);
        drop(done_tx);

        let mut panicked = 0usize;
        for (id, handle) in handles.into_iter().enumerate() {
            if handle.join().is_err() {
                error!("worker {} panicked", id);
                panicked += 1;
            }
        }

        let summary = producer.join().map_err(|_| {
            error!("line streamer panicked");
            TripsError::WorkerPanicked
        })??;

        if panicked > 0 {
            return Err(TripsError::WorkerPanicked);
        }
        Ok(summary)
    })?;

    let partials: Vec<P> = done_rx.try_iter().collect();
    debug_assert_eq!(partials.len(), workers);
    debug!(
        "{} workers finished over {} lines",
        partials.len(),
        stream.lines
    );

    Ok(PoolOutput { partials, stream })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
