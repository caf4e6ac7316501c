mod bootstrap;

use std::io::{self, BufWriter, Write};

use anyhow::Result;
use taxis_core::formatting::{format_series, series_to_json};
use taxis_core::models::Series;
use taxis_core::settings::Settings;
use taxis_core::time_utils::resolve_timezone;
use taxis_data::query::run_metric;

fn main() -> Result<()> {
    let settings = Settings::load();

    bootstrap::setup_logging(&settings.log_level)?;

    tracing::info!("taxis v{} starting", env!("CARGO_PKG_VERSION"));

    // Reject bad selectors and bounds before the input is opened.
    let metric = settings.metric()?;
    let opts = settings.query_opts()?;
    let tz = resolve_timezone(&settings.timezone);

    tracing::info!(
        "Metric: {}, workers: {}, interval: {}s, timezone: {}",
        metric,
        opts.workers,
        opts.interval,
        tz
    );

    let series = run_metric(metric, &opts)?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    write_series(&mut out, &series, tz, settings.json_output())?;
    out.flush()?;

    Ok(())
}

/// Print `series` either as text lines or as one JSON document.
fn write_series<W: Write>(
    out: &mut W,
    series: &Series,
    tz: chrono_tz::Tz,
    json: bool,
) -> Result<()> {
    if json {
        writeln!(out, "{}", series_to_json(series)?)?;
    } else {
        for line in format_series(series, tz) {
            writeln!(out, "{}", line)?;
        }
    }
    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────────────────
