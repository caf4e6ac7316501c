use clap::Parser;
use std::path::PathBuf;

use crate::error::Result;
use crate::models::{Metric, QueryOpts};
use crate::time_utils::parse_date_bound;

/// Default location of the 2018 yellow taxi dataset.
pub const DEFAULT_DATA_PATH: &str = "data/2018_Yellow_Taxi_Trip_Data.csv";

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Time-bucketed statistics over NYC yellow taxi trips
#[derive(Parser, Debug, Clone)]
#[command(
    name = "taxis",
    about = "Time-bucketed statistics over NYC yellow taxi trips",
    version
)]
pub struct Settings {
    /// CSV file with the trip data
    #[arg(default_value = DEFAULT_DATA_PATH)]
    pub path: PathBuf,

    /// Metric to compute: counter|distance|fare|tip|total|passengers
    #[arg(long, default_value = "counter")]
    pub metric: String,

    /// Number of parsing threads (0 or less uses every CPU)
    #[arg(short = 'g', long, default_value = "0", allow_negative_numbers = true)]
    pub workers: i64,

    /// Bucket width in seconds
    #[arg(long, default_value = "86400")]
    pub interval: i64,

    /// Ignore trips picked up before this date (YYYY-MM-DD or RFC 3339)
    #[arg(long)]
    pub from: Option<String>,

    /// Ignore trips picked up after this date (YYYY-MM-DD or RFC 3339)
    #[arg(long)]
    pub to: Option<String>,

    /// Timezone used to print bucket times ("auto" for the system zone)
    #[arg(long, default_value = "UTC")]
    pub timezone: String,

    /// Output format
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse the process arguments and apply the `--debug` flag.
    pub fn load() -> Self {
        Self::resolve(Settings::parse())
    }

    /// Same as [`Settings::load`] but with an explicit argument list.
    pub fn load_from_args<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::resolve(Settings::parse_from(args))
    }

    fn resolve(mut settings: Settings) -> Settings {
        // --debug overrides log level.
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }

    /// The selected metric; fails with `UnknownMetric` for anything else.
    pub fn metric(&self) -> Result<Metric> {
        self.metric.parse()
    }

    /// `true` when JSON output was requested.
    pub fn json_output(&self) -> bool {
        self.format == "json"
    }

    /// Build the query options, resolving the worker default and date bounds.
    pub fn query_opts(&self) -> Result<QueryOpts> {
        let mut opts = QueryOpts::new(&self.path, resolve_workers(self.workers), self.interval);
        if let Some(from) = &self.from {
            opts = opts.with_from_date(parse_date_bound(from)?);
        }
        if let Some(to) = &self.to {
            opts = opts.with_to_date(parse_date_bound(to)?);
        }
        opts.validate()?;
        Ok(opts)
    }
}

/// Map a requested worker count to a usable one: values `<= 0` mean one
/// worker per available CPU.
pub fn resolve_workers(requested: i64) -> usize {
    if requested <= 0 {
        num_cpus::get().max(1)
    } else {
        usize::try_from(requested).unwrap_or(usize::MAX)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
