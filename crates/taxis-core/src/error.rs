use std::path::PathBuf;
use thiserror::Error;

use crate::record::Field;

/// All errors produced by the trip statistics pipeline.
#[derive(Error, Debug)]
pub enum TripsError {
    /// The input file could not be opened.
    #[error("Can not process file {path}: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading the input failed after it was opened.
    #[error("Failed to read file {path}: {source}")]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A line did not split into the expected number of columns.
    #[error("Malformed line, wanted {expected} comma-separated fields, got {actual}")]
    MalformedRecord { expected: usize, actual: usize },

    /// A requested column could not be converted to its type.
    #[error("Invalid value for {field}: {value:?}")]
    FieldParse { field: Field, value: String },

    /// The metric selector does not name a known aggregation.
    #[error("Unknown metric {0}, wanted counter|distance|fare|tip|total|passengers")]
    UnknownMetric(String),

    /// A date bound could not be parsed.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// The query options can not be executed as given.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// A worker thread panicked before handing off its partial result.
    #[error("Worker thread panicked")]
    WorkerPanicked,

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the taxis crates.
pub type Result<T> = std::result::Result<T, TripsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_source_unavailable() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = TripsError::SourceUnavailable {
            path: PathBuf::from("/data/trips.csv"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Can not process file"));
        assert!(msg.contains("/data/trips.csv"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_error_display_malformed_record() {
        let err = TripsError::MalformedRecord {
            expected: 17,
            actual: 16,
        };
        assert_eq!(
            err.to_string(),
            "Malformed line, wanted 17 comma-separated fields, got 16"
        );
    }

    #[test]
    fn test_error_display_field_parse() {
        let err = TripsError::FieldParse {
            field: Field::TripDistance,
            value: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid value for trip_distance: \"abc\"");
    }

    #[test]
    fn test_error_display_unknown_metric() {
        let err = TripsError::UnknownMetric("median".to_string());
        assert!(err.to_string().starts_with("Unknown metric median"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: TripsError = io_err.into();
        assert!(err.to_string().contains("denied"));
    }
}
