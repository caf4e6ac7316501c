//! Core types for the taxis trip statistics tool.
//!
//! Holds the error taxonomy, the trip record model and its selective CSV line
//! parser, query and output models, time helpers, CLI settings and output
//! formatting. The concurrent pipeline lives in `taxis-data`.

pub mod error;
pub mod formatting;
pub mod models;
pub mod record;
pub mod settings;
pub mod time_utils;

pub use error::{Result, TripsError};
