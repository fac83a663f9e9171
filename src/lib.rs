//! Current-Meter Processor Library
//!
//! Parses fixed-format current-meter survey files into normalized current
//! time series and converts them into RCM records for downstream benthic
//! modelling.
//!
//! This library provides tools for:
//! - Parsing one- or two-block current-meter files (SNS then NSN)
//! - Deriving eastward/northward velocity components from speed and direction
//! - Anchoring sample positions on a calendar time axis
//! - Summary statistics, speed scaling and explicit unit conversion
//! - Writing RCM records as Parquet, CSV or JSON, one file at a time or in
//!   concurrent batches
//!
//! ```no_run
//! use current_meter_processor::{RcmConverter, parse_current_meter_file};
//! use std::path::Path;
//!
//! let (sns, nsn) = parse_current_meter_file(Path::new("survey.dat"))?;
//! let record = RcmConverter::convert(&sns, None)?;
//! println!("{} samples, {:?} m above bed", record.len(), record.height_above_bed);
//! if let Some(nsn) = nsn {
//!     println!("NSN block: {}", nsn.name());
//! }
//! # Ok::<(), current_meter_processor::CurrentMeterError>(())
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod header;
pub mod models;
pub mod parser;
pub mod processor;
pub mod rcm;
pub mod series;
pub mod writer;

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use config::ProcessorConfig;
pub use error::{CurrentMeterError, Result};
pub use models::{BatchStats, SeriesSummary};
pub use parser::{parse_current_meter_file, parse_current_meter_str};
pub use processor::BatchProcessor;
pub use rcm::{RcmConverter, RcmRecord};
pub use series::{CurrentTimeSeries, SeriesOptions};
pub use writer::{OutputFormat, write_rcm_record};
