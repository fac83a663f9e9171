//! RCM record export.
//!
//! Writes an [`RcmRecord`] to Parquet or CSV through a polars `DataFrame`,
//! or to JSON through serde. The tabular layout has one row per sample:
//!
//! | column             | type                 |
//! |--------------------|----------------------|
//! | `time_days`        | f64 serial days      |
//! | `datetime`         | Datetime(ms)         |
//! | `speed`            | f64                  |
//! | `direction`        | f64                  |
//! | `u`                | f64                  |
//! | `v`                | f64                  |
//! | `height_above_bed` | f64 (nullable)       |

use crate::config::CompressionAlgorithm;
use crate::error::{CurrentMeterError, Result};
use crate::rcm::RcmRecord;
use clap::ValueEnum;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::{debug, info};

/// Output file format for RCM records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Parquet,
    Csv,
    Json,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 3] = [OutputFormat::Parquet, OutputFormat::Csv, OutputFormat::Json];

    /// File extension without the leading dot
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Parquet => "parquet",
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Writer for RCM records
#[derive(Debug, Clone)]
pub struct RcmWriter {
    format: OutputFormat,
    compression: CompressionAlgorithm,
    overwrite: bool,
}

impl RcmWriter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            compression: CompressionAlgorithm::Snappy,
            overwrite: false,
        }
    }

    /// Parquet compression codec (ignored for other formats)
    pub fn with_compression(mut self, compression: CompressionAlgorithm) -> Self {
        self.compression = compression;
        self
    }

    /// Replace existing output files instead of failing
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Write `record` to `path`, returning the number of rows written
    pub fn write(&self, record: &RcmRecord, path: &Path) -> Result<usize> {
        if path.exists() && !self.overwrite {
            return Err(CurrentMeterError::OutputExists {
                path: path.to_path_buf(),
            });
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        match self.format {
            OutputFormat::Parquet => {
                let mut df = record_to_dataframe(record)?;
                let file = File::create(path)?;
                ParquetWriter::new(file)
                    .with_compression(self.compression.to_polars_compression())
                    .finish(&mut df)?;
            }
            OutputFormat::Csv => {
                let mut df = record_to_dataframe(record)?;
                let mut file = File::create(path)?;
                CsvWriter::new(&mut file)
                    .include_header(true)
                    .finish(&mut df)?;
            }
            OutputFormat::Json => {
                let writer = BufWriter::new(File::create(path)?);
                serde_json::to_writer_pretty(writer, record)?;
            }
        }

        info!(
            "Wrote {} samples of '{}' to {}",
            record.len(),
            record.name,
            path.display()
        );
        Ok(record.len())
    }
}

/// Write `record` to `path` in `format`, refusing to replace an existing file
pub fn write_rcm_record(record: &RcmRecord, path: &Path, format: OutputFormat) -> Result<usize> {
    RcmWriter::new(format).write(record, path)
}

/// Tabular form of an RCM record
pub fn record_to_dataframe(record: &RcmRecord) -> Result<DataFrame> {
    let rows = record.len();
    let datetime = Column::new("datetime".into(), record.time_millis())
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;

    let mut df = df!(
        "time_days" => record.time.as_slice(),
        "speed" => record.speed.as_slice(),
        "direction" => record.direction.as_slice(),
        "u" => record.u.as_slice(),
        "v" => record.v.as_slice(),
        "height_above_bed" => vec![record.height_above_bed; rows],
    )?;
    df.insert_column(1, datetime)?;

    debug!("Built {}x{} frame for '{}'", df.height(), df.width(), record.name);
    Ok(df)
}
