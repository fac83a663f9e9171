//! Configuration management and validation.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! command-line overrides applied through the `with_*` builder methods.
//! [`ProcessorConfig::validate`] runs once all layers are applied.

use crate::constants::{CONFIG_DIR_NAME, CONFIG_FILE_NAME, MAX_WORKERS, default_workers};
use crate::error::{CurrentMeterError, Result};
use crate::rcm::parse_anchor;
use crate::writer::OutputFormat;
use polars::prelude::ParquetCompression;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Supported compression algorithms for parquet files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionAlgorithm {
    /// Snappy compression - good balance of speed and compression
    Snappy,
    /// ZSTD compression - better compression ratio, slower
    Zstd,
    /// LZ4 compression - fastest, lower compression ratio
    Lz4,
    /// No compression
    Uncompressed,
}

impl CompressionAlgorithm {
    /// Convert to polars ParquetCompression type
    pub fn to_polars_compression(&self) -> ParquetCompression {
        match self {
            CompressionAlgorithm::Snappy => ParquetCompression::Snappy,
            CompressionAlgorithm::Zstd => ParquetCompression::Zstd(None),
            CompressionAlgorithm::Lz4 => ParquetCompression::Lz4Raw,
            CompressionAlgorithm::Uncompressed => ParquetCompression::Uncompressed,
        }
    }
}

/// How parsed series are turned into RCM records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Calendar time of the first sample (ISO date/datetime or serial days).
    /// `None` uses 2010-01-01T00:00:00.
    pub anchor: Option<String>,

    /// Factor applied to every speed before export
    pub speed_scale: f64,

    /// Apply the series' unit conversion factors before export
    pub apply_unit_conversion: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            anchor: None,
            speed_scale: 1.0,
            apply_unit_conversion: false,
        }
    }
}

/// Where and how records are written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,

    /// Output directory; `None` writes next to each input file
    pub directory: Option<PathBuf>,

    /// Replace existing output files
    pub overwrite: bool,

    /// Parquet compression codec
    pub compression: CompressionAlgorithm,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Parquet,
            directory: None,
            overwrite: false,
            compression: CompressionAlgorithm::Snappy,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Number of files converted concurrently
    pub workers: usize,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
        }
    }
}

/// Global configuration for current-meter processing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    pub conversion: ConversionConfig,
    pub output: OutputConfig,
    pub performance: PerformanceConfig,

    /// Parse inputs and report planned outputs without writing them
    #[serde(skip)]
    pub dry_run: bool,
}

impl ProcessorConfig {
    /// Parse configuration from TOML text. Missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| CurrentMeterError::configuration(format!("invalid config file: {}", e)))
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CurrentMeterError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content).map_err(|e| {
            CurrentMeterError::configuration(format!("{}: {}", path.display(), e))
        })?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load the explicit file if given, otherwise the user config file if it
    /// exists, otherwise the defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => {
                    debug!("No config file found, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    /// Serialize to TOML, e.g. to seed a user config file
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| CurrentMeterError::configuration(format!("cannot serialize config: {}", e)))
    }

    /// Check every setting, resolving the anchor once
    pub fn validate(&self) -> Result<()> {
        let workers = self.performance.workers;
        if workers == 0 || workers > MAX_WORKERS {
            return Err(CurrentMeterError::configuration(format!(
                "workers must be between 1 and {}, got {}",
                MAX_WORKERS, workers
            )));
        }
        if !self.conversion.speed_scale.is_finite() {
            return Err(CurrentMeterError::configuration(format!(
                "speed_scale must be finite, got {}",
                self.conversion.speed_scale
            )));
        }
        self.anchor_days()?;
        Ok(())
    }

    /// Configured anchor in serial days, if one is set
    pub fn anchor_days(&self) -> Result<Option<f64>> {
        self.conversion.anchor.as_deref().map(parse_anchor).transpose()
    }

    /// Set the time anchor of the first sample
    pub fn with_anchor(mut self, anchor: impl Into<String>) -> Self {
        self.conversion.anchor = Some(anchor.into());
        self
    }

    /// Set the factor applied to every speed
    pub fn with_speed_scale(mut self, scale: f64) -> Self {
        self.conversion.speed_scale = scale;
        self
    }

    /// Apply unit conversion factors before export
    pub fn with_unit_conversion(mut self) -> Self {
        self.conversion.apply_unit_conversion = true;
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.output.format = format;
        self
    }

    /// Write all outputs into `directory`
    pub fn with_output_dir(mut self, directory: impl Into<PathBuf>) -> Self {
        self.output.directory = Some(directory.into());
        self
    }

    /// Replace existing output files
    pub fn with_overwrite(mut self) -> Self {
        self.output.overwrite = true;
        self
    }

    pub fn with_compression(mut self, compression: CompressionAlgorithm) -> Self {
        self.output.compression = compression;
        self
    }

    /// Create configuration with custom worker count
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.performance.workers = workers;
        self
    }

    /// Enable dry-run mode
    pub fn with_dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }
}

/// Per-user config file location, when the platform has a config directory
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}
