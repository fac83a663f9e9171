//! Command-line argument definitions for the current-meter processor
//!
//! This module defines the CLI interface using the clap derive API.

use crate::config::ProcessorConfig;
use crate::constants::MAX_WORKERS;
use crate::error::{CurrentMeterError, Result};
use crate::writer::OutputFormat;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for the current-meter processor
///
/// Parses fixed-format current-meter files into speed/direction time
/// series and exports them as RCM records.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "current-meter",
    version,
    about = "Parse current-meter files and convert them to RCM records",
    long_about = "Reads one- or two-block current-meter files (SNS then NSN), derives \
                  eastward/northward velocity components, anchors each series on a \
                  calendar time axis and writes RCM records as Parquet, CSV or JSON."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Suppress output (quiet mode)
    ///
    /// Only show errors. Overrides verbose settings and hides progress bars.
    #[arg(
        short = 'q',
        long = "quiet",
        global = true,
        help = "Suppress output except errors",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,

    /// Path to configuration file
    ///
    /// TOML configuration file. If not specified, looks for
    /// <config dir>/current-meter-processor/config.toml
    #[arg(
        short = 'c',
        long = "config",
        global = true,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    pub config_file: Option<PathBuf>,
}

/// Available subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Parse one file and print per-block metadata and statistics
    Inspect(InspectArgs),
    /// Convert files to RCM records
    Convert(ConvertArgs),
}

/// Arguments for the inspect command
#[derive(Debug, Clone, ClapArgs)]
pub struct InspectArgs {
    /// Current-meter file to inspect
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Print the summary as JSON
    #[arg(long = "json")]
    pub json: bool,
}

/// Arguments for the convert command
#[derive(Debug, Clone, Default, ClapArgs)]
pub struct ConvertArgs {
    /// Input files, directories or glob patterns
    ///
    /// Directories are walked recursively for .dat, .txt and .csv files.
    #[arg(value_name = "INPUT", required = true)]
    pub inputs: Vec<String>,

    /// Output directory (defaults to each input's directory)
    #[arg(short = 'o', long = "output", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output file format
    #[arg(long = "format", value_enum)]
    pub format: Option<OutputFormat>,

    /// Calendar time of the first sample
    ///
    /// ISO date or datetime (2010-01-01, 2010-01-01T00:00:00) or serial
    /// days since 1970-01-01. Defaults to 2010-01-01T00:00:00.
    #[arg(long = "anchor", value_name = "TIME")]
    pub anchor: Option<String>,

    /// Multiply every speed by this factor before export
    ///
    /// Negative factors reverse the flow sense of u and v.
    #[arg(long = "scale", value_name = "FACTOR", allow_negative_numbers = true)]
    pub scale: Option<f64>,

    /// Apply the series' unit conversion factors before export
    #[arg(long = "si")]
    pub si: bool,

    /// Number of files converted concurrently
    #[arg(short = 'j', long = "workers", value_name = "COUNT")]
    pub workers: Option<usize>,

    /// Force overwrite of existing output files
    #[arg(long = "force")]
    pub force_overwrite: bool,

    /// Show what would be written without creating output files
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

impl Args {
    /// Determine the appropriate log level based on verbosity flags
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }

    /// Check if we should show progress bars (not in quiet mode)
    pub fn show_progress(&self) -> bool {
        !self.quiet
    }
}

impl ConvertArgs {
    /// Validate argument values that clap cannot check on its own
    pub fn validate(&self) -> Result<()> {
        if let Some(workers) = self.workers {
            if workers == 0 || workers > MAX_WORKERS {
                return Err(CurrentMeterError::configuration(format!(
                    "Number of workers must be between 1 and {}",
                    MAX_WORKERS
                )));
            }
        }

        if let Some(scale) = self.scale {
            if !scale.is_finite() {
                return Err(CurrentMeterError::configuration(
                    "Speed scale must be a finite number",
                ));
            }
        }

        if let Some(output_dir) = &self.output_dir {
            if output_dir.exists() && !output_dir.is_dir() {
                return Err(CurrentMeterError::configuration(format!(
                    "Output path is not a directory: {}",
                    output_dir.display()
                )));
            }
        }

        Ok(())
    }

    /// Apply CLI overrides on top of a loaded configuration
    pub fn apply_to(&self, mut config: ProcessorConfig) -> ProcessorConfig {
        if let Some(output_dir) = &self.output_dir {
            config = config.with_output_dir(output_dir);
        }
        if let Some(format) = self.format {
            config = config.with_format(format);
        }
        if let Some(anchor) = &self.anchor {
            config = config.with_anchor(anchor.clone());
        }
        if let Some(scale) = self.scale {
            config = config.with_speed_scale(scale);
        }
        if self.si {
            config = config.with_unit_conversion();
        }
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        if self.force_overwrite {
            config = config.with_overwrite();
        }
        if self.dry_run {
            config = config.with_dry_run();
        }
        config
    }
}
