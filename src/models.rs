//! Reporting types shared by the batch processor and the CLI.

use crate::error::Result;
use crate::series::{CurrentTimeSeries, SpeedStatistics};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Block role within a two-block file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockRole {
    Sns,
    Nsn,
}

impl BlockRole {
    pub fn of(series: &CurrentTimeSeries) -> Self {
        if series.is_sns() {
            BlockRole::Sns
        } else {
            BlockRole::Nsn
        }
    }
}

/// Per-block summary printed by `inspect`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSummary {
    pub role: BlockRole,
    pub name: String,
    pub variable: String,
    pub number_of_time_steps: usize,
    pub delta_t: Option<f64>,
    pub meter_depth: Option<f64>,
    pub site_depth: Option<f64>,
    pub site_tide: Option<f64>,
    pub height_above_bed: Option<f64>,
    /// Absent for empty blocks
    pub speed: Option<SpeedStatistics>,
    pub residual_current: Option<(f64, f64)>,
    pub residual_direction: Option<f64>,
}

impl SeriesSummary {
    pub fn from_series(series: &CurrentTimeSeries) -> Self {
        Self {
            role: BlockRole::of(series),
            name: series.name().to_string(),
            variable: series.variable().to_string(),
            number_of_time_steps: series.number_of_time_steps(),
            delta_t: series.delta_t(),
            meter_depth: series.meter_depth(),
            site_depth: series.site_depth(),
            site_tide: series.site_tide(),
            height_above_bed: series.height_above_bed().ok(),
            speed: series.speed_statistics().ok(),
            residual_current: series.residual_current().ok(),
            residual_direction: series.residual_direction().ok(),
        }
    }
}

/// Outcome of converting one input file
#[derive(Debug, Clone, Default)]
pub struct FileOutcome {
    pub input: PathBuf,
    /// Output files with the number of samples written to each
    pub outputs: Vec<(PathBuf, usize)>,
}

impl FileOutcome {
    pub fn samples_written(&self) -> usize {
        self.outputs.iter().map(|(_, rows)| rows).sum()
    }
}

/// Processing statistics for a batch run
#[derive(Debug, Default, Clone, Serialize)]
pub struct BatchStats {
    pub files_processed: usize,
    pub files_failed: usize,
    pub blocks_written: usize,
    pub samples_written: usize,
    pub outputs: Vec<PathBuf>,
    /// One message per failed file
    pub errors: Vec<String>,
    pub processing_time_ms: u128,
}

impl BatchStats {
    /// Fold one file result into the totals
    pub fn record(&mut self, input: &std::path::Path, result: Result<FileOutcome>) {
        match result {
            Ok(outcome) => {
                self.files_processed += 1;
                self.blocks_written += outcome.outputs.len();
                self.samples_written += outcome.samples_written();
                self.outputs
                    .extend(outcome.outputs.into_iter().map(|(path, _)| path));
            }
            Err(e) => {
                self.files_failed += 1;
                self.errors.push(format!("{}: {}", input.display(), e));
            }
        }
    }

    pub fn has_failures(&self) -> bool {
        self.files_failed > 0
    }
}
