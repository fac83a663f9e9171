//! Batch conversion of current-meter files into RCM records.
//!
//! Orchestrates input discovery, parsing, optional unit conversion and speed
//! scaling, RCM conversion and export. Files are converted concurrently on
//! the blocking thread pool; a failing file is counted and reported without
//! stopping the batch. Inputs whose output names clash with those of an
//! earlier input are rejected before any work starts.

pub mod discovery;

#[cfg(test)]
pub mod tests;

use crate::config::ProcessorConfig;
use crate::constants::{NSN_SUFFIX, SNS_SUFFIX};
use crate::error::{CurrentMeterError, Result};
use crate::models::{BatchStats, BlockRole, FileOutcome};
use crate::parser::parse_current_meter_file;
use crate::rcm::RcmConverter;
use crate::series::CurrentTimeSeries;
use crate::writer::RcmWriter;

use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::task;
use tracing::{debug, error, info, warn};

/// Batch processor for current-meter files
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    config: Arc<ProcessorConfig>,
    anchor: Option<f64>,
    show_progress: bool,
}

impl BatchProcessor {
    /// Create a processor, validating `config` and resolving its anchor
    pub fn new(config: ProcessorConfig) -> Result<Self> {
        config.validate()?;
        let anchor = config.anchor_days()?;
        Ok(Self {
            config: Arc::new(config),
            anchor,
            show_progress: false,
        })
    }

    /// Show an indicatif progress bar while processing
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Resolve files, directories and glob patterns into input files
    pub fn discover_inputs(&self, inputs: &[String]) -> Result<Vec<PathBuf>> {
        discovery::discover_inputs(inputs)
    }

    /// Convert every input, `workers` files at a time
    pub async fn process(&self, inputs: &[PathBuf]) -> Result<BatchStats> {
        let start_time = Instant::now();
        let workers = self.config.performance.workers;
        info!(
            "Converting {} files with {} workers{}",
            inputs.len(),
            workers,
            if self.config.dry_run { " (dry run)" } else { "" }
        );

        let (accepted, rejected) = self.plan_outputs(inputs);
        let progress_bar = self.progress_bar(accepted.len());

        let results = stream::iter(accepted)
            .map(|input| {
                let processor = self.clone();
                let progress_bar = progress_bar.clone();
                async move {
                    let task_input = input.clone();
                    let result = task::spawn_blocking(move || processor.convert_file(&task_input))
                        .await
                        .map_err(|e| CurrentMeterError::ProcessingFailed {
                            path: input.clone(),
                            reason: format!("conversion task failed: {}", e),
                        })
                        .and_then(|result| result);
                    progress_bar.inc(1);
                    (input, result)
                }
            })
            .buffer_unordered(workers)
            .collect::<Vec<_>>()
            .await;

        progress_bar.finish_and_clear();

        let mut stats = BatchStats::default();
        let rejected = rejected
            .into_iter()
            .map(|(input, e)| (input, Err::<FileOutcome, _>(e)));
        for (input, result) in results.into_iter().chain(rejected) {
            if let Err(e) = &result {
                error!("Failed to convert {}: {}", input.display(), e);
            }
            stats.record(&input, result);
        }
        stats.outputs.sort();
        stats.errors.sort();
        stats.processing_time_ms = start_time.elapsed().as_millis();

        info!(
            "Converted {} files ({} failed), {} blocks written in {}ms",
            stats.files_processed, stats.files_failed, stats.blocks_written, stats.processing_time_ms
        );
        Ok(stats)
    }

    /// Parse one file and write one output per block
    ///
    /// Every block is converted and every output path checked before the
    /// first file is written, so a refused output leaves nothing behind.
    pub fn convert_file(&self, input: &Path) -> Result<FileOutcome> {
        let (primary, secondary) = parse_current_meter_file(input)?;

        let blocks = std::iter::once(primary)
            .chain(secondary)
            .map(|series| {
                let series = self.prepare(series)?;
                let record = RcmConverter::convert(&series, self.anchor)?;
                Ok((self.output_path(input, BlockRole::of(&series)), record))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut outcome = FileOutcome {
            input: input.to_path_buf(),
            outputs: Vec::with_capacity(blocks.len()),
        };
        let overwrite = self.config.output.overwrite;

        if self.config.dry_run {
            for (output, record) in blocks {
                if output.exists() && !overwrite {
                    warn!("Would refuse to overwrite {}", output.display());
                }
                info!("Would write {} samples to {}", record.len(), output.display());
                outcome.outputs.push((output, record.len()));
            }
            return Ok(outcome);
        }

        if !overwrite {
            if let Some((existing, _)) = blocks.iter().find(|(output, _)| output.exists()) {
                return Err(CurrentMeterError::OutputExists {
                    path: existing.clone(),
                });
            }
        }

        let writer = RcmWriter::new(self.config.output.format)
            .with_compression(self.config.output.compression)
            .with_overwrite(overwrite);
        for (output, record) in blocks {
            let rows = writer.write(&record, &output)?;
            outcome.outputs.push((output, rows));
        }

        debug!(
            "Converted {} into {} output(s)",
            input.display(),
            outcome.outputs.len()
        );
        Ok(outcome)
    }

    /// Output location for one block of `input`
    pub fn output_path(&self, input: &Path, role: BlockRole) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "current_meter".to_string());
        let suffix = match role {
            BlockRole::Sns => SNS_SUFFIX,
            BlockRole::Nsn => NSN_SUFFIX,
        };
        let file_name = format!(
            "{}_{}.{}",
            stem,
            suffix,
            self.config.output.format.extension()
        );

        match &self.config.output.directory {
            Some(directory) => directory.join(file_name),
            None => input
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(file_name),
        }
    }

    /// Split `inputs` into files with distinct output paths and files whose
    /// outputs would replace those of an earlier input. Repeated inputs are
    /// converted once.
    fn plan_outputs(&self, inputs: &[PathBuf]) -> (Vec<PathBuf>, Vec<(PathBuf, CurrentMeterError)>) {
        let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::new();
        let mut seen = HashSet::new();
        let mut accepted = Vec::with_capacity(inputs.len());
        let mut rejected = Vec::new();

        for input in inputs {
            if !seen.insert(input.clone()) {
                debug!("Ignoring repeated input {}", input.display());
                continue;
            }

            let outputs = [BlockRole::Sns, BlockRole::Nsn].map(|role| self.output_path(input, role));
            let clash = outputs
                .iter()
                .find_map(|output| claimed.get(output).map(|other| (output.clone(), other.clone())));

            match clash {
                Some((output, other)) => rejected.push((
                    input.clone(),
                    CurrentMeterError::OutputCollision {
                        path: input.clone(),
                        output,
                        other,
                    },
                )),
                None => {
                    for output in outputs {
                        claimed.insert(output, input.clone());
                    }
                    accepted.push(input.clone());
                }
            }
        }

        (accepted, rejected)
    }

    /// Apply unit conversion and speed scaling from the configuration
    fn prepare(&self, series: CurrentTimeSeries) -> Result<CurrentTimeSeries> {
        let mut series = if self.config.conversion.apply_unit_conversion {
            series.to_si()?
        } else {
            series
        };

        let scale = self.config.conversion.speed_scale;
        if scale != 1.0 {
            series.scale_speed(scale);
        }
        Ok(series)
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let progress_bar = ProgressBar::new(len as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        progress_bar.set_style(style);
        progress_bar.set_message("Converting current-meter files");
        progress_bar
    }
}
