//! Command implementations for the current-meter CLI
//!
//! This module contains command execution, logging setup, configuration
//! layering and the human/JSON reports printed after each command.

use crate::cli::args::{Args, Commands, ConvertArgs, InspectArgs};
use crate::config::ProcessorConfig;
use crate::models::{BatchStats, BlockRole, SeriesSummary};
use crate::parser::parse_current_meter_file;
use crate::processor::BatchProcessor;
use anyhow::{Context, Result};
use colored::*;
use indicatif::HumanDuration;
use std::time::Duration;
use tracing::{debug, info};

/// Main command runner
///
/// Sets up logging, then dispatches to the selected subcommand.
pub async fn run(args: Args) -> Result<()> {
    setup_logging(&args)?;
    debug!("Command line arguments: {:?}", args);

    match &args.command {
        Some(Commands::Inspect(inspect)) => run_inspect(inspect).await,
        Some(Commands::Convert(convert)) => {
            let stats = run_convert(&args, convert).await?;
            if stats.has_failures() {
                anyhow::bail!(
                    "{} of {} files failed to convert",
                    stats.files_failed,
                    stats.files_failed + stats.files_processed
                );
            }
            Ok(())
        }
        None => Ok(()),
    }
}

/// Set up structured logging based on CLI arguments
pub fn setup_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("current_meter_processor={}", log_level)));

    if args.quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()
            .context("Failed to initialise logging")?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .context("Failed to initialise logging")?;
    }

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}

/// Load configuration using the layered approach (defaults -> file -> args)
pub fn load_configuration(args: &Args, convert: &ConvertArgs) -> Result<ProcessorConfig> {
    convert.validate()?;

    let config = ProcessorConfig::load(args.config_file.as_deref())
        .context("Failed to load configuration")?;
    let config = convert.apply_to(config);
    config.validate()?;

    debug!("Loaded configuration: {:?}", config);
    Ok(config)
}

/// Parse one file and print its block summaries
async fn run_inspect(inspect: &InspectArgs) -> Result<()> {
    let path = inspect.file.clone();
    let (primary, secondary) =
        tokio::task::spawn_blocking(move || parse_current_meter_file(&path))
            .await
            .context("Inspect task failed")?
            .with_context(|| format!("Failed to parse {}", inspect.file.display()))?;

    let summaries: Vec<SeriesSummary> = std::iter::once(&primary)
        .chain(secondary.as_ref())
        .map(SeriesSummary::from_series)
        .collect();

    if inspect.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        print_summaries(&inspect.file, &summaries);
    }
    Ok(())
}

/// Discover inputs and run the batch conversion
async fn run_convert(args: &Args, convert: &ConvertArgs) -> Result<BatchStats> {
    let config = load_configuration(args, convert)?;
    let dry_run = config.dry_run;

    let processor = BatchProcessor::new(config)?.with_progress(args.show_progress());
    let inputs = processor.discover_inputs(&convert.inputs)?;
    info!("Found {} input files", inputs.len());

    if inputs.is_empty() {
        if !args.quiet {
            println!("{}", "No current-meter files found".bright_yellow());
        }
        return Ok(BatchStats::default());
    }

    let stats = processor.process(&inputs).await?;

    if !args.quiet {
        print_batch_report(&stats, dry_run);
    }
    Ok(stats)
}

fn print_summaries(path: &std::path::Path, summaries: &[SeriesSummary]) {
    println!("{} {}", "File:".bright_cyan(), path.display());

    for summary in summaries {
        let role = match summary.role {
            BlockRole::Sns => "SNS",
            BlockRole::Nsn => "NSN",
        };
        println!(
            "\n{} {}",
            format!("[{}]", role).bright_green().bold(),
            summary.name.bright_white().bold()
        );
        println!("  {} {}", "Variable:".bright_cyan(), summary.variable);
        println!(
            "  {} {}",
            "Time steps:".bright_cyan(),
            summary.number_of_time_steps
        );
        println!("  {} {}", "DeltaT (s):".bright_cyan(), optional(summary.delta_t));
        println!(
            "  {} {}",
            "Meter depth:".bright_cyan(),
            optional(summary.meter_depth)
        );
        println!(
            "  {} {}",
            "Site depth:".bright_cyan(),
            optional(summary.site_depth)
        );
        println!("  {} {}", "Site tide:".bright_cyan(), optional(summary.site_tide));
        println!(
            "  {} {}",
            "Height above bed:".bright_cyan(),
            optional(summary.height_above_bed)
        );

        match &summary.speed {
            Some(speed) => {
                println!(
                    "  {} mean {:.4}, min {:.4}, max {:.4}, std {:.4}",
                    "Speed:".bright_cyan(),
                    speed.mean,
                    speed.min,
                    speed.max,
                    speed.std_dev
                );
                if let (Some((u, v)), Some(direction)) =
                    (summary.residual_current, summary.residual_direction)
                {
                    println!(
                        "  {} u {:.4}, v {:.4}, towards {:.1}°",
                        "Residual:".bright_cyan(),
                        u,
                        v,
                        direction
                    );
                }
            }
            None => println!("  {}", "No samples".bright_yellow()),
        }
    }
}

fn optional(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// Print the colored summary after a batch
fn print_batch_report(stats: &BatchStats, dry_run: bool) {
    let title = if dry_run {
        "Dry Run Summary"
    } else {
        "Conversion Summary"
    };
    println!("\n{}", title.bright_green().bold());
    println!(
        "  {} {}",
        "Time elapsed:".bright_cyan(),
        HumanDuration(Duration::from_millis(stats.processing_time_ms as u64))
    );
    println!(
        "  {} {}",
        "Files processed:".bright_cyan(),
        stats.files_processed.to_string().bright_white()
    );
    if stats.files_failed > 0 {
        println!(
            "  {} {}",
            "Files failed:".bright_red(),
            stats.files_failed.to_string().bright_red().bold()
        );
    }
    println!(
        "  {} {}",
        "Blocks written:".bright_cyan(),
        stats.blocks_written.to_string().bright_white().bold()
    );
    println!(
        "  {} {}",
        "Samples written:".bright_cyan(),
        stats.samples_written.to_string().bright_white()
    );

    if !stats.outputs.is_empty() {
        let label = if dry_run { "Would write:" } else { "Output files:" };
        println!("\n{}", label.bright_cyan());
        for output in &stats.outputs {
            println!("  • {}", output.display());
        }
    }

    if !stats.errors.is_empty() {
        println!("\n{}", "Errors:".bright_red());
        for error in &stats.errors {
            println!("  • {}", error);
        }
    }
}
