//! Application constants for the current-meter processor
//!
//! This module contains time-axis constants, file-format markers, header key
//! aliases and default values used throughout the processor.

// =============================================================================
// Time Axis
// =============================================================================

/// Seconds in one calendar day, used to turn sampling intervals into days
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Default time anchor: 2010-01-01T00:00:00 expressed in serial days
/// since 1970-01-01T00:00:00
pub const DEFAULT_ANCHOR_DAYS: f64 = 14_610.0;

/// Milliseconds in one calendar day
pub const MILLIS_PER_DAY: f64 = 86_400_000.0;

// =============================================================================
// File Format
// =============================================================================

/// Marker line that opens a data section (optional in the file)
pub const DATA_MARKER: &str = "data";

/// Marker line that closes a data section (optional in the file)
pub const END_DATA_MARKER: &str = "end data";

/// Line prefixes treated as comments
pub const COMMENT_PREFIXES: &[char] = &['#', '%'];

/// Maximum number of header+data blocks in one file
pub const MAX_BLOCKS_PER_FILE: usize = 2;

/// Number of numeric columns in a data row (time, speed, direction)
pub const DATA_ROW_COLUMNS: usize = 3;

/// Header keys and their accepted aliases, after normalization
/// (lowercase, alphanumerics only, unit suffixes stripped)
pub mod header_keys {
    pub const NAME: &[&str] = &["name", "sitename", "site"];
    pub const VARIABLE: &[&str] = &["variable", "var"];
    pub const METER_DEPTH: &[&str] = &["meterdepth", "instrumentdepth"];
    pub const SITE_DEPTH: &[&str] = &["sitedepth", "waterdepth", "bathymetry"];
    pub const DELTA_T: &[&str] = &["deltat", "timestep", "samplinginterval"];
    pub const NUMBER_OF_TIME_STEPS: &[&str] = &["numberoftimesteps", "nsteps", "steps"];
    pub const SITE_TIDE: &[&str] = &["sitetide", "tide"];
}

// =============================================================================
// Batch Processing
// =============================================================================

/// File extensions picked up when an input directory is walked
pub const INPUT_EXTENSIONS: &[&str] = &["dat", "txt", "csv"];

/// Output file suffix for the first (SNS) block of a file
pub const SNS_SUFFIX: &str = "sns";

/// Output file suffix for the second (NSN) block of a file
pub const NSN_SUFFIX: &str = "nsn";

/// Upper bound for configured worker count
pub const MAX_WORKERS: usize = 64;

/// Application directory name under the user config directory
pub const CONFIG_DIR_NAME: &str = "current-meter-processor";

/// Config file name inside the application config directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Default number of parallel workers
pub fn default_workers() -> usize {
    num_cpus::get().clamp(1, MAX_WORKERS)
}
