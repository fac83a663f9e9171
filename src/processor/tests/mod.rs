//! Integration tests for the batch processor
//!
//! Exercises discovery, conversion and export on synthetic survey trees.


use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// Current-meter block with `steps` hourly rows
pub fn block(name: &str, meter_depth: f64, steps: usize) -> String {
    let mut out = format!(
        "Name: {}\nVariable: current\nMeter Depth: {}\nSite Depth: -30\nDeltaT: 3600\n\
         Number Of Time Steps: {}\nSite Tide: 1.8\ndata\n",
        name, meter_depth, steps
    );
    for i in 0..steps {
        writeln!(out, "{} {:.2} {}", i * 3600, 0.1 + (i % 5) as f64 * 0.05, (i * 20) % 360).unwrap();
    }
    out.push_str("end data\n");
    out
}

/// Write a two-block current-meter file
pub fn write_two_block_file(dir: &Path, name: &str, steps: usize) -> PathBuf {
    let path = dir.join(name);
    let content = format!(
        "{}\n{}",
        block("Survey SNS", -5.0, steps),
        block("Survey NSN", -6.0, steps)
    );
    fs::write(&path, content).unwrap();
    path
}

/// Write a one-block current-meter file
pub fn write_one_block_file(dir: &Path, name: &str, steps: usize) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, block("Survey", -5.0, steps)).unwrap();
    path
}
