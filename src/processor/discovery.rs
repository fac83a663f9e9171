//! Input discovery for batch conversion
//!
//! Resolves command-line inputs into a sorted list of current-meter files.
//! Each input may be a file, a directory walked recursively for the known
//! extensions, or a glob pattern. Block outputs written by an earlier
//! conversion (`<stem>_sns.csv` and friends) are skipped unless named
//! explicitly.

use crate::constants::{INPUT_EXTENSIONS, NSN_SUFFIX, SNS_SUFFIX};
use crate::error::{CurrentMeterError, Result};
use crate::writer::OutputFormat;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Resolve `inputs` into existing files, sorted and de-duplicated
pub fn discover_inputs(inputs: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for input in inputs {
        if is_glob_pattern(input) {
            files.extend(expand_glob(input)?);
            continue;
        }

        let path = Path::new(input);
        if path.is_dir() {
            files.extend(walk_directory(path));
        } else if path.is_file() {
            files.push(path.to_path_buf());
        } else {
            return Err(CurrentMeterError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    }

    files.sort();
    files.dedup();
    debug!("Discovered {} input files", files.len());
    Ok(files)
}

/// Check if a path has one of the current-meter file extensions
pub fn is_input_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            INPUT_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Check if a path is named like a block output of a previous conversion
pub fn is_generated_output(path: &Path) -> bool {
    let (Some(stem), Some(ext)) = (
        path.file_stem().and_then(|s| s.to_str()),
        path.extension().and_then(|e| e.to_str()),
    ) else {
        return false;
    };

    let block_suffix = [SNS_SUFFIX, NSN_SUFFIX].iter().any(|suffix| {
        stem.strip_suffix(suffix)
            .is_some_and(|rest| rest.ends_with('_'))
    });
    block_suffix
        && OutputFormat::ALL
            .iter()
            .any(|format| ext.eq_ignore_ascii_case(format.extension()))
}

fn is_candidate(path: &Path) -> bool {
    if !is_input_file(path) {
        return false;
    }
    if is_generated_output(path) {
        debug!("Skipping previous output {}", path.display());
        return false;
    }
    true
}

fn is_glob_pattern(input: &str) -> bool {
    input.contains(['*', '?', '['])
}

fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob::glob(pattern).map_err(|e| {
        CurrentMeterError::configuration(format!("invalid glob pattern '{}': {}", pattern, e))
    })?;

    let mut files = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) if path.is_file() => {
                if !is_generated_output(&path) {
                    files.push(path);
                }
            }
            Ok(path) if path.is_dir() => files.extend(walk_directory(&path)),
            Ok(_) => {}
            Err(e) => warn!("Skipping unreadable glob match: {}", e),
        }
    }

    if files.is_empty() {
        warn!("Pattern '{}' matched no files", pattern);
    }
    Ok(files)
}

fn walk_directory(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable directory entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_candidate(entry.path()))
        .map(|entry| entry.into_path())
        .collect()
}
