//! Integration tests for batch conversion through the public API

use current_meter_processor::config::ProcessorConfig;
use current_meter_processor::{BatchProcessor, OutputFormat, RcmRecord};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn block(name: &str, steps: usize) -> String {
    let mut out = format!(
        "name: {name}\nvariable: current\nmeter depth: -2\nsite depth: -12\ndeltaT: 1800\n\
         number of time steps: {steps}\nsite tide: 0.9\n"
    );
    for i in 0..steps {
        writeln!(out, "{},{:.3},{}", i * 1800, 0.2, 90 + i).unwrap();
    }
    out
}

fn write_file(dir: &Path, name: &str, content: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join(name), content).unwrap();
}

/// Purpose: Convert a mixed survey tree (good, one-block and corrupt files)
/// Benefit: Ensures per-file failures are isolated and outputs are named per block
#[tokio::test]
async fn test_convert_survey_tree() {
    let temp_dir = TempDir::new().unwrap();
    let survey = temp_dir.path().join("survey");
    let output = temp_dir.path().join("rcm");

    write_file(
        &survey.join("a"),
        "site1.dat",
        &format!("{}{}", block("Site1 SNS", 48), block("Site1 NSN", 48)),
    );
    write_file(&survey.join("b"), "site2.txt", &block("Site2", 48));
    write_file(&survey.join("b"), "broken.dat", "name: broken\n0,0.1,10\n");

    let config = ProcessorConfig::default()
        .with_format(OutputFormat::Json)
        .with_output_dir(&output)
        .with_anchor("2015-07-01")
        .with_workers(2);
    let processor = BatchProcessor::new(config).unwrap();

    let inputs = processor
        .discover_inputs(&[survey.to_string_lossy().to_string()])
        .unwrap();
    assert_eq!(inputs.len(), 3);

    let stats = processor.process(&inputs).await.unwrap();
    assert_eq!(stats.files_processed, 2);
    assert_eq!(stats.files_failed, 1);
    assert_eq!(stats.blocks_written, 3);
    assert!(stats.errors[0].contains("broken.dat"));

    let nsn: RcmRecord =
        serde_json::from_str(&fs::read_to_string(output.join("site1_nsn.json")).unwrap()).unwrap();
    assert!(!nsn.is_sns);
    assert_eq!(nsn.name, "Site1 NSN");
    assert_eq!(nsn.len(), 48);
    assert!((nsn.time[1] - nsn.time[0] - 1800.0 / 86_400.0).abs() < 1e-9);
    assert_eq!(nsn.height_above_bed, Some(10.0));

    assert!(output.join("site2_sns.json").exists());
    assert!(!output.join("site2_nsn.json").exists());
}

/// Purpose: A glob input only picks the matching files
#[tokio::test]
async fn test_convert_glob_input() {
    let temp_dir = TempDir::new().unwrap();
    write_file(temp_dir.path(), "keep_1.dat", &block("K1", 4));
    write_file(temp_dir.path(), "keep_2.dat", &block("K2", 4));
    write_file(temp_dir.path(), "skip.txt", &block("S", 4));

    let processor =
        BatchProcessor::new(ProcessorConfig::default().with_format(OutputFormat::Csv)).unwrap();
    let pattern = temp_dir.path().join("keep_*.dat");
    let inputs = processor
        .discover_inputs(&[pattern.to_string_lossy().to_string()])
        .unwrap();
    assert_eq!(inputs.len(), 2);

    let stats = processor.process(&inputs).await.unwrap();
    assert_eq!(stats.blocks_written, 2);
    assert!(temp_dir.path().join("keep_1_sns.csv").exists());
    assert!(!temp_dir.path().join("skip_sns.csv").exists());
}
