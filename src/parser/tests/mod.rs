//! Test fixtures for the current-meter parser
//!
//! Builds synthetic current-meter files with one or two blocks so the
//! parser can be exercised without real survey data.

use std::fmt::Write as _;
use std::io::Write;
use tempfile::NamedTempFile;


/// Header values for one synthetic block
#[derive(Debug, Clone)]
pub struct BlockFixture {
    pub name: &'static str,
    pub meter_depth: f64,
    pub site_depth: f64,
    pub delta_t: f64,
    pub steps: usize,
    pub site_tide: f64,
}

impl BlockFixture {
    pub fn sns(steps: usize) -> Self {
        Self {
            name: "Loch Test SNS",
            meter_depth: -4.9,
            site_depth: -27.2,
            delta_t: 3600.0,
            steps,
            site_tide: 2.1,
        }
    }

    pub fn nsn(steps: usize) -> Self {
        Self {
            name: "Loch Test NSN",
            meter_depth: -5.1,
            site_depth: -27.2,
            delta_t: 3600.0,
            steps,
            site_tide: 2.1,
        }
    }

    /// Header lines of the block
    pub fn header(&self) -> String {
        format!(
            "Name: {}\nVariable: current\nMeter Depth: {}\nSite Depth: {}\nDeltaT: {}\nNumber Of Time Steps: {}\nSite Tide: {}\n",
            self.name, self.meter_depth, self.site_depth, self.delta_t, self.steps, self.site_tide
        )
    }

    /// Header, `data` marker, rows and `end data` marker
    pub fn render(&self) -> String {
        let mut block = self.header();
        block.push_str("data\n");
        block.push_str(&rows(self.steps, self.delta_t));
        block.push_str("end data\n");
        block
    }
}

/// `count` rows with a rotating direction and a slowly varying speed
pub fn rows(count: usize, delta_t: f64) -> String {
    let mut out = String::new();
    for i in 0..count {
        let time = i as f64 * delta_t;
        let speed = 0.05 + (i % 12) as f64 * 0.01;
        let direction = (i as f64 * 15.0) % 360.0;
        writeln!(out, "{:.1}\t{:.3}\t{:.1}", time, speed, direction).unwrap();
    }
    out
}

/// Two-block file as produced for a tidal survey (SNS block, then NSN)
pub fn two_block_file(steps: usize) -> String {
    format!(
        "# Current meter export\n{}\n{}",
        BlockFixture::sns(steps).render(),
        BlockFixture::nsn(steps).render()
    )
}

pub fn one_block_file(steps: usize) -> String {
    BlockFixture::sns(steps).render()
}

/// Write content to a temporary file
pub fn create_temp_file(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    write!(temp_file, "{}", content).unwrap();
    temp_file
}
