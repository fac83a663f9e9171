//! Current-meter block header parsing.
//!
//! Each data block in a current-meter file opens with `key: value` lines
//! naming the site, the measured variable, the instrument and sea-bed
//! elevations, the sampling interval, the declared step count and the site
//! tide. [`HeaderBuilder`] collects those lines and validates that every
//! required field is present before the data rows are read.

use crate::constants::header_keys;
use crate::error::{CurrentMeterError, Result};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

static HEADER_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z][A-Za-z0-9 _\-]*?)\s*(?:\([^)]*\))?\s*[:=,]\s*(.*?)\s*$")
        .expect("header line pattern is valid")
});

/// Header fields a block must declare
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderField {
    Name,
    Variable,
    MeterDepth,
    SiteDepth,
    DeltaT,
    NumberOfTimeSteps,
    SiteTide,
}

impl HeaderField {
    pub const ALL: [HeaderField; 7] = [
        HeaderField::Name,
        HeaderField::Variable,
        HeaderField::MeterDepth,
        HeaderField::SiteDepth,
        HeaderField::DeltaT,
        HeaderField::NumberOfTimeSteps,
        HeaderField::SiteTide,
    ];

    /// Resolve a normalized key to a field
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|field| field.aliases().contains(&key))
    }

    fn aliases(self) -> &'static [&'static str] {
        match self {
            HeaderField::Name => header_keys::NAME,
            HeaderField::Variable => header_keys::VARIABLE,
            HeaderField::MeterDepth => header_keys::METER_DEPTH,
            HeaderField::SiteDepth => header_keys::SITE_DEPTH,
            HeaderField::DeltaT => header_keys::DELTA_T,
            HeaderField::NumberOfTimeSteps => header_keys::NUMBER_OF_TIME_STEPS,
            HeaderField::SiteTide => header_keys::SITE_TIDE,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            HeaderField::Name => "name",
            HeaderField::Variable => "variable",
            HeaderField::MeterDepth => "meterDepth",
            HeaderField::SiteDepth => "siteDepth",
            HeaderField::DeltaT => "deltaT",
            HeaderField::NumberOfTimeSteps => "numberOfTimeSteps",
            HeaderField::SiteTide => "siteTide",
        }
    }
}

/// A recognised `key: value` header line
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderLine<'a> {
    pub field: HeaderField,
    pub value: &'a str,
}

/// Lowercase a raw key and keep only its alphanumeric characters
pub fn normalize_key(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Split a line into a normalized key and its value, if it has the
/// `key<sep>value` shape
pub fn split_key_value(line: &str) -> Option<(String, &str)> {
    let captures = HEADER_LINE.captures(line)?;
    let key = captures.get(1)?.as_str();
    let value = captures.get(2).map_or("", |m| m.as_str());
    Some((normalize_key(key), value))
}

/// Recognise a header line naming one of the required fields
pub fn recognise(line: &str) -> Option<HeaderLine<'_>> {
    let (key, value) = split_key_value(line)?;
    HeaderField::from_key(&key).map(|field| HeaderLine { field, value })
}

/// Metadata declared by one block header
#[derive(Debug, Clone, PartialEq)]
pub struct BlockHeader {
    pub name: String,
    pub variable: String,
    pub meter_depth: f64,
    pub site_depth: f64,
    pub delta_t: f64,
    pub number_of_time_steps: usize,
    pub site_tide: f64,
}

/// Builder collecting header fields line by line
#[derive(Debug, Default)]
pub struct HeaderBuilder {
    name: Option<String>,
    variable: Option<String>,
    meter_depth: Option<f64>,
    site_depth: Option<f64>,
    delta_t: Option<f64>,
    number_of_time_steps: Option<usize>,
    site_tide: Option<f64>,
}

impl HeaderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one header field. `line` is the 1-based source line used in
    /// error messages.
    pub fn set(&mut self, header: &HeaderLine<'_>, path: &Path, line: usize) -> Result<()> {
        let malformed = |reason: String| CurrentMeterError::MalformedFile {
            path: path.to_path_buf(),
            line,
            reason,
        };

        if self.is_set(header.field) {
            return Err(malformed(format!(
                "duplicate header field '{}'",
                header.field.label()
            )));
        }

        let value = header.value;
        match header.field {
            HeaderField::Name => self.name = Some(value.to_string()),
            HeaderField::Variable => self.variable = Some(value.to_string()),
            HeaderField::MeterDepth => self.meter_depth = Some(parse_scalar(header, path, line)?),
            HeaderField::SiteDepth => self.site_depth = Some(parse_scalar(header, path, line)?),
            HeaderField::DeltaT => self.delta_t = Some(parse_scalar(header, path, line)?),
            HeaderField::SiteTide => self.site_tide = Some(parse_scalar(header, path, line)?),
            HeaderField::NumberOfTimeSteps => {
                let count = parse_step_count(value).ok_or_else(|| {
                    malformed(format!(
                        "numberOfTimeSteps must be a non-negative integer, got '{}'",
                        value
                    ))
                })?;
                self.number_of_time_steps = Some(count);
            }
        }

        debug!("Header field {} = {}", header.field.label(), value);
        Ok(())
    }

    pub fn is_set(&self, field: HeaderField) -> bool {
        match field {
            HeaderField::Name => self.name.is_some(),
            HeaderField::Variable => self.variable.is_some(),
            HeaderField::MeterDepth => self.meter_depth.is_some(),
            HeaderField::SiteDepth => self.site_depth.is_some(),
            HeaderField::DeltaT => self.delta_t.is_some(),
            HeaderField::NumberOfTimeSteps => self.number_of_time_steps.is_some(),
            HeaderField::SiteTide => self.site_tide.is_some(),
        }
    }

    /// Every required field has been declared
    pub fn is_complete(&self) -> bool {
        HeaderField::ALL.into_iter().all(|field| self.is_set(field))
    }

    /// Step count declared so far
    pub fn declared_steps(&self) -> Option<usize> {
        self.number_of_time_steps
    }

    /// Fields not yet declared, in header order
    pub fn missing_fields(&self) -> Vec<HeaderField> {
        HeaderField::ALL
            .into_iter()
            .filter(|field| !self.is_set(*field))
            .collect()
    }

    /// Finish the header. Every field must have been declared.
    pub fn build(self, path: &Path, line: usize) -> Result<BlockHeader> {
        let missing = self.missing_fields();
        match self {
            HeaderBuilder {
                name: Some(name),
                variable: Some(variable),
                meter_depth: Some(meter_depth),
                site_depth: Some(site_depth),
                delta_t: Some(delta_t),
                number_of_time_steps: Some(number_of_time_steps),
                site_tide: Some(site_tide),
            } => Ok(BlockHeader {
                name,
                variable,
                meter_depth,
                site_depth,
                delta_t,
                number_of_time_steps,
                site_tide,
            }),
            _ => {
                let names: Vec<&str> = missing.iter().map(|field| field.label()).collect();
                Err(CurrentMeterError::MalformedFile {
                    path: path.to_path_buf(),
                    line,
                    reason: format!("block header is missing {}", names.join(", ")),
                })
            }
        }
    }
}

fn parse_scalar(header: &HeaderLine<'_>, path: &Path, line: usize) -> Result<f64> {
    header
        .value
        .parse::<f64>()
        .map_err(|_| CurrentMeterError::MalformedFile {
            path: path.to_path_buf(),
            line,
            reason: format!(
                "{} must be numeric, got '{}'",
                header.field.label(),
                header.value
            ),
        })
}

/// Accept "360" as well as "360.0", but never a fraction or a negative
fn parse_step_count(value: &str) -> Option<usize> {
    if let Ok(count) = value.parse::<usize>() {
        return Some(count);
    }
    let as_float = value.parse::<f64>().ok()?;
    if as_float.is_finite() && as_float >= 0.0 && as_float.fract() == 0.0 {
        Some(as_float as usize)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn path() -> PathBuf {
        PathBuf::from("test.dat")
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("Meter Depth"), "meterdepth");
        assert_eq!(normalize_key("number_of-time steps"), "numberoftimesteps");
        assert_eq!(normalize_key("DeltaT"), "deltat");
    }

    #[test]
    fn test_recognise_aliases_and_units() {
        let line = recognise("Meter Depth (m): -4.9").unwrap();
        assert_eq!(line.field, HeaderField::MeterDepth);
        assert_eq!(line.value, "-4.9");

        let line = recognise("water_depth = -27.2").unwrap();
        assert_eq!(line.field, HeaderField::SiteDepth);

        let line = recognise("Sampling Interval (s), 600").unwrap();
        assert_eq!(line.field, HeaderField::DeltaT);
        assert_eq!(line.value, "600");

        let line = recognise("Name: Loch Creran, north arm").unwrap();
        assert_eq!(line.field, HeaderField::Name);
        assert_eq!(line.value, "Loch Creran, north arm");
    }

    #[test]
    fn test_recognise_rejects_other_lines() {
        assert!(recognise("0 0.12 45").is_none());
        assert!(recognise("data").is_none());
        assert!(recognise("instrument: RCM9").is_none());
    }

    #[test]
    fn test_parse_step_count() {
        assert_eq!(parse_step_count("360"), Some(360));
        assert_eq!(parse_step_count("360.0"), Some(360));
        assert_eq!(parse_step_count("0"), Some(0));
        assert_eq!(parse_step_count("12.5"), None);
        assert_eq!(parse_step_count("-3"), None);
        assert_eq!(parse_step_count("many"), None);
    }

    #[test]
    fn test_builder_complete_header() {
        let mut builder = HeaderBuilder::new();
        let lines = [
            "Name: Site A",
            "Variable: current",
            "Meter Depth: -4.9",
            "Site Depth: -27.2",
            "DeltaT: 3600",
            "Number Of Time Steps: 360",
            "Site Tide: 2.1",
        ];
        for (i, line) in lines.iter().enumerate() {
            builder.set(&recognise(line).unwrap(), &path(), i + 1).unwrap();
        }
        assert!(builder.missing_fields().is_empty());

        let header = builder.build(&path(), 8).unwrap();
        assert_eq!(header.name, "Site A");
        assert_eq!(header.variable, "current");
        assert_eq!(header.meter_depth, -4.9);
        assert_eq!(header.site_depth, -27.2);
        assert_eq!(header.delta_t, 3600.0);
        assert_eq!(header.number_of_time_steps, 360);
        assert_eq!(header.site_tide, 2.1);
    }

    #[test]
    fn test_builder_missing_fields() {
        let mut builder = HeaderBuilder::new();
        builder
            .set(&recognise("Name: Site A").unwrap(), &path(), 1)
            .unwrap();

        match builder.build(&path(), 2).unwrap_err() {
            CurrentMeterError::MalformedFile { line, reason, .. } => {
                assert_eq!(line, 2);
                assert!(reason.contains("variable"));
                assert!(reason.contains("siteTide"));
                assert!(!reason.contains("name,"));
            }
            other => panic!("Expected MalformedFile, got {other:?}"),
        }
    }

    #[test]
    fn test_builder_duplicate_and_bad_values() {
        let mut builder = HeaderBuilder::new();
        builder
            .set(&recognise("DeltaT: 600").unwrap(), &path(), 1)
            .unwrap();
        assert!(builder
            .set(&recognise("time step: 600").unwrap(), &path(), 2)
            .is_err());

        let err = builder
            .set(&recognise("Site Depth: deep").unwrap(), &path(), 3)
            .unwrap_err();
        assert!(err.to_string().contains("siteDepth must be numeric"));

        let err = builder
            .set(&recognise("steps: 10.5").unwrap(), &path(), 4)
            .unwrap_err();
        assert!(err.is_corrupt_file());
    }
}
