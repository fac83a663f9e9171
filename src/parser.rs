//! Fixed-format current-meter file parser.
//!
//! A current-meter file holds one or two blocks. Each block is a header of
//! `key: value` lines followed by exactly `numberOfTimeSteps` rows of
//! `time speed direction` triples:
//!
//! ```text
//! # comment
//! Name: Site A current meter
//! Variable: current
//! Meter Depth: -4.9
//! Site Depth: -27.2
//! DeltaT: 3600
//! Number Of Time Steps: 360
//! Site Tide: 2.1
//! data
//! 0      0.123   45.0
//! 3600   0.101   51.2
//! ...
//! end data
//! ```
//!
//! The `data`/`end data` markers are optional. The first block becomes the
//! primary (SNS) series and the second, when present, the secondary (NSN)
//! series. Any malformed header, malformed row or row count disagreement
//! aborts the whole file.

use crate::constants::{
    COMMENT_PREFIXES, DATA_MARKER, DATA_ROW_COLUMNS, END_DATA_MARKER, MAX_BLOCKS_PER_FILE,
};
use crate::error::{CurrentMeterError, Result};
use crate::header::{self, BlockHeader, HeaderBuilder};
use crate::series::{CurrentTimeSeries, SeriesOptions};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[cfg(test)]
mod tests;

/// Primary (SNS) series and, for two-block files, the secondary (NSN) series
pub type ParsedSeries = (CurrentTimeSeries, Option<CurrentTimeSeries>);

/// Parse a current-meter file from disk
pub fn parse_current_meter_file(path: &Path) -> Result<ParsedSeries> {
    if !path.exists() {
        return Err(CurrentMeterError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    info!("Parsing current-meter file: {}", path.display());
    let file = File::open(path)?;
    parse_current_meter_reader(BufReader::new(file), path)
}

/// Parse current-meter content held in memory. `source` only labels errors.
pub fn parse_current_meter_str(content: &str, source: &Path) -> Result<ParsedSeries> {
    parse_current_meter_reader(content.as_bytes(), source)
}

/// Parse current-meter content line by line from any buffered reader
pub fn parse_current_meter_reader<R: BufRead>(reader: R, source: &Path) -> Result<ParsedSeries> {
    let mut parser = BlockParser::new(source);

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        parser.feed(&line, index + 1)?;
    }

    let mut blocks = parser.finish()?.into_iter();
    let primary = blocks.next().ok_or_else(|| CurrentMeterError::MalformedFile {
        path: source.to_path_buf(),
        line: 0,
        reason: "no header+data block found".to_string(),
    })?;
    let secondary = blocks.next();

    debug!(
        "Parsed {} block(s) from {}",
        1 + usize::from(secondary.is_some()),
        source.display()
    );
    Ok((primary, secondary))
}

/// Classification of one source line
#[derive(Debug, PartialEq)]
enum LineKind<'a> {
    Blank,
    Comment,
    DataMarker,
    EndDataMarker,
    Header(header::HeaderLine<'a>),
    Row,
    Text,
}

fn classify(line: &str) -> LineKind<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return LineKind::Blank;
    }
    if trimmed.starts_with(COMMENT_PREFIXES) {
        return LineKind::Comment;
    }
    if trimmed.eq_ignore_ascii_case(DATA_MARKER) {
        return LineKind::DataMarker;
    }
    if trimmed.eq_ignore_ascii_case(END_DATA_MARKER) {
        return LineKind::EndDataMarker;
    }
    if let Some(header_line) = header::recognise(trimmed) {
        return LineKind::Header(header_line);
    }
    if trimmed.starts_with(|c: char| c.is_ascii_digit() || matches!(c, '-' | '+' | '.')) {
        return LineKind::Row;
    }
    LineKind::Text
}

/// Parser position within the file
#[derive(Debug)]
enum ParseState {
    BeforeBlock,
    InHeader(HeaderBuilder),
    InData(DataBlock),
}

/// Rows collected for one block whose header is complete
#[derive(Debug)]
struct DataBlock {
    header: BlockHeader,
    time: Vec<f64>,
    speed: Vec<f64>,
    direction: Vec<f64>,
}

impl DataBlock {
    fn new(header: BlockHeader) -> Self {
        let capacity = header.number_of_time_steps;
        Self {
            header,
            time: Vec::with_capacity(capacity),
            speed: Vec::with_capacity(capacity),
            direction: Vec::with_capacity(capacity),
        }
    }

    fn rows(&self) -> usize {
        self.time.len()
    }

    fn is_complete(&self) -> bool {
        self.rows() == self.header.number_of_time_steps
    }
}

/// Line-driven state machine over one file
struct BlockParser {
    path: PathBuf,
    state: ParseState,
    blocks: Vec<CurrentTimeSeries>,
}

impl BlockParser {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            state: ParseState::BeforeBlock,
            blocks: Vec::with_capacity(MAX_BLOCKS_PER_FILE),
        }
    }

    fn feed(&mut self, line: &str, line_number: usize) -> Result<()> {
        let kind = classify(line);
        let state = std::mem::replace(&mut self.state, ParseState::BeforeBlock);

        self.state = match state {
            ParseState::BeforeBlock => self.before_block(kind, line, line_number)?,
            ParseState::InHeader(builder) => self.in_header(builder, kind, line, line_number)?,
            ParseState::InData(block) => self.in_data(block, kind, line, line_number)?,
        };
        Ok(())
    }

    fn before_block(
        &mut self,
        kind: LineKind<'_>,
        line: &str,
        line_number: usize,
    ) -> Result<ParseState> {
        match kind {
            LineKind::Header(header_line) => {
                if self.blocks.len() >= MAX_BLOCKS_PER_FILE {
                    return Err(self.malformed(
                        line_number,
                        format!(
                            "found a third block; at most {} blocks are allowed",
                            MAX_BLOCKS_PER_FILE
                        ),
                    ));
                }
                debug!(
                    "Block {} header starts at line {}",
                    self.blocks.len() + 1,
                    line_number
                );
                let mut builder = HeaderBuilder::new();
                builder.set(&header_line, &self.path, line_number)?;
                Ok(ParseState::InHeader(builder))
            }
            LineKind::Row => match self.blocks.last() {
                Some(previous) => Err(CurrentMeterError::RowCountMismatch {
                    path: self.path.clone(),
                    block: self.blocks.len(),
                    declared: previous.number_of_time_steps(),
                    found: previous.number_of_time_steps() + 1,
                }),
                None => Err(self.malformed(
                    line_number,
                    format!("data row before any block header: '{}'", line.trim()),
                )),
            },
            LineKind::DataMarker => Err(self.malformed(
                line_number,
                "data marker without a preceding block header".to_string(),
            )),
            LineKind::Text => {
                debug!("Ignoring line {} outside blocks: {}", line_number, line.trim());
                Ok(ParseState::BeforeBlock)
            }
            LineKind::Blank | LineKind::Comment | LineKind::EndDataMarker => {
                Ok(ParseState::BeforeBlock)
            }
        }
    }

    fn in_header(
        &mut self,
        mut builder: HeaderBuilder,
        kind: LineKind<'_>,
        line: &str,
        line_number: usize,
    ) -> Result<ParseState> {
        match kind {
            LineKind::Header(header_line) => {
                // A complete zero-row header is followed directly by the next block
                if builder.is_complete() && builder.declared_steps() == Some(0) {
                    let header = builder.build(&self.path, line_number)?;
                    self.start_data(header)?;
                    return self.before_block(LineKind::Header(header_line), line, line_number);
                }
                builder.set(&header_line, &self.path, line_number)?;
                Ok(ParseState::InHeader(builder))
            }
            LineKind::DataMarker => {
                let header = builder.build(&self.path, line_number)?;
                self.start_data(header)
            }
            LineKind::Row => {
                let header = builder.build(&self.path, line_number)?;
                match self.start_data(header)? {
                    ParseState::InData(block) => {
                        self.in_data(block, LineKind::Row, line, line_number)
                    }
                    // A zero-row block is already complete, so this row is surplus
                    _ => Err(CurrentMeterError::RowCountMismatch {
                        path: self.path.clone(),
                        block: self.blocks.len(),
                        declared: 0,
                        found: 1,
                    }),
                }
            }
            LineKind::EndDataMarker => Err(self.malformed(
                line_number,
                "end data marker inside a block header".to_string(),
            )),
            LineKind::Text => {
                debug!("Ignoring unrecognised header line {}: {}", line_number, line.trim());
                Ok(ParseState::InHeader(builder))
            }
            LineKind::Blank | LineKind::Comment => Ok(ParseState::InHeader(builder)),
        }
    }

    fn in_data(
        &mut self,
        mut block: DataBlock,
        kind: LineKind<'_>,
        line: &str,
        line_number: usize,
    ) -> Result<ParseState> {
        match kind {
            LineKind::Blank | LineKind::Comment => Ok(ParseState::InData(block)),
            LineKind::Row => {
                let (time, speed, direction) = self.parse_row(line, line_number)?;
                block.time.push(time);
                block.speed.push(speed);
                block.direction.push(direction);

                if block.is_complete() {
                    self.push_block(block)?;
                    Ok(ParseState::BeforeBlock)
                } else {
                    Ok(ParseState::InData(block))
                }
            }
            LineKind::Header(_) | LineKind::DataMarker | LineKind::EndDataMarker => {
                Err(self.row_count_mismatch(&block))
            }
            LineKind::Text => Err(CurrentMeterError::MalformedRow {
                path: self.path.clone(),
                line: line_number,
                content: line.trim().to_string(),
                reason: "expected a numeric time, speed, direction row".to_string(),
            }),
        }
    }

    fn start_data(&mut self, header: BlockHeader) -> Result<ParseState> {
        let block = DataBlock::new(header);
        if block.is_complete() {
            self.push_block(block)?;
            Ok(ParseState::BeforeBlock)
        } else {
            Ok(ParseState::InData(block))
        }
    }

    fn push_block(&mut self, block: DataBlock) -> Result<()> {
        let is_sns = self.blocks.is_empty();
        let DataBlock {
            header,
            time,
            speed,
            direction,
        } = block;

        let options = SeriesOptions {
            meter_depth: Some(header.meter_depth),
            site_depth: Some(header.site_depth),
            delta_t: Some(header.delta_t),
            site_tide: Some(header.site_tide),
            is_sns,
            name: header.name,
            variable: header.variable,
            ..SeriesOptions::default()
        };

        let series = CurrentTimeSeries::new(time, speed, direction, options)?;

        let out_of_range = series.out_of_range_directions();
        if out_of_range > 0 {
            warn!(
                "{}: block {} has {} direction(s) outside [0, 360)",
                self.path.display(),
                self.blocks.len() + 1,
                out_of_range
            );
        }

        debug!(
            "Completed block {} ('{}', {} steps, is_sns={})",
            self.blocks.len() + 1,
            series.name(),
            series.number_of_time_steps(),
            is_sns
        );
        self.blocks.push(series);
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<CurrentTimeSeries>> {
        match std::mem::replace(&mut self.state, ParseState::BeforeBlock) {
            ParseState::BeforeBlock => {}
            ParseState::InHeader(builder) if builder.is_complete() => {
                let header = builder.build(&self.path, 0)?;
                if let ParseState::InData(block) = self.start_data(header)? {
                    return Err(self.row_count_mismatch(&block));
                }
            }
            ParseState::InHeader(builder) => {
                let names: Vec<&str> = builder
                    .missing_fields()
                    .iter()
                    .map(|field| field.label())
                    .collect();
                return Err(self.malformed(
                    0,
                    format!("file ends inside a block header missing {}", names.join(", ")),
                ));
            }
            ParseState::InData(block) => return Err(self.row_count_mismatch(&block)),
        }
        Ok(self.blocks)
    }

    fn parse_row(&self, line: &str, line_number: usize) -> Result<(f64, f64, f64)> {
        let malformed_row = |reason: String| CurrentMeterError::MalformedRow {
            path: self.path.clone(),
            line: line_number,
            content: line.trim().to_string(),
            reason,
        };

        let tokens: Vec<&str> = line
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|token| !token.is_empty())
            .collect();

        if tokens.len() != DATA_ROW_COLUMNS {
            return Err(malformed_row(format!(
                "expected {} columns, found {}",
                DATA_ROW_COLUMNS,
                tokens.len()
            )));
        }

        let mut values = [0.0; DATA_ROW_COLUMNS];
        for (slot, token) in values.iter_mut().zip(&tokens) {
            *slot = token
                .parse::<f64>()
                .map_err(|_| malformed_row(format!("'{}' is not a number", token)))?;
        }

        Ok((values[0], values[1], values[2]))
    }

    fn row_count_mismatch(&self, block: &DataBlock) -> CurrentMeterError {
        CurrentMeterError::RowCountMismatch {
            path: self.path.clone(),
            block: self.blocks.len() + 1,
            declared: block.header.number_of_time_steps,
            found: block.rows(),
        }
    }

    fn malformed(&self, line: usize, reason: String) -> CurrentMeterError {
        CurrentMeterError::MalformedFile {
            path: self.path.clone(),
            line,
            reason,
        }
    }
}
