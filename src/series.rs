//! Current time series built from speed/direction observations.
//!
//! A [`CurrentTimeSeries`] owns the raw time, speed and direction columns of
//! one evenly sampled record together with the header metadata it was read
//! with. Eastward (`u`) and northward (`v`) components are derived eagerly on
//! construction and re-derived whenever speed changes, so they can never drift
//! from the speed/direction pair.

use crate::constants::{DEFAULT_ANCHOR_DAYS, SECONDS_PER_DAY};
use crate::error::{CurrentMeterError, Result};
use crate::rcm::RcmRecord;
use serde::{Deserialize, Serialize};

/// Optional metadata applied on top of the three sample arrays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesOptions {
    pub meter_depth: Option<f64>,
    pub site_depth: Option<f64>,
    pub delta_t: Option<f64>,
    pub site_tide: Option<f64>,
    pub is_sns: bool,
    pub name: String,
    pub variable: String,
    pub length_unit_conversion_factor: f64,
    pub time_unit_conversion_factor: f64,
}

impl Default for SeriesOptions {
    fn default() -> Self {
        Self {
            meter_depth: None,
            site_depth: None,
            delta_t: None,
            site_tide: None,
            is_sns: false,
            name: String::new(),
            variable: String::new(),
            length_unit_conversion_factor: 1.0,
            time_unit_conversion_factor: 1.0,
        }
    }
}

impl SeriesOptions {
    /// Set instrument and sea-bed elevations (negative down)
    pub fn with_depths(mut self, meter_depth: f64, site_depth: f64) -> Self {
        self.meter_depth = Some(meter_depth);
        self.site_depth = Some(site_depth);
        self
    }

    /// Set the sampling interval in raw time units
    pub fn with_delta_t(mut self, delta_t: f64) -> Self {
        self.delta_t = Some(delta_t);
        self
    }

    pub fn with_site_tide(mut self, site_tide: f64) -> Self {
        self.site_tide = Some(site_tide);
        self
    }

    /// Mark the series as coming from the first (SNS) block of a file
    pub fn with_sns(mut self, is_sns: bool) -> Self {
        self.is_sns = is_sns;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_variable(mut self, variable: impl Into<String>) -> Self {
        self.variable = variable.into();
        self
    }

    /// Set the raw-to-SI length and time factors. They are only applied by
    /// [`CurrentTimeSeries::to_si`].
    pub fn with_conversion_factors(mut self, length: f64, time: f64) -> Self {
        self.length_unit_conversion_factor = length;
        self.time_unit_conversion_factor = time;
        self
    }
}

/// Summary of the speed column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedStatistics {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Population standard deviation
    pub std_dev: f64,
}

/// One evenly sampled record of current-meter observations
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentTimeSeries {
    time: Vec<f64>,
    speed: Vec<f64>,
    direction: Vec<f64>,
    u: Vec<f64>,
    v: Vec<f64>,
    meter_depth: Option<f64>,
    site_depth: Option<f64>,
    delta_t: Option<f64>,
    site_tide: Option<f64>,
    length_unit_conversion_factor: f64,
    time_unit_conversion_factor: f64,
    is_sns: bool,
    name: String,
    variable: String,
}

impl Default for CurrentTimeSeries {
    fn default() -> Self {
        Self::empty()
    }
}

impl CurrentTimeSeries {
    /// Create a series from parallel arrays and apply `options`.
    ///
    /// All three arrays may be empty together, which yields a "no data"
    /// placeholder. Any other length disagreement is a
    /// [`CurrentMeterError::ShapeMismatch`].
    pub fn new(
        time: Vec<f64>,
        speed: Vec<f64>,
        direction: Vec<f64>,
        options: SeriesOptions,
    ) -> Result<Self> {
        if time.len() != speed.len() || time.len() != direction.len() {
            return Err(CurrentMeterError::ShapeMismatch {
                time: time.len(),
                speed: speed.len(),
                direction: direction.len(),
            });
        }

        let (u, v) = velocity_components(&speed, &direction);

        Ok(Self {
            time,
            speed,
            direction,
            u,
            v,
            meter_depth: options.meter_depth,
            site_depth: options.site_depth,
            delta_t: options.delta_t,
            site_tide: options.site_tide,
            length_unit_conversion_factor: options.length_unit_conversion_factor,
            time_unit_conversion_factor: options.time_unit_conversion_factor,
            is_sns: options.is_sns,
            name: options.name,
            variable: options.variable,
        })
    }

    /// Empty placeholder series with default metadata
    pub fn empty() -> Self {
        let options = SeriesOptions::default();
        Self {
            time: Vec::new(),
            speed: Vec::new(),
            direction: Vec::new(),
            u: Vec::new(),
            v: Vec::new(),
            meter_depth: options.meter_depth,
            site_depth: options.site_depth,
            delta_t: options.delta_t,
            site_tide: options.site_tide,
            length_unit_conversion_factor: options.length_unit_conversion_factor,
            time_unit_conversion_factor: options.time_unit_conversion_factor,
            is_sns: options.is_sns,
            name: options.name,
            variable: options.variable,
        }
    }

    /// Metadata of this series as options, e.g. to rebuild a modified copy
    pub fn options(&self) -> SeriesOptions {
        SeriesOptions {
            meter_depth: self.meter_depth,
            site_depth: self.site_depth,
            delta_t: self.delta_t,
            site_tide: self.site_tide,
            is_sns: self.is_sns,
            name: self.name.clone(),
            variable: self.variable.clone(),
            length_unit_conversion_factor: self.length_unit_conversion_factor,
            time_unit_conversion_factor: self.time_unit_conversion_factor,
        }
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn speed(&self) -> &[f64] {
        &self.speed
    }

    /// Compass bearings in degrees, clockwise from north, direction of flow
    pub fn direction(&self) -> &[f64] {
        &self.direction
    }

    /// Eastward velocity component
    pub fn u(&self) -> &[f64] {
        &self.u
    }

    /// Northward velocity component
    pub fn v(&self) -> &[f64] {
        &self.v
    }

    pub fn meter_depth(&self) -> Option<f64> {
        self.meter_depth
    }

    pub fn site_depth(&self) -> Option<f64> {
        self.site_depth
    }

    pub fn delta_t(&self) -> Option<f64> {
        self.delta_t
    }

    pub fn site_tide(&self) -> Option<f64> {
        self.site_tide
    }

    pub fn length_unit_conversion_factor(&self) -> f64 {
        self.length_unit_conversion_factor
    }

    pub fn time_unit_conversion_factor(&self) -> f64 {
        self.time_unit_conversion_factor
    }

    pub fn is_sns(&self) -> bool {
        self.is_sns
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn number_of_time_steps(&self) -> usize {
        self.time.len()
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// One-based ordinal index of every sample: `1, 2, ..., N`
    pub fn time_indexes(&self) -> Vec<usize> {
        (1..=self.number_of_time_steps()).collect()
    }

    /// Map sample positions onto an absolute calendar axis in serial days.
    ///
    /// Sample `i` (one-based) lands at `anchor + (i - 1) * deltaT / 86400`.
    /// The raw `time` column is not consulted.
    pub fn contextualise_time(&self, anchor: f64) -> Result<Vec<f64>> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        let delta_t = self
            .delta_t
            .ok_or(CurrentMeterError::MissingMetadata { field: "deltaT" })?;
        let step_days = delta_t / SECONDS_PER_DAY;

        Ok((0..self.number_of_time_steps())
            .map(|offset| anchor + offset as f64 * step_days)
            .collect())
    }

    /// Arithmetic mean of the speed column
    pub fn mean_speed(&self) -> Result<f64> {
        self.require_samples("mean speed")?;
        Ok(mean(&self.speed))
    }

    pub fn max_speed(&self) -> Result<f64> {
        self.require_samples("max speed")?;
        Ok(self.speed.iter().copied().fold(f64::NEG_INFINITY, f64::max))
    }

    /// Mean `(u, v)`, the residual current vector
    pub fn residual_current(&self) -> Result<(f64, f64)> {
        self.require_samples("residual current")?;
        Ok((mean(&self.u), mean(&self.v)))
    }

    /// Compass bearing of the residual current in [0, 360)
    pub fn residual_direction(&self) -> Result<f64> {
        let (u, v) = self.residual_current()?;
        Ok(u.atan2(v).to_degrees().rem_euclid(360.0))
    }

    pub fn speed_statistics(&self) -> Result<SpeedStatistics> {
        self.require_samples("speed statistics")?;

        let count = self.speed.len();
        let mean = mean(&self.speed);
        let (min, max) = self
            .speed
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &s| {
                (lo.min(s), hi.max(s))
            });
        let variance = self.speed.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / count as f64;

        Ok(SpeedStatistics {
            count,
            mean,
            min,
            max,
            std_dev: variance.sqrt(),
        })
    }

    /// Multiply every speed by `factor` and re-derive `u`/`v`.
    ///
    /// Direction, time and scalar metadata are untouched. A negative factor
    /// is accepted and flips the effective flow through negative speeds.
    pub fn scale_speed(&mut self, factor: f64) {
        for speed in &mut self.speed {
            *speed *= factor;
        }
        self.recompute_components();
    }

    /// Non-mutating counterpart of [`scale_speed`](Self::scale_speed)
    pub fn scaled_speed(&self, factor: f64) -> Self {
        let mut scaled = self.clone();
        scaled.scale_speed(factor);
        scaled
    }

    /// Apply the stored conversion factors and return a series in SI units.
    ///
    /// Time values and `deltaT` scale by the time factor, depths and tide by
    /// the length factor, speed by length/time. The returned series carries
    /// factors of 1.
    pub fn to_si(&self) -> Result<Self> {
        let length = self.length_unit_conversion_factor;
        let time = self.time_unit_conversion_factor;
        if !length.is_finite() || !time.is_finite() || length == 0.0 || time == 0.0 {
            return Err(CurrentMeterError::configuration(format!(
                "unit conversion factors must be finite and non-zero (length={}, time={})",
                length, time
            )));
        }

        let speed_factor = length / time;
        let options = SeriesOptions {
            meter_depth: self.meter_depth.map(|d| d * length),
            site_depth: self.site_depth.map(|d| d * length),
            delta_t: self.delta_t.map(|dt| dt * time),
            site_tide: self.site_tide.map(|t| t * length),
            length_unit_conversion_factor: 1.0,
            time_unit_conversion_factor: 1.0,
            ..self.options()
        };

        Self::new(
            self.time.iter().map(|t| t * time).collect(),
            self.speed.iter().map(|s| s * speed_factor).collect(),
            self.direction.clone(),
            options,
        )
    }

    /// Vertical distance between the instrument and the sea bed
    pub fn height_above_bed(&self) -> Result<f64> {
        let site_depth = self
            .site_depth
            .ok_or(CurrentMeterError::MissingMetadata { field: "siteDepth" })?;
        let meter_depth = self
            .meter_depth
            .ok_or(CurrentMeterError::MissingMetadata { field: "meterDepth" })?;
        Ok((site_depth - meter_depth).abs())
    }

    /// Build an RCM record anchored at `anchor` (serial days)
    ///
    /// Both depths are required once the series holds samples. An empty
    /// series converts to an empty record whose height is `None` when a depth
    /// is unset.
    pub fn to_rcm_record(&self, anchor: f64) -> Result<RcmRecord> {
        let height_above_bed = if self.is_empty() {
            self.height_above_bed().ok()
        } else {
            Some(self.height_above_bed()?)
        };

        Ok(RcmRecord {
            time: self.contextualise_time(anchor)?,
            speed: self.speed.clone(),
            direction: self.direction.clone(),
            u: self.u.clone(),
            v: self.v.clone(),
            height_above_bed,
            name: self.name.clone(),
            variable: self.variable.clone(),
            is_sns: self.is_sns,
        })
    }

    /// Build an RCM record anchored at [`DEFAULT_ANCHOR_DAYS`]
    pub fn to_rcm_record_default(&self) -> Result<RcmRecord> {
        self.to_rcm_record(DEFAULT_ANCHOR_DAYS)
    }

    /// Count of directions outside the compass range [0, 360)
    pub fn out_of_range_directions(&self) -> usize {
        self.direction
            .iter()
            .filter(|d| !(0.0..360.0).contains(*d))
            .count()
    }

    fn recompute_components(&mut self) {
        let (u, v) = velocity_components(&self.speed, &self.direction);
        self.u = u;
        self.v = v;
    }

    fn require_samples(&self, operation: &'static str) -> Result<()> {
        if self.is_empty() {
            Err(CurrentMeterError::EmptySeries { operation })
        } else {
            Ok(())
        }
    }
}

/// Eastward and northward components from speed and compass bearing
pub fn velocity_components(speed: &[f64], direction: &[f64]) -> (Vec<f64>, Vec<f64>) {
    speed
        .iter()
        .zip(direction)
        .map(|(&s, &d)| {
            let (sin, cos) = d.to_radians().sin_cos();
            (s * sin, s * cos)
        })
        .unzip()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-4;

    fn sample_series() -> CurrentTimeSeries {
        CurrentTimeSeries::new(
            vec![0.0, 1.0, 2.0, 3.0],
            vec![0.10, 0.20, 0.30, 0.40],
            vec![0.0, 90.0, 180.0, 270.0],
            SeriesOptions::default()
                .with_depths(-4.9, -27.2)
                .with_delta_t(600.0)
                .with_name("Site A")
                .with_variable("current"),
        )
        .unwrap()
    }

    #[test]
    fn test_construction_derives_components() {
        let time = vec![0.0, 1.0, 2.0];
        let speed = vec![0.5, 1.2, 0.05];
        let direction = vec![30.0, 135.0, 359.5];
        let series = CurrentTimeSeries::new(
            time.clone(),
            speed.clone(),
            direction.clone(),
            SeriesOptions::default(),
        )
        .unwrap();

        for i in 0..time.len() {
            let radians = direction[i] * std::f64::consts::PI / 180.0;
            assert!((series.u()[i] - speed[i] * radians.sin()).abs() < TOL);
            assert!((series.v()[i] - speed[i] * radians.cos()).abs() < TOL);
        }
        assert_eq!(series.number_of_time_steps(), 3);
    }

    #[test]
    fn test_cardinal_directions() {
        let series = sample_series();
        assert!((series.u()[0]).abs() < 1e-12);
        assert!((series.v()[0] - 0.10).abs() < 1e-12);
        assert!((series.u()[1] - 0.20).abs() < 1e-12);
        assert!((series.v()[2] + 0.30).abs() < 1e-12);
        assert!((series.u()[3] + 0.40).abs() < 1e-12);
    }

    #[test]
    fn test_empty_placeholder() {
        let series =
            CurrentTimeSeries::new(vec![], vec![], vec![], SeriesOptions::default()).unwrap();

        assert_eq!(series.number_of_time_steps(), 0);
        assert!(series.is_empty());
        assert_eq!(series.length_unit_conversion_factor(), 1.0);
        assert_eq!(series.time_unit_conversion_factor(), 1.0);
        assert_eq!(series.name(), "");
        assert_eq!(series.variable(), "");
        assert_eq!(series.meter_depth(), None);
        assert_eq!(series.delta_t(), None);
        assert!(!series.is_sns());
        assert_eq!(series, CurrentTimeSeries::empty());
        assert!(series.time_indexes().is_empty());
        assert_eq!(series.contextualise_time(100.0).unwrap(), Vec::<f64>::new());
    }

    #[test]
    fn test_shape_mismatch() {
        let result = CurrentTimeSeries::new(
            vec![0.0, 1.0],
            vec![0.1],
            vec![10.0, 20.0],
            SeriesOptions::default(),
        );
        match result.unwrap_err() {
            CurrentMeterError::ShapeMismatch {
                time,
                speed,
                direction,
            } => {
                assert_eq!((time, speed, direction), (2, 1, 2));
            }
            other => panic!("Expected ShapeMismatch, got {other:?}"),
        }

        assert!(
            CurrentTimeSeries::new(vec![], vec![0.1], vec![], SeriesOptions::default()).is_err()
        );
    }

    #[test]
    fn test_time_indexes() {
        let series = sample_series();
        let indexes = series.time_indexes();
        assert_eq!(indexes.len(), series.number_of_time_steps());
        assert_eq!(indexes.first(), Some(&1));
        assert_eq!(indexes.last(), Some(&4));
        assert!(indexes.windows(2).all(|w| w[1] - w[0] == 1));
    }

    #[test]
    fn test_contextualise_time_hourly_fifteen_days() {
        let n = 360;
        let series = CurrentTimeSeries::new(
            (0..n).map(|i| i as f64 * 3600.0).collect(),
            vec![0.1; n],
            vec![45.0; n],
            SeriesOptions::default().with_delta_t(3600.0),
        )
        .unwrap();

        let anchor = 737_000.25;
        let axis = series.contextualise_time(anchor).unwrap();
        assert_eq!(axis.len(), 360);
        assert_eq!(axis[0], anchor);
        assert!((axis[359] - (anchor + 15.0 - 1.0 / 24.0)).abs() < 1e-8);
    }

    #[test]
    fn test_contextualise_time_ignores_raw_time() {
        let series = CurrentTimeSeries::new(
            vec![100.0, 7.0, -3.0],
            vec![0.1; 3],
            vec![0.0; 3],
            SeriesOptions::default().with_delta_t(43_200.0),
        )
        .unwrap();
        assert_eq!(series.contextualise_time(10.0).unwrap(), vec![10.0, 10.5, 11.0]);
    }

    #[test]
    fn test_contextualise_time_requires_delta_t() {
        let series =
            CurrentTimeSeries::new(vec![0.0], vec![0.1], vec![0.0], SeriesOptions::default())
                .unwrap();
        assert!(matches!(
            series.contextualise_time(0.0),
            Err(CurrentMeterError::MissingMetadata { field: "deltaT" })
        ));
    }

    #[test]
    fn test_mean_speed() {
        let series = sample_series();
        assert!((series.mean_speed().unwrap() - 0.25).abs() < 1e-12);

        let empty = CurrentTimeSeries::empty();
        assert!(matches!(
            empty.mean_speed(),
            Err(CurrentMeterError::EmptySeries { .. })
        ));
    }

    #[test]
    fn test_scale_speed_preserves_direction() {
        for factor in [2.5, 0.0, -1.5] {
            let mut series = sample_series();
            let before = series.clone();
            series.scale_speed(factor);

            assert_eq!(
                series
                    .direction()
                    .iter()
                    .map(|d| d.to_bits())
                    .collect::<Vec<_>>(),
                before
                    .direction()
                    .iter()
                    .map(|d| d.to_bits())
                    .collect::<Vec<_>>()
            );
            for i in 0..series.len() {
                assert!((series.speed()[i] - before.speed()[i] * factor).abs() < 1e-12);
                assert!((series.u()[i] - before.u()[i] * factor).abs() < 1e-12);
                assert!((series.v()[i] - before.v()[i] * factor).abs() < 1e-12);
            }
            assert_eq!(series.time(), before.time());
            assert_eq!(series.options(), before.options());
        }
    }

    #[test]
    fn test_scaled_speed_leaves_receiver() {
        let series = sample_series();
        let doubled = series.scaled_speed(2.0);
        assert_eq!(series.speed(), &[0.10, 0.20, 0.30, 0.40]);
        assert!((doubled.speed()[3] - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_speed_statistics() {
        let stats = sample_series().speed_statistics().unwrap();
        assert_eq!(stats.count, 4);
        assert!((stats.mean - 0.25).abs() < 1e-12);
        assert_eq!(stats.min, 0.10);
        assert_eq!(stats.max, 0.40);
        assert!((stats.std_dev - 0.0125f64.sqrt()).abs() < 1e-12);

        assert!(CurrentTimeSeries::empty().speed_statistics().is_err());
        assert!(CurrentTimeSeries::empty().max_speed().is_err());
    }

    #[test]
    fn test_residual_current() {
        let series = CurrentTimeSeries::new(
            vec![0.0, 1.0],
            vec![1.0, 1.0],
            vec![90.0, 90.0],
            SeriesOptions::default(),
        )
        .unwrap();
        let (u, v) = series.residual_current().unwrap();
        assert!((u - 1.0).abs() < 1e-12);
        assert!(v.abs() < 1e-12);
        assert!((series.residual_direction().unwrap() - 90.0).abs() < 1e-9);

        let westward = series.scaled_speed(-1.0);
        assert!((westward.residual_direction().unwrap() - 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_to_si_applies_factors_explicitly() {
        let series = CurrentTimeSeries::new(
            vec![0.0, 10.0],
            vec![50.0, 100.0],
            vec![90.0, 0.0],
            SeriesOptions::default()
                .with_depths(-490.0, -2720.0)
                .with_delta_t(10.0)
                .with_site_tide(210.0)
                .with_conversion_factors(0.01, 60.0),
        )
        .unwrap();

        // Construction never applies the factors
        assert_eq!(series.speed(), &[50.0, 100.0]);

        let si = series.to_si().unwrap();
        assert_eq!(si.time(), &[0.0, 600.0]);
        assert_eq!(si.delta_t(), Some(600.0));
        assert!((si.speed()[0] - 50.0 * 0.01 / 60.0).abs() < 1e-12);
        assert!((si.meter_depth().unwrap() + 4.9).abs() < 1e-9);
        assert!((si.site_depth().unwrap() + 27.2).abs() < 1e-9);
        assert!((si.site_tide().unwrap() - 2.1).abs() < 1e-9);
        assert_eq!(si.direction(), series.direction());
        assert!((si.u()[0] - si.speed()[0]).abs() < 1e-12);
        assert_eq!(si.length_unit_conversion_factor(), 1.0);
        assert_eq!(si.time_unit_conversion_factor(), 1.0);
    }

    #[test]
    fn test_to_si_rejects_zero_factor() {
        let series = CurrentTimeSeries::new(
            vec![0.0],
            vec![1.0],
            vec![0.0],
            SeriesOptions::default().with_conversion_factors(1.0, 0.0),
        )
        .unwrap();
        assert!(matches!(
            series.to_si(),
            Err(CurrentMeterError::Configuration { .. })
        ));
    }

    #[test]
    fn test_rcm_record_height_above_bed() {
        let series = sample_series();
        let record = series.to_rcm_record(0.0).unwrap();
        assert!((record.height_above_bed.unwrap() - 22.3).abs() < TOL);
        assert_eq!(record.speed, series.speed());
        assert_eq!(record.direction, series.direction());
        assert_eq!(record.u, series.u());
        assert_eq!(record.v, series.v());
        assert_eq!(record.time.len(), series.len());

        let default = series.to_rcm_record_default().unwrap();
        assert_eq!(default.time[0], DEFAULT_ANCHOR_DAYS);
    }

    #[test]
    fn test_rcm_record_requires_depths() {
        let series = CurrentTimeSeries::new(
            vec![0.0],
            vec![0.1],
            vec![0.0],
            SeriesOptions::default().with_delta_t(60.0),
        )
        .unwrap();
        assert!(matches!(
            series.to_rcm_record_default(),
            Err(CurrentMeterError::MissingMetadata { field: "siteDepth" })
        ));
    }

    #[test]
    fn test_out_of_range_directions() {
        let series = CurrentTimeSeries::new(
            vec![0.0, 1.0, 2.0],
            vec![0.1; 3],
            vec![-5.0, 360.0, 359.9],
            SeriesOptions::default(),
        )
        .unwrap();
        assert_eq!(series.out_of_range_directions(), 2);
    }
}
