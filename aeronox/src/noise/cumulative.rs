//! Cumulative noise metrics and their per-receptor accumulation.
//!
//! A [`NoiseCumulativeMetric`] weights single events by time of day and
//! accumulates them over a run into counts, maxima and an equivalent
//! exposure level. The usual Leq family (Leq, day, night, Ldn, Lden) is
//! available through [`NoiseCumulativeMetric::standard`].

use std::collections::BTreeMap;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::noise::NoiseSingleEventOutput;
use crate::PRECISION;

/// The conventional day / evening / night weighted metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StandardMetric {
    /// Equivalent level over the averaging time, all day.
    Leq,
    /// Day only (07:00 to 23:00).
    Leqd,
    /// Night only (23:00 to 07:00).
    Leqn,
    /// Day-night level, night events weighted by 10.
    Ldn,
    /// Day-evening-night level, evening by 3.16, night by 10.
    Lden,
}

fn hour(h: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// Averaging time constant for a duration in seconds.
fn averaging_constant(seconds: f64) -> f64 {
    10.0 * seconds.log10()
}

/// A time-of-day weighted cumulative metric.
#[derive(Debug, Clone)]
pub struct NoiseCumulativeMetric {
    pub name: String,
    threshold: f64,
    averaging_time_constant: f64,
    /// Weight per start time. The entry at midnight always exists and acts
    /// as the base weight.
    weights: BTreeMap<NaiveTime, f64>,
    number_above_thresholds: Vec<f64>,
}

impl NoiseCumulativeMetric {
    /// A metric with threshold 0 dB, a 24 h averaging time and weight 1 at
    /// all times.
    pub fn new(name: impl Into<String>) -> Self {
        let mut weights = BTreeMap::new();
        weights.insert(NaiveTime::MIN, 1.0);
        Self {
            name: name.into(),
            threshold: 0.0,
            averaging_time_constant: averaging_constant(86400.0),
            weights,
            number_above_thresholds: Vec::new(),
        }
    }

    /// One of the conventional metrics with its standard weights.
    pub fn standard(metric: StandardMetric) -> Self {
        let mut out = match metric {
            StandardMetric::Leq => Self::new("Leq"),
            StandardMetric::Leqd => {
                let mut out = Self::new("Leq day");
                out.set_base_weight(0.0);
                out.weights.insert(hour(7), 1.0);
                out.weights.insert(hour(19), 1.0);
                out.weights.insert(hour(23), 0.0);
                out
            }
            StandardMetric::Leqn => {
                let mut out = Self::new("Leq night");
                out.set_base_weight(1.0);
                out.weights.insert(hour(7), 0.0);
                out.weights.insert(hour(19), 0.0);
                out.weights.insert(hour(23), 1.0);
                out
            }
            StandardMetric::Ldn => {
                let mut out = Self::new("Ldn");
                out.set_base_weight(10.0);
                out.weights.insert(hour(7), 1.0);
                out.weights.insert(hour(22), 10.0);
                out
            }
            StandardMetric::Lden => {
                let mut out = Self::new("Lden");
                out.set_base_weight(10.0);
                out.weights.insert(hour(7), 1.0);
                out.weights.insert(hour(19), 3.162);
                out.weights.insert(hour(23), 10.0);
                out
            }
        };
        out.averaging_time_constant = averaging_constant(86400.0);
        out
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Single events below this LAmax are ignored, dB.
    pub fn set_threshold(&mut self, threshold: f64) -> Result<(), ModelError> {
        if !(threshold.is_finite() && threshold >= 0.0) {
            return Err(ModelError::NegativeQuantity("threshold", threshold));
        }
        self.threshold = threshold;
        Ok(())
    }

    pub fn averaging_time_constant(&self) -> f64 {
        self.averaging_time_constant
    }

    /// Subtracted from the summed exposure, dB.
    pub fn set_averaging_time_constant(&mut self, constant: f64) -> Result<(), ModelError> {
        if !(constant.is_finite() && constant >= 0.0) {
            return Err(ModelError::NegativeQuantity("averaging time constant", constant));
        }
        self.averaging_time_constant = constant;
        Ok(())
    }

    /// Sets the averaging time constant from a duration in seconds.
    pub fn set_averaging_time_to_duration(&mut self, seconds: f64) -> Result<(), ModelError> {
        if !(seconds.is_finite() && seconds > 0.0) {
            return Err(ModelError::NegativeQuantity("averaging duration", seconds));
        }
        self.averaging_time_constant = averaging_constant(seconds);
        Ok(())
    }

    /// Weight applied from midnight until the first added time.
    pub fn set_base_weight(&mut self, weight: f64) {
        self.weights.insert(NaiveTime::MIN, weight);
    }

    /// Weight applied from `time` until the next entry.
    pub fn add_weight(&mut self, time: NaiveTime, weight: f64) -> Result<(), ModelError> {
        if !(weight.is_finite() && weight >= 0.0) {
            return Err(ModelError::InvalidWeight(weight));
        }
        self.weights.insert(time, weight);
        Ok(())
    }

    /// Weight in effect at a time of day.
    pub fn weight(&self, time: NaiveTime) -> f64 {
        self.weights
            .range(..=time)
            .next_back()
            .map(|(_, weight)| *weight)
            .unwrap_or(1.0)
    }

    /// LAmax thresholds for the number-above counts, dB.
    pub fn number_above_thresholds(&self) -> &[f64] {
        &self.number_above_thresholds
    }

    pub fn add_number_above_threshold(&mut self, threshold: f64) -> Result<(), ModelError> {
        if !(threshold.is_finite() && threshold >= 0.0) {
            return Err(ModelError::NegativeQuantity("number above threshold", threshold));
        }
        self.number_above_thresholds.push(threshold);
        Ok(())
    }
}

/// Per-receptor accumulation of one cumulative metric over a run.
#[derive(Debug, Clone, Default)]
pub struct NoiseCumulativeOutput {
    /// Operation count contributing at each receptor.
    pub count: Vec<f64>,
    /// Weighted operation count at each receptor.
    pub count_weighted: Vec<f64>,
    /// Highest single event LAmax, dB.
    pub maximum_absolute: Vec<f64>,
    /// Weighted energy average of the LAmax values, dB.
    pub maximum_average: Vec<f64>,
    /// Equivalent exposure level, dB.
    pub exposure: Vec<f64>,
    /// Operation counts above each number-above threshold, per receptor.
    pub number_above: Vec<Vec<f64>>,
}

impl NoiseCumulativeOutput {
    pub fn new(receptor_count: usize, number_above_count: usize) -> Self {
        Self {
            count: vec![0.0; receptor_count],
            count_weighted: vec![0.0; receptor_count],
            maximum_absolute: vec![0.0; receptor_count],
            maximum_average: vec![0.0; receptor_count],
            exposure: vec![0.0; receptor_count],
            number_above: vec![vec![0.0; number_above_count]; receptor_count],
        }
    }

    pub fn receptor_count(&self) -> usize {
        self.count.len()
    }

    /// Folds one single event into the running sums.
    pub fn accumulate(
        &mut self,
        event: &NoiseSingleEventOutput,
        operation_count: f64,
        weight: f64,
        metric: &NoiseCumulativeMetric,
    ) {
        let weighted_count = operation_count * weight;
        if weighted_count <= PRECISION {
            return;
        }

        for (receptor, (lamax, sel)) in event.values().iter().enumerate() {
            if *lamax >= metric.threshold() {
                self.count[receptor] += operation_count;
                self.count_weighted[receptor] += weighted_count;
                self.maximum_absolute[receptor] = self.maximum_absolute[receptor].max(*lamax);
                self.maximum_average[receptor] += weighted_count * 10f64.powf(lamax / 10.0);
                self.exposure[receptor] += weighted_count * 10f64.powf(sel / 10.0);
            }
            for (i, na_threshold) in metric.number_above_thresholds().iter().enumerate() {
                if *lamax >= *na_threshold && *lamax > metric.threshold() {
                    self.number_above[receptor][i] += operation_count;
                }
            }
        }
    }

    /// Converts the energy sums into levels once every event is in.
    pub fn finish(&mut self, metric: &NoiseCumulativeMetric) {
        for receptor in 0..self.receptor_count() {
            let maximum_sum = self.maximum_average[receptor];
            self.maximum_average[receptor] = if maximum_sum < PRECISION {
                0.0
            } else {
                10.0 * (maximum_sum.log10() - self.count[receptor].log10())
            };

            let exposure_sum = self.exposure[receptor];
            self.exposure[receptor] = if exposure_sum < PRECISION {
                0.0
            } else {
                10.0 * exposure_sum.log10() - metric.averaging_time_constant()
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(lamax: f64, sel: f64) -> NoiseSingleEventOutput {
        NoiseSingleEventOutput::new(vec![(lamax, sel)])
    }

    #[test]
    fn test_weight_lookup_uses_last_entry_at_or_before() {
        let metric = NoiseCumulativeMetric::standard(StandardMetric::Lden);
        assert_eq!(metric.weight(hour(3)), 10.0);
        assert_eq!(metric.weight(hour(7)), 1.0);
        assert_eq!(metric.weight(hour(12)), 1.0);
        assert_eq!(metric.weight(hour(20)), 3.162);
        assert_eq!(metric.weight(NaiveTime::from_hms_opt(23, 30, 0).unwrap()), 10.0);
    }

    #[test]
    fn test_day_and_night_metrics_partition_the_day() {
        let day = NoiseCumulativeMetric::standard(StandardMetric::Leqd);
        let night = NoiseCumulativeMetric::standard(StandardMetric::Leqn);
        for h in 0..24 {
            let time = hour(h);
            assert_eq!(day.weight(time) + night.weight(time), 1.0, "hour {h}");
        }
    }

    #[test]
    fn test_exposure_sums_energy() {
        let mut metric = NoiseCumulativeMetric::new("total exposure");
        metric.set_averaging_time_constant(0.0).unwrap();
        let mut output = NoiseCumulativeOutput::new(1, 0);

        // 80 dB once plus 83.0103 dB twice is 3e8 in energy
        output.accumulate(&event(90.0, 80.0), 1.0, 1.0, &metric);
        output.accumulate(&event(90.0, 83.010299956639812), 2.0, 1.0, &metric);
        output.finish(&metric);

        assert!((output.exposure[0] - 10.0 * (3e8f64).log10()).abs() < 1e-6);
        assert_eq!(output.count[0], 3.0);
    }

    #[test]
    fn test_threshold_excludes_quiet_events() {
        let mut metric = NoiseCumulativeMetric::new("thresholded");
        metric.set_threshold(85.0).unwrap();
        let mut output = NoiseCumulativeOutput::new(1, 0);

        output.accumulate(&event(80.0, 95.0), 1.0, 1.0, &metric);
        output.accumulate(&event(90.0, 95.0), 1.0, 1.0, &metric);
        output.finish(&metric);

        assert_eq!(output.count[0], 1.0);
        assert_eq!(output.maximum_absolute[0], 90.0);
    }

    #[test]
    fn test_number_above_counts_operations() {
        let mut metric = NoiseCumulativeMetric::new("na");
        metric.add_number_above_threshold(70.0).unwrap();
        metric.add_number_above_threshold(85.0).unwrap();
        let mut output = NoiseCumulativeOutput::new(1, 2);

        output.accumulate(&event(80.0, 85.0), 2.0, 1.0, &metric);
        output.accumulate(&event(90.0, 95.0), 1.0, 1.0, &metric);

        assert_eq!(output.number_above[0][0], 3.0);
        assert_eq!(output.number_above[0][1], 1.0);
    }

    #[test]
    fn test_zero_weight_events_are_skipped() {
        let metric = NoiseCumulativeMetric::new("unweighted");
        let mut output = NoiseCumulativeOutput::new(1, 0);
        output.accumulate(&event(90.0, 95.0), 1.0, 0.0, &metric);
        output.finish(&metric);
        assert_eq!(output.count[0], 0.0);
        assert_eq!(output.exposure[0], 0.0);
    }

    #[test]
    fn test_maximum_average_is_energy_mean_of_lamax() {
        let mut metric = NoiseCumulativeMetric::new("avg");
        metric.set_averaging_time_constant(0.0).unwrap();
        let mut output = NoiseCumulativeOutput::new(1, 0);

        output.accumulate(&event(80.0, 80.0), 1.0, 1.0, &metric);
        output.accumulate(&event(90.0, 90.0), 1.0, 1.0, &metric);
        output.finish(&metric);

        let expected = 10.0 * ((10f64.powf(8.0) + 10f64.powf(9.0)) / 2.0).log10();
        assert!((output.maximum_average[0] - expected).abs() < 1e-9);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut metric = NoiseCumulativeMetric::new("bad");
        assert!(metric.set_threshold(-1.0).is_err());
        assert!(metric.set_averaging_time_constant(f64::NAN).is_err());
        assert!(metric.add_weight(hour(7), -2.0).is_err());
        assert!(metric.set_averaging_time_to_duration(0.0).is_err());
    }
}
