//! Aircraft, operations and performance output.
//!
//! An [`Operation`] is one arrival or departure of an [`Aircraft`], possibly
//! counted more than once (fractional counts model annualized traffic). Its
//! flown trajectory is a [`PerformanceOutput`]: profile points keyed by
//! cumulative ground distance, which the noise and emissions calculators walk
//! pairwise as segments.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::coord::Position;
use crate::emissions::lto::LtoEngine;
use crate::error::ModelError;
use crate::noise::doc29::Doc29Noise;

/// Phase of flight attached to each profile point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlightPhase {
    Approach,
    LandingRoll,
    TakeoffRoll,
    InitialClimb,
    Climb,
}

/// Arrival or departure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationKind {
    Arrival,
    Departure,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Arrival => write!(f, "arrival"),
            OperationKind::Departure => write!(f, "departure"),
        }
    }
}

/// Aircraft data referenced by operations.
#[derive(Debug, Clone)]
pub struct Aircraft {
    pub name: String,
    pub engine_count: usize,
    /// Doc29 noise record, required for noise runs.
    pub doc29_noise: Option<Arc<Doc29Noise>>,
    /// Fixed level adjustment added to every arrival NPD lookup, dB.
    pub noise_delta_arrivals: f64,
    /// Fixed level adjustment added to every departure NPD lookup, dB.
    pub noise_delta_departures: f64,
    /// LTO certification data, required for LTO and BFFM2 emissions runs.
    pub lto_engine: Option<Arc<LtoEngine>>,
}

impl Aircraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            engine_count: 2,
            doc29_noise: None,
            noise_delta_arrivals: 0.0,
            noise_delta_departures: 0.0,
            lto_engine: None,
        }
    }

    pub fn noise_delta(&self, kind: OperationKind) -> f64 {
        match kind {
            OperationKind::Arrival => self.noise_delta_arrivals,
            OperationKind::Departure => self.noise_delta_departures,
        }
    }
}

/// A single flight movement.
#[derive(Debug, Clone)]
pub struct Operation {
    name: String,
    kind: OperationKind,
    count: f64,
    time: DateTime<Utc>,
    aircraft: Arc<Aircraft>,
}

impl Operation {
    pub fn new(
        name: impl Into<String>,
        kind: OperationKind,
        count: f64,
        time: DateTime<Utc>,
        aircraft: Arc<Aircraft>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            count,
            time,
            aircraft,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn count(&self) -> f64 {
        self.count
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    pub fn time_of_day(&self) -> NaiveTime {
        self.time.time()
    }

    pub fn aircraft(&self) -> &Arc<Aircraft> {
        &self.aircraft
    }
}

/// State of the aircraft at one point of the flown trajectory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfilePoint {
    pub position: Position,
    /// Geometric altitude above mean sea level, m.
    pub altitude_msl: f64,
    /// True airspeed, m/s.
    pub true_airspeed: f64,
    /// Groundspeed, m/s.
    pub groundspeed: f64,
    /// Corrected net thrust per engine, N.
    pub corrected_net_thrust_per_engine: f64,
    /// Bank angle, radians. Positive banks towards the turn center.
    pub bank_angle: f64,
    /// Fuel flow per engine, kg/s.
    pub fuel_flow_per_engine: f64,
    pub phase: FlightPhase,
}

/// Profile points keyed by strictly increasing cumulative ground distance.
#[derive(Debug, Clone, Default)]
pub struct PerformanceOutput {
    points: Vec<(f64, ProfilePoint)>,
}

impl PerformanceOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a point. Cumulative ground distance must exceed the previous
    /// point's.
    pub fn push(&mut self, cumulative_ground_distance: f64, point: ProfilePoint) -> Result<(), ModelError> {
        if let Some((previous, _)) = self.points.last() {
            if cumulative_ground_distance <= *previous {
                return Err(ModelError::NonMonotonicDistance {
                    previous: *previous,
                    next: cumulative_ground_distance,
                });
            }
        }
        self.points.push((cumulative_ground_distance, point));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[(f64, ProfilePoint)] {
        &self.points
    }

    /// Consecutive point pairs.
    pub fn segments(&self) -> impl Iterator<Item = (&(f64, ProfilePoint), &(f64, ProfilePoint))> {
        self.points.windows(2).map(|pair| (&pair[0], &pair[1]))
    }
}

/// All operations of a run together with their flown trajectories.
#[derive(Debug, Clone, Default)]
pub struct PerformanceRunOutput {
    entries: Vec<(Arc<Operation>, Arc<PerformanceOutput>)>,
}

impl PerformanceRunOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, operation: Arc<Operation>, output: PerformanceOutput) {
        self.entries.push((operation, Arc::new(output)));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[(Arc<Operation>, Arc<PerformanceOutput>)] {
        &self.entries
    }

    pub fn operations(&self) -> impl Iterator<Item = &Arc<Operation>> {
        self.entries.iter().map(|(operation, _)| operation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn point(altitude: f64) -> ProfilePoint {
        ProfilePoint {
            position: Position::new(0.0, 0.0),
            altitude_msl: altitude,
            true_airspeed: 80.0,
            groundspeed: 80.0,
            corrected_net_thrust_per_engine: 50000.0,
            bank_angle: 0.0,
            fuel_flow_per_engine: 0.5,
            phase: FlightPhase::Climb,
        }
    }

    #[test]
    fn test_push_requires_increasing_distance() {
        let mut output = PerformanceOutput::new();
        output.push(0.0, point(0.0)).unwrap();
        output.push(100.0, point(50.0)).unwrap();
        assert!(output.push(100.0, point(60.0)).is_err());
        assert!(output.push(50.0, point(60.0)).is_err());
        assert_eq!(output.len(), 2);
    }

    #[test]
    fn test_segments_are_pairwise() {
        let mut output = PerformanceOutput::new();
        output.push(0.0, point(0.0)).unwrap();
        output.push(100.0, point(50.0)).unwrap();
        output.push(250.0, point(120.0)).unwrap();
        let segments: Vec<_> = output.segments().collect();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].0 .0, 100.0);
        assert_eq!(segments[1].1 .0, 250.0);
    }

    #[test]
    fn test_operation_time_of_day() {
        let aircraft = Arc::new(Aircraft::new("A320"));
        let time = Utc.with_ymd_and_hms(2023, 6, 1, 22, 30, 0).unwrap();
        let operation = Operation::new("dep-1", OperationKind::Departure, 1.0, time, aircraft);
        assert_eq!(
            operation.time_of_day(),
            NaiveTime::from_hms_opt(22, 30, 0).unwrap()
        );
    }
}
