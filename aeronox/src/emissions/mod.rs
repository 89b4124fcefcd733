//! Emissions model: LTO cycle data, the BFFM2 fuel flow method and the
//! per-operation calculator.

pub mod bffm2;
pub mod calculator;
pub mod lto;

use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

/// Pollutant masses in kg (nvPM number is a particle count).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EmissionValues {
    pub hc: f64,
    pub co: f64,
    pub nox: f64,
    pub nvpm: f64,
    pub nvpm_number: f64,
}

impl EmissionValues {
    pub fn new(hc: f64, co: f64, nox: f64) -> Self {
        Self {
            hc,
            co,
            nox,
            nvpm: 0.0,
            nvpm_number: 0.0,
        }
    }
}

impl AddAssign for EmissionValues {
    fn add_assign(&mut self, rhs: Self) {
        self.hc += rhs.hc;
        self.co += rhs.co;
        self.nox += rhs.nox;
        self.nvpm += rhs.nvpm;
        self.nvpm_number += rhs.nvpm_number;
    }
}

/// Fuel and emissions of one trajectory segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmissionsSegmentOutput {
    /// Index of the segment in the flown trajectory.
    pub index: usize,
    /// Fuel burned, kg.
    pub fuel: f64,
    pub emissions: EmissionValues,
}

/// Fuel and emissions of one operation, with optional per-segment detail.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmissionsOperationOutput {
    segments: Vec<EmissionsSegmentOutput>,
    fuel: f64,
    emissions: EmissionValues,
}

impl EmissionsOperationOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_segment(&mut self, segment: EmissionsSegmentOutput) {
        self.fuel += segment.fuel;
        self.emissions += segment.emissions;
        self.segments.push(segment);
    }

    /// Drops the per-segment detail, keeping the totals.
    pub fn clear_segments(&mut self) {
        self.segments.clear();
        self.segments.shrink_to_fit();
    }

    pub fn segments(&self) -> &[EmissionsSegmentOutput] {
        &self.segments
    }

    /// Total fuel burned, kg.
    pub fn fuel(&self) -> f64 {
        self.fuel
    }

    pub fn emissions(&self) -> &EmissionValues {
        &self.emissions
    }
}
