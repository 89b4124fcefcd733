//! LTO engine certification data.
//!
//! Certified fuel flows and emission indexes for the four LTO cycle phases,
//! as published in the ICAO engine emissions databank. Profile points map to
//! an LTO phase through their flight phase.

use serde::{Deserialize, Serialize};

use crate::operation::FlightPhase;

/// The four certified phases of the landing and takeoff cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LtoPhase {
    Idle,
    Approach,
    ClimbOut,
    Takeoff,
}

/// LTO phase a profile point contributes to.
pub fn lto_phase(phase: FlightPhase) -> LtoPhase {
    match phase {
        FlightPhase::Approach | FlightPhase::LandingRoll => LtoPhase::Approach,
        FlightPhase::TakeoffRoll | FlightPhase::InitialClimb => LtoPhase::Takeoff,
        FlightPhase::Climb => LtoPhase::ClimbOut,
    }
}

fn index(phase: LtoPhase) -> usize {
    match phase {
        LtoPhase::Idle => 0,
        LtoPhase::Approach => 1,
        LtoPhase::ClimbOut => 2,
        LtoPhase::Takeoff => 3,
    }
}

/// Certified engine data, indexed idle / approach / climb out / takeoff.
///
/// Fuel flows are in kg/s and emission indexes in kg per kg of fuel. nvPM
/// mass indexes are in kg per kg of fuel, nvPM number indexes in particles
/// per kg of fuel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LtoEngine {
    pub name: String,
    pub fuel_flows: [f64; 4],
    /// Installation corrections applied to the certified fuel flows.
    pub fuel_flow_correction_factors: [f64; 4],
    pub emission_indexes_hc: [f64; 4],
    pub emission_indexes_co: [f64; 4],
    pub emission_indexes_nox: [f64; 4],
    pub emission_indexes_nvpm: [f64; 4],
    pub emission_indexes_nvpm_number: [f64; 4],
}

impl LtoEngine {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fuel_flows: [0.0; 4],
            fuel_flow_correction_factors: [1.100, 1.020, 1.013, 1.010],
            emission_indexes_hc: [0.0; 4],
            emission_indexes_co: [0.0; 4],
            emission_indexes_nox: [0.0; 4],
            emission_indexes_nvpm: [0.0; 4],
            emission_indexes_nvpm_number: [0.0; 4],
        }
    }

    pub fn fuel_flow(&self, phase: LtoPhase) -> f64 {
        self.fuel_flows[index(phase)]
    }

    /// Certified fuel flow with the installation correction applied.
    pub fn corrected_fuel_flow(&self, phase: LtoPhase) -> f64 {
        self.fuel_flows[index(phase)] * self.fuel_flow_correction_factors[index(phase)]
    }

    pub fn hc_index(&self, phase: LtoPhase) -> f64 {
        self.emission_indexes_hc[index(phase)]
    }

    pub fn co_index(&self, phase: LtoPhase) -> f64 {
        self.emission_indexes_co[index(phase)]
    }

    pub fn nox_index(&self, phase: LtoPhase) -> f64 {
        self.emission_indexes_nox[index(phase)]
    }

    pub fn nvpm_index(&self, phase: LtoPhase) -> f64 {
        self.emission_indexes_nvpm[index(phase)]
    }

    pub fn nvpm_number_index(&self, phase: LtoPhase) -> f64 {
        self.emission_indexes_nvpm_number[index(phase)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flight_phase_mapping() {
        assert_eq!(lto_phase(FlightPhase::Approach), LtoPhase::Approach);
        assert_eq!(lto_phase(FlightPhase::LandingRoll), LtoPhase::Approach);
        assert_eq!(lto_phase(FlightPhase::TakeoffRoll), LtoPhase::Takeoff);
        assert_eq!(lto_phase(FlightPhase::InitialClimb), LtoPhase::Takeoff);
        assert_eq!(lto_phase(FlightPhase::Climb), LtoPhase::ClimbOut);
    }

    #[test]
    fn test_corrected_fuel_flow_applies_installation_factor() {
        let mut engine = LtoEngine::new("CFM56-5B4");
        engine.fuel_flows = [0.1, 0.3, 0.9, 1.1];
        assert!((engine.corrected_fuel_flow(LtoPhase::Idle) - 0.11).abs() < 1e-12);
        assert!((engine.corrected_fuel_flow(LtoPhase::Takeoff) - 1.111).abs() < 1e-12);
        assert_eq!(engine.fuel_flow(LtoPhase::Takeoff), 1.1);
    }

    #[test]
    fn test_phase_indexed_getters() {
        let mut engine = LtoEngine::new("engine");
        engine.emission_indexes_nox = [0.004, 0.008, 0.02, 0.03];
        assert_eq!(engine.nox_index(LtoPhase::Idle), 0.004);
        assert_eq!(engine.nox_index(LtoPhase::ClimbOut), 0.02);
    }
}
