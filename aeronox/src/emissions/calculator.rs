//! Per-operation fuel and emissions calculator.
//!
//! Walks the flown trajectory pairwise, integrates fuel from the mean
//! segment fuel flow and applies the selected emissions model. Segments can
//! be filtered by altitude and cumulative ground distance windows.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::emissions::bffm2::Bffm2EmissionsGenerator;
use crate::emissions::lto::{lto_phase, LtoEngine};
use crate::emissions::{EmissionValues, EmissionsOperationOutput, EmissionsSegmentOutput};
use crate::error::{CalculationError, ModelError};
use crate::operation::{Operation, PerformanceOutput};
use crate::run::emissions::EmissionsRunSpec;
use crate::PRECISION;

/// How segment emission indexes are obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmissionsModel {
    /// Fuel burn only, no pollutants.
    FuelOnly,
    /// Certified LTO indexes of the segment's phase.
    Lto,
    /// Fuel flow interpolation of the certified indexes.
    #[default]
    Bffm2,
}

/// Altitude and cumulative ground distance windows limiting which segments
/// contribute.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmissionsFilters {
    minimum_altitude: f64,
    maximum_altitude: f64,
    minimum_cumulative_ground_distance: f64,
    maximum_cumulative_ground_distance: f64,
}

impl Default for EmissionsFilters {
    fn default() -> Self {
        Self {
            minimum_altitude: f64::NEG_INFINITY,
            maximum_altitude: f64::INFINITY,
            minimum_cumulative_ground_distance: f64::NEG_INFINITY,
            maximum_cumulative_ground_distance: f64::INFINITY,
        }
    }
}

impl EmissionsFilters {
    pub fn set_altitude_window(&mut self, minimum: f64, maximum: f64) -> Result<(), ModelError> {
        if minimum >= maximum {
            return Err(ModelError::InvalidFilterWindow { minimum, maximum });
        }
        self.minimum_altitude = minimum;
        self.maximum_altitude = maximum;
        Ok(())
    }

    pub fn set_distance_window(&mut self, minimum: f64, maximum: f64) -> Result<(), ModelError> {
        if minimum >= maximum {
            return Err(ModelError::InvalidFilterWindow { minimum, maximum });
        }
        self.minimum_cumulative_ground_distance = minimum;
        self.maximum_cumulative_ground_distance = maximum;
        Ok(())
    }

    fn point_after_distance_limits(&self, cumulative_ground_distance: f64) -> bool {
        cumulative_ground_distance > self.maximum_cumulative_ground_distance
    }

    fn segment_in_distance_limits(&self, start: f64, end: f64) -> bool {
        start >= self.minimum_cumulative_ground_distance
            && end < self.maximum_cumulative_ground_distance
    }

    fn segment_in_altitude_limits(&self, lower: f64, higher: f64) -> bool {
        lower >= self.minimum_altitude && higher <= self.maximum_altitude
    }
}

/// Model data resolved once per operation.
#[derive(Clone, Copy)]
enum ModelData<'a> {
    FuelOnly,
    Lto(&'a LtoEngine),
    Bffm2(&'a LtoEngine, &'a Bffm2EmissionsGenerator),
}

/// Emissions calculator for one run.
pub struct EmissionsCalculator {
    spec: Arc<EmissionsRunSpec>,
    engines: HashMap<String, Arc<LtoEngine>>,
    generators: HashMap<String, Bffm2EmissionsGenerator>,
}

impl EmissionsCalculator {
    pub fn new(spec: Arc<EmissionsRunSpec>) -> Self {
        Self {
            spec,
            engines: HashMap::new(),
            generators: HashMap::new(),
        }
    }

    /// Registers an engine, fitting its BFFM2 curves when the model needs
    /// them.
    pub fn add_engine(&mut self, engine: &Arc<LtoEngine>) {
        if self.spec.model == EmissionsModel::Bffm2 {
            self.generators
                .entry(engine.name.clone())
                .or_insert_with(|| Bffm2EmissionsGenerator::new(engine));
        }
        self.engines
            .entry(engine.name.clone())
            .or_insert_with(|| Arc::clone(engine));
    }

    fn resolve_engine(&self, operation: &Operation) -> Result<&LtoEngine, CalculationError> {
        let name = operation
            .aircraft()
            .lto_engine
            .as_ref()
            .map(|engine| engine.name.as_str())
            .ok_or_else(|| CalculationError::MissingLtoEngine {
                operation: operation.name().to_owned(),
            })?;
        self.engines.get(name).map(Arc::as_ref).ok_or_else(|| {
            CalculationError::MissingEmissionsGenerator {
                engine: name.to_owned(),
            }
        })
    }

    /// Fuel and emissions of one operation.
    pub fn calculate(
        &self,
        operation: &Operation,
        output: &PerformanceOutput,
    ) -> Result<EmissionsOperationOutput, CalculationError> {
        let model = match self.spec.model {
            EmissionsModel::FuelOnly => ModelData::FuelOnly,
            EmissionsModel::Lto => ModelData::Lto(self.resolve_engine(operation)?),
            EmissionsModel::Bffm2 => {
                let engine = self.resolve_engine(operation)?;
                let generator = self.generators.get(&engine.name).ok_or_else(|| {
                    CalculationError::MissingEmissionsGenerator {
                        engine: engine.name.clone(),
                    }
                })?;
                ModelData::Bffm2(engine, generator)
            }
        };

        let atmosphere = self.spec.atmospheres.atmosphere(operation.time());
        let filters = &self.spec.filters;
        let multiplier = operation.aircraft().engine_count as f64 * operation.count();

        let mut out = EmissionsOperationOutput::new();
        for (index, ((start_distance, start), (end_distance, end))) in
            output.segments().enumerate()
        {
            if filters.point_after_distance_limits(*start_distance) {
                break;
            }
            if !filters.segment_in_distance_limits(*start_distance, *end_distance) {
                continue;
            }
            if !filters.segment_in_altitude_limits(
                start.altitude_msl.min(end.altitude_msl),
                start.altitude_msl.max(end.altitude_msl),
            ) {
                continue;
            }

            let fuel_flow = (start.fuel_flow_per_engine + end.fuel_flow_per_engine) / 2.0;
            if fuel_flow < PRECISION {
                continue;
            }
            let groundspeed = (start.groundspeed + end.groundspeed) / 2.0;
            let time = (end_distance - start_distance) / groundspeed;
            let fuel = fuel_flow * time * multiplier;

            let emissions = match model {
                ModelData::FuelOnly => EmissionValues::default(),
                ModelData::Lto(engine) => {
                    let phase = lto_phase(start.phase);
                    EmissionValues {
                        hc: engine.hc_index(phase) * fuel,
                        co: engine.co_index(phase) * fuel,
                        nox: engine.nox_index(phase) * fuel,
                        nvpm: engine.nvpm_index(phase) * fuel,
                        nvpm_number: engine.nvpm_number_index(phase) * fuel,
                    }
                }
                ModelData::Bffm2(engine, generator) => {
                    let altitude = (start.altitude_msl + end.altitude_msl) / 2.0;
                    let true_airspeed = (start.true_airspeed + end.true_airspeed) / 2.0;
                    let (hc, co, nox) =
                        generator.emission_indexes(fuel_flow, altitude, true_airspeed, &atmosphere);
                    let phase = lto_phase(start.phase);
                    EmissionValues {
                        hc: hc * fuel,
                        co: co * fuel,
                        nox: nox * fuel,
                        nvpm: engine.nvpm_index(phase) * fuel,
                        nvpm_number: engine.nvpm_number_index(phase) * fuel,
                    }
                }
            };

            out.add_segment(EmissionsSegmentOutput {
                index,
                fuel,
                emissions,
            });
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atmosphere::AtmosphereSeries;
    use crate::coord::Position;
    use crate::operation::{Aircraft, FlightPhase, OperationKind, ProfilePoint};
    use chrono::{TimeZone, Utc};

    fn spec(model: EmissionsModel, filters: EmissionsFilters) -> Arc<EmissionsRunSpec> {
        Arc::new(EmissionsRunSpec {
            model,
            filters,
            atmospheres: AtmosphereSeries::default(),
            save_segment_results: true,
        })
    }

    fn engine() -> Arc<LtoEngine> {
        let mut engine = LtoEngine::new("test-engine");
        engine.fuel_flows = [0.2, 0.6, 1.9, 2.4];
        engine.emission_indexes_hc = [0.0015, 0.0001, 0.00005, 0.00005];
        engine.emission_indexes_co = [0.019, 0.002, 0.00004, 0.00004];
        engine.emission_indexes_nox = [0.0047, 0.0125, 0.0197, 0.0249];
        Arc::new(engine)
    }

    fn operation(engine: Option<Arc<LtoEngine>>) -> Operation {
        let mut aircraft = Aircraft::new("test-aircraft");
        aircraft.lto_engine = engine;
        Operation::new(
            "dep-1",
            OperationKind::Departure,
            1.0,
            Utc.with_ymd_and_hms(2023, 6, 1, 12, 0, 0).unwrap(),
            Arc::new(aircraft),
        )
    }

    fn climb_profile() -> PerformanceOutput {
        let point = |altitude: f64, fuel_flow: f64, phase: FlightPhase| ProfilePoint {
            position: Position::new(0.0, 0.0),
            altitude_msl: altitude,
            true_airspeed: 100.0,
            groundspeed: 100.0,
            corrected_net_thrust_per_engine: 100000.0,
            bank_angle: 0.0,
            fuel_flow_per_engine: fuel_flow,
            phase,
        };
        let mut output = PerformanceOutput::new();
        output.push(0.0, point(0.0, 1.0, FlightPhase::TakeoffRoll)).unwrap();
        output.push(1000.0, point(100.0, 1.0, FlightPhase::InitialClimb)).unwrap();
        output.push(3000.0, point(500.0, 0.8, FlightPhase::Climb)).unwrap();
        output
    }

    #[test]
    fn test_fuel_only_integrates_fuel() {
        let spec = spec(EmissionsModel::FuelOnly, EmissionsFilters::default());
        let calculator = EmissionsCalculator::new(spec);

        let out = calculator
            .calculate(&operation(None), &climb_profile())
            .unwrap();
        // segment 1: 1.0 kg/s * 10 s * 2 engines, segment 2: 0.9 * 20 * 2
        assert!((out.fuel() - (20.0 + 36.0)).abs() < 1e-9);
        assert_eq!(*out.emissions(), EmissionValues::default());
        assert_eq!(out.segments().len(), 2);
    }

    #[test]
    fn test_lto_model_uses_start_point_phase() {
        let spec = spec(EmissionsModel::Lto, EmissionsFilters::default());
        let mut calculator = EmissionsCalculator::new(spec);
        let engine = engine();
        calculator.add_engine(&engine);

        let out = calculator
            .calculate(&operation(Some(Arc::clone(&engine))), &climb_profile())
            .unwrap();
        // takeoff indexes on the first segment, climb out on the second
        let expected_nox = 0.0249 * 20.0 + 0.0197 * 36.0;
        assert!((out.emissions().nox - expected_nox).abs() < 1e-9);
    }

    #[test]
    fn test_missing_engine_is_an_error() {
        let spec = spec(EmissionsModel::Lto, EmissionsFilters::default());
        let calculator = EmissionsCalculator::new(spec);
        assert!(matches!(
            calculator.calculate(&operation(None), &climb_profile()),
            Err(CalculationError::MissingLtoEngine { .. })
        ));
    }

    #[test]
    fn test_altitude_filter_drops_segments() {
        let mut filters = EmissionsFilters::default();
        filters.set_altitude_window(0.0, 150.0).unwrap();
        let spec = spec(EmissionsModel::FuelOnly, filters);
        let calculator = EmissionsCalculator::new(spec);

        let out = calculator
            .calculate(&operation(None), &climb_profile())
            .unwrap();
        assert_eq!(out.segments().len(), 1);
        assert!((out.fuel() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_distance_filter_stops_the_walk() {
        let mut filters = EmissionsFilters::default();
        filters.set_distance_window(0.0, 900.0).unwrap();
        let spec = spec(EmissionsModel::FuelOnly, filters);
        let calculator = EmissionsCalculator::new(spec);

        let out = calculator
            .calculate(&operation(None), &climb_profile())
            .unwrap();
        assert!(out.segments().is_empty());
    }

    #[test]
    fn test_filter_windows_validated() {
        let mut filters = EmissionsFilters::default();
        assert!(filters.set_altitude_window(100.0, 100.0).is_err());
        assert!(filters.set_distance_window(500.0, 100.0).is_err());
    }

    #[test]
    fn test_bffm2_model_produces_positive_indexes() {
        let spec = spec(EmissionsModel::Bffm2, EmissionsFilters::default());
        let mut calculator = EmissionsCalculator::new(spec);
        let engine = engine();
        calculator.add_engine(&engine);

        let out = calculator
            .calculate(&operation(Some(Arc::clone(&engine))), &climb_profile())
            .unwrap();
        assert!(out.emissions().nox > 0.0);
        assert!(out.emissions().co > 0.0);
        assert!(out.fuel() > 0.0);
    }
}
