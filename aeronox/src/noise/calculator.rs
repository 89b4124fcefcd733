//! Per-operation Doc29 noise calculator.
//!
//! Holds one generator per noise record, with the run's atmospheric
//! absorption already folded into the working NPD tables, and fans the
//! receptor loop out over the rayon thread pool. Per receptor the operation
//! LAmax is the maximum segment contribution and the SEL is the energy sum of
//! the segment exposures; segments beyond the run's maximum distance are
//! skipped, and a receptor no segment reaches reports (0, 0).

use std::collections::HashMap;
use std::sync::Arc;

use rayon::prelude::*;

use crate::error::CalculationError;
use crate::noise::doc29::{
    Doc29ArrivalGenerator, Doc29DepartureGenerator, Doc29Noise, SegmentContext,
};
use crate::noise::{NoiseSingleEventOutput, Receptor};
use crate::operation::{Operation, OperationKind, PerformanceOutput, ProfilePoint};
use crate::run::noise::NoiseRunSpec;
use crate::PRECISION;

/// Length and climb angle of a segment, shared by all receptors.
struct SegmentData {
    length: f64,
    angle: f64,
}

fn constant_segment_data(output: &PerformanceOutput) -> Vec<SegmentData> {
    output
        .segments()
        .map(|((distance1, point1), (distance2, point2))| {
            let ground_length = distance2 - distance1;
            let vertical_length = point2.altitude_msl - point1.altitude_msl;
            SegmentData {
                length: ground_length.hypot(vertical_length),
                angle: (vertical_length / ground_length).atan(),
            }
        })
        .collect()
}

/// Arrival or departure generator borrowed for one calculation.
#[derive(Clone, Copy)]
enum Generator<'a> {
    Arrival(&'a Doc29ArrivalGenerator),
    Departure(&'a Doc29DepartureGenerator),
}

impl Generator<'_> {
    fn noise(&self, ctx: &SegmentContext<'_>) -> Option<(f64, f64)> {
        match self {
            Generator::Arrival(generator) => generator.noise(ctx),
            Generator::Departure(generator) => generator.noise(ctx),
        }
    }
}

/// Doc29 noise calculator for one run.
pub struct NoiseCalculatorDoc29 {
    spec: Arc<NoiseRunSpec>,
    arrival_generators: HashMap<String, Doc29ArrivalGenerator>,
    departure_generators: HashMap<String, Doc29DepartureGenerator>,
}

impl NoiseCalculatorDoc29 {
    pub fn new(spec: Arc<NoiseRunSpec>) -> Self {
        Self {
            spec,
            arrival_generators: HashMap::new(),
            departure_generators: HashMap::new(),
        }
    }

    /// Registers the arrival generator for a noise record. The run's
    /// atmospheric absorption is folded into its tables once, here.
    pub fn add_arrival(&mut self, record: &Doc29Noise) {
        self.arrival_generators
            .entry(record.name.clone())
            .or_insert_with(|| {
                let mut generator = Doc29ArrivalGenerator::new(record);
                generator.apply_atmospheric_absorption(&self.spec.absorption);
                generator
            });
    }

    /// Registers the departure generator for a noise record.
    pub fn add_departure(&mut self, record: &Doc29Noise) {
        self.departure_generators
            .entry(record.name.clone())
            .or_insert_with(|| {
                let mut generator = Doc29DepartureGenerator::new(record);
                generator.apply_atmospheric_absorption(&self.spec.absorption);
                generator
            });
    }

    /// Single event noise of one operation at every receptor of the run.
    pub fn calculate(
        &self,
        operation: &Operation,
        output: &PerformanceOutput,
    ) -> Result<NoiseSingleEventOutput, CalculationError> {
        let aircraft = operation.aircraft();
        let record = aircraft
            .doc29_noise
            .as_deref()
            .ok_or_else(|| CalculationError::MissingNoiseRecord {
                operation: operation.name().to_owned(),
            })?;

        let generator = match operation.kind() {
            OperationKind::Arrival => self
                .arrival_generators
                .get(&record.name)
                .map(Generator::Arrival),
            OperationKind::Departure => self
                .departure_generators
                .get(&record.name)
                .map(Generator::Departure),
        }
        .ok_or_else(|| CalculationError::MissingGenerator {
            record: record.name.clone(),
            kind: operation.kind(),
        })?;

        let atmosphere = self.spec.atmospheres.atmosphere(operation.time());
        let delta = aircraft.noise_delta(operation.kind());
        let segment_data = constant_segment_data(output);
        let segments: Vec<(&ProfilePoint, &ProfilePoint)> = output
            .segments()
            .map(|((_, point1), (_, point2))| (point1, point2))
            .collect();

        let values = self
            .spec
            .receptors
            .par_iter()
            .map(|receptor: &Receptor| {
                // Receptor dependent correction, identical for every segment
                let impedance = 10.0
                    * (416.86 / 409.81 * atmosphere.pressure_ratio(receptor.elevation)
                        / atmosphere.temperature_ratio(receptor.elevation).sqrt())
                    .log10();

                let mut lamax = f64::NEG_INFINITY;
                let mut exposure = 0.0;
                let mut contributed = false;

                for (data, (point1, point2)) in segment_data.iter().zip(&segments) {
                    if data.length < PRECISION {
                        continue;
                    }
                    let ctx = SegmentContext {
                        length: data.length,
                        angle: data.angle,
                        delta,
                        start: point1,
                        end: point2,
                        receptor,
                        coordinate_system: &self.spec.coordinate_system,
                        maximum_distance: self.spec.maximum_distance,
                    };
                    if let Some((lamax_seg, sel_seg)) = generator.noise(&ctx) {
                        lamax = lamax.max(lamax_seg + impedance);
                        exposure += 10f64.powf((sel_seg + impedance) / 10.0);
                        contributed = true;
                    }
                }

                if !contributed {
                    return Ok((0.0, 0.0));
                }

                let sel = 10.0 * exposure.log10();
                if !lamax.is_finite() || !sel.is_finite() {
                    return Err(CalculationError::NonFiniteNoise {
                        operation: operation.name().to_owned(),
                        receptor: receptor.name.clone(),
                    });
                }
                Ok((lamax, sel))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(NoiseSingleEventOutput::new(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atmosphere::AtmosphereSeries;
    use crate::coord::{CoordinateSystem, Position};
    use crate::noise::absorption::AtmosphericAbsorption;
    use crate::noise::doc29::{LateralDirectivity, SorCorrection};
    use crate::noise::npd::{NoiseLevels, NPD_DISTANCE_COUNT};
    use crate::operation::{Aircraft, FlightPhase};
    use chrono::{TimeZone, Utc};

    fn record() -> Doc29Noise {
        let mut record = Doc29Noise::new("test-record");
        record.lateral_directivity = LateralDirectivity::Propeller;
        record.start_of_roll_correction = SorCorrection::None;
        let flat = |level: f64| -> NoiseLevels { [level; NPD_DISTANCE_COUNT] };
        for npd in [
            &mut record.arrival_lamax,
            &mut record.arrival_sel,
            &mut record.departure_lamax,
            &mut record.departure_sel,
        ] {
            npd.insert(10000.0, flat(75.0)).unwrap();
            npd.insert(50000.0, flat(85.0)).unwrap();
        }
        record
    }

    fn spec(receptors: Vec<Receptor>, maximum_distance: f64) -> Arc<NoiseRunSpec> {
        Arc::new(NoiseRunSpec {
            coordinate_system: CoordinateSystem::new(Position::new(0.0, 0.0)),
            atmospheres: AtmosphereSeries::default(),
            absorption: AtmosphericAbsorption::None,
            receptors,
            metrics: Vec::new(),
            maximum_distance,
            save_single_event_metrics: true,
        })
    }

    fn arrival(record: Arc<Doc29Noise>) -> Operation {
        let mut aircraft = Aircraft::new("test-aircraft");
        aircraft.doc29_noise = Some(record);
        Operation::new(
            "arr-1",
            OperationKind::Arrival,
            1.0,
            Utc.with_ymd_and_hms(2023, 6, 1, 12, 0, 0).unwrap(),
            Arc::new(aircraft),
        )
    }

    fn level_pass() -> PerformanceOutput {
        let mut output = PerformanceOutput::new();
        let point = |longitude: f64| ProfilePoint {
            position: Position::new(longitude, 0.0),
            altitude_msl: 304.8,
            true_airspeed: crate::units::from_knots(160.0),
            groundspeed: crate::units::from_knots(160.0),
            corrected_net_thrust_per_engine: 30000.0,
            bank_angle: 0.0,
            fuel_flow_per_engine: 0.5,
            phase: FlightPhase::Approach,
        };
        let cs = CoordinateSystem::new(Position::new(0.0, 0.0));
        let mut distance = 0.0;
        output.push(distance, point(-0.02)).unwrap();
        distance += cs.distance(Position::new(-0.02, 0.0), Position::new(0.0, 0.0));
        output.push(distance, point(0.0)).unwrap();
        distance += cs.distance(Position::new(0.0, 0.0), Position::new(0.02, 0.0));
        output.push(distance, point(0.02)).unwrap();
        output
    }

    #[test]
    fn test_overhead_receptor_reports_finite_levels() {
        let record = Arc::new(record());
        let spec = spec(vec![Receptor::new("under", 0.0, 0.0, 0.0)], f64::INFINITY);
        let mut calculator = NoiseCalculatorDoc29::new(spec);
        calculator.add_arrival(&record);

        let operation = arrival(record);
        let event = calculator.calculate(&operation, &level_pass()).unwrap();
        assert_eq!(event.len(), 1);
        // impedance correction at sea level ISA is 10 log10(416.86/409.81)
        let impedance = 10.0 * (416.86f64 / 409.81).log10();
        assert!((event.lamax(0) - (80.0 + impedance)).abs() < 1e-6);
        assert!(event.sel(0) > event.lamax(0) - 10.0);
        assert!(event.sel(0) < event.lamax(0) + 10.0);
    }

    #[test]
    fn test_receptor_out_of_reach_reports_zero() {
        let record = Arc::new(record());
        let spec = spec(vec![Receptor::new("far", 2.0, 2.0, 0.0)], 10000.0);
        let mut calculator = NoiseCalculatorDoc29::new(spec);
        calculator.add_arrival(&record);

        let operation = arrival(record);
        let event = calculator.calculate(&operation, &level_pass()).unwrap();
        assert_eq!(event.values()[0], (0.0, 0.0));
    }

    #[test]
    fn test_missing_generator_is_an_error() {
        let record = Arc::new(record());
        let spec = spec(vec![Receptor::new("under", 0.0, 0.0, 0.0)], f64::INFINITY);
        let calculator = NoiseCalculatorDoc29::new(spec);

        let operation = arrival(record);
        assert!(matches!(
            calculator.calculate(&operation, &level_pass()),
            Err(CalculationError::MissingGenerator { .. })
        ));
    }
}
