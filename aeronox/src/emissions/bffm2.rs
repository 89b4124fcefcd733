//! Boeing Fuel Flow Method 2.
//!
//! Derives in-flight HC, CO and NOx emission indexes from the four certified
//! LTO data points. The certified values are fitted in log-log space at
//! construction; lookups correct the fuel flow to reference conditions,
//! evaluate the piecewise fit and correct the indexes back to altitude.

use crate::atmosphere::Atmosphere;
use crate::emissions::lto::LtoEngine;
use crate::units::{from_hectopascal, to_celsius};
use crate::PRECISION;

/// Line in log10(EI) over log10(fuel flow) space.
#[derive(Debug, Clone, Copy, Default)]
struct Line {
    slope: f64,
    intercept: f64,
}

impl Line {
    fn through(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        let slope = (y1 - y0) / (x1 - x0);
        Self {
            slope,
            intercept: y0 - slope * x0,
        }
    }

    fn at(&self, x: f64) -> f64 {
        10f64.powf(self.slope * x + self.intercept)
    }
}

/// Fitted BFFM2 curves of one engine.
#[derive(Debug, Clone)]
pub struct Bffm2EmissionsGenerator {
    log_corrected_fuel_flow: [f64; 4],
    hc_lines: [Line; 2],
    co_lines: [Line; 2],
    nox_lines: [Line; 3],
    hc_high: f64,
    co_high: f64,
    log_hc_intersect: f64,
    log_co_intersect: f64,
}

impl Bffm2EmissionsGenerator {
    pub fn new(engine: &LtoEngine) -> Self {
        let mut log_corrected_fuel_flow = [0.0; 4];
        for (i, log_flow) in log_corrected_fuel_flow.iter_mut().enumerate() {
            *log_flow = (engine.fuel_flows[i] * engine.fuel_flow_correction_factors[i])
                .max(PRECISION)
                .log10();
        }

        // log10 needs strictly positive emission indexes
        let ei_hc = engine.emission_indexes_hc.map(|ei| ei.max(PRECISION));
        let ei_co = engine.emission_indexes_co.map(|ei| ei.max(PRECISION));
        let ei_nox = engine.emission_indexes_nox.map(|ei| ei.max(PRECISION));

        // High fuel flow value is the log midpoint of climb out and takeoff
        let log_hc_high = ((ei_hc[2].log10()) + (ei_hc[3].log10())) / 2.0;
        let log_co_high = ((ei_co[2].log10()) + (ei_co[3].log10())) / 2.0;

        let mut hc_lines = [Line::default(); 2];
        let mut co_lines = [Line::default(); 2];

        // First line through the idle and approach points
        hc_lines[0] = Line::through(
            log_corrected_fuel_flow[0],
            ei_hc[0].log10(),
            log_corrected_fuel_flow[1],
            ei_hc[1].log10(),
        );
        co_lines[0] = Line::through(
            log_corrected_fuel_flow[0],
            ei_co[0].log10(),
            log_corrected_fuel_flow[1],
            ei_co[1].log10(),
        );

        // Fuel flow at which the first line meets the high value
        let log_hc_crossing = (log_hc_high - hc_lines[0].intercept) / hc_lines[0].slope;
        let log_co_crossing = (log_co_high - co_lines[0].intercept) / co_lines[0].slope;

        // A second line from approach towards the high value at climb out is
        // needed when the first line only meets the high value beyond the
        // takeoff point, or approaches it from below
        let log_hc_intersect;
        if log_hc_crossing >= log_corrected_fuel_flow[3] || ei_hc[1].log10() < log_hc_high {
            hc_lines[1] = Line::through(
                log_corrected_fuel_flow[1],
                ei_hc[1].log10(),
                log_corrected_fuel_flow[2],
                log_hc_high,
            );
            log_hc_intersect = log_corrected_fuel_flow[2];
        } else {
            hc_lines[1] = hc_lines[0];
            log_hc_intersect = log_hc_crossing;
        }

        let log_co_intersect;
        if log_co_crossing >= log_corrected_fuel_flow[3] || ei_co[1].log10() < log_co_high {
            co_lines[1] = Line::through(
                log_corrected_fuel_flow[1],
                ei_co[1].log10(),
                log_corrected_fuel_flow[2],
                log_co_high,
            );
            log_co_intersect = log_corrected_fuel_flow[2];
        } else {
            co_lines[1] = co_lines[0];
            log_co_intersect = log_co_crossing;
        }

        // NOx interpolates through all four points
        let mut nox_lines = [Line::default(); 3];
        for (i, line) in nox_lines.iter_mut().enumerate() {
            *line = Line::through(
                log_corrected_fuel_flow[i],
                ei_nox[i].log10(),
                log_corrected_fuel_flow[i + 1],
                ei_nox[i + 1].log10(),
            );
        }

        Self {
            log_corrected_fuel_flow,
            hc_lines,
            co_lines,
            nox_lines,
            hc_high: 10f64.powf(log_hc_high),
            co_high: 10f64.powf(log_co_high),
            log_hc_intersect,
            log_co_intersect,
        }
    }

    /// (HC, CO, NOx) emission indexes in kg per kg of fuel for a fuel flow
    /// in kg/s at the given altitude and speed.
    pub fn emission_indexes(
        &self,
        fuel_flow: f64,
        altitude_msl: f64,
        true_airspeed: f64,
        atmosphere: &Atmosphere,
    ) -> (f64, f64, f64) {
        let theta = atmosphere.temperature_ratio(altitude_msl);
        let delta = atmosphere.pressure_ratio(altitude_msl);
        let mach = atmosphere.mach_number(true_airspeed, altitude_msl);
        let reference_fuel_flow = fuel_flow * theta.powf(3.8) * (0.2 * mach * mach).exp() / delta;

        if reference_fuel_flow < PRECISION {
            return (0.0, 0.0, 0.0);
        }
        let log_flow = reference_fuel_flow.log10();

        let (reference_hc, reference_co, reference_nox) =
            if log_flow < self.log_corrected_fuel_flow[0] {
                // Below idle, evaluate the first lines at the idle point
                let log_low = self.log_corrected_fuel_flow[0];
                (
                    self.hc_lines[0].at(log_low),
                    self.co_lines[0].at(log_low),
                    self.nox_lines[0].at(log_low),
                )
            } else if log_flow > self.log_corrected_fuel_flow[2] {
                // Above climb out
                (self.hc_high, self.co_high, self.nox_lines[2].at(log_flow))
            } else if log_flow < self.log_corrected_fuel_flow[1] {
                // Between idle and approach
                (
                    self.hc_lines[0].at(log_flow),
                    self.co_lines[0].at(log_flow),
                    self.nox_lines[0].at(log_flow),
                )
            } else {
                // Between approach and climb out
                let hc = if log_flow < self.log_hc_intersect {
                    self.hc_lines[1].at(log_flow)
                } else {
                    self.hc_high
                };
                let co = if log_flow < self.log_co_intersect {
                    self.co_lines[1].at(log_flow)
                } else {
                    self.co_high
                };
                (hc, co, self.nox_lines[1].at(log_flow))
            };

        let theta_power = theta.powf(3.3);
        let delta_power = delta.powf(1.02);

        // Humidity correction for NOx
        let temperature_c = to_celsius(atmosphere.temperature(altitude_msl));
        let saturation_pressure =
            from_hectopascal(6.107 * 10f64.powf(7.5 * temperature_c / (237.3 + temperature_c)));
        let specific_humidity = 0.62197058 * atmosphere.relative_humidity() * saturation_pressure
            / (atmosphere.pressure(altitude_msl)
                - atmosphere.relative_humidity() * saturation_pressure);
        let humidity_factor = (-19.0 * (specific_humidity - 0.00634)).exp();

        (
            reference_hc * theta_power / delta_power,
            reference_co * theta_power / delta_power,
            reference_nox * humidity_factor * (delta_power / theta_power).sqrt(),
        )
    }
}
