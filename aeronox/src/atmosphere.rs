//! ISA atmosphere with sea level deltas and a time-keyed series.
//!
//! Temperature and pressure follow the International Standard Atmosphere up
//! to the tropopause and the isothermal layer above it, shifted by optional
//! sea level deltas. Runs resolve the atmosphere for each operation from an
//! [`AtmosphereSeries`] keyed by operation time.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Earth radius used for the geopotential altitude construct.
const EARTH_RADIUS: f64 = 6356766.0;
/// Specific gas constant for dry air, J/(kg K).
const R_AIR: f64 = 287.05287;
/// Gravity acceleration at mean sea level, m/s^2.
const G0: f64 = 9.80665;
/// ISA sea level temperature, K.
const T0: f64 = 288.15;
/// ISA sea level pressure, Pa.
const P0: f64 = 101325.0;
/// Temperature gradient below the tropopause, K/m.
const TEMPERATURE_GRADIENT: f64 = -0.0065;
/// Geopotential altitude of the tropopause, m.
const TROPOPAUSE_ALTITUDE: f64 = 11000.0;
/// ISA temperature at the tropopause, K.
const TROPOPAUSE_TEMPERATURE: f64 = T0 + TROPOPAUSE_ALTITUDE * TEMPERATURE_GRADIENT;

/// Converts geometric altitude to the geopotential altitude used by the
/// standard atmosphere formulas.
pub fn geopotential_altitude(geometric: f64) -> f64 {
    EARTH_RADIUS * geometric / (EARTH_RADIUS + geometric)
}

/// Converts geopotential altitude back to geometric altitude.
pub fn geometric_altitude(geopotential: f64) -> f64 {
    EARTH_RADIUS * geopotential / (EARTH_RADIUS - geopotential)
}

fn temperature_at(geopotential: f64, temperature_delta: f64) -> f64 {
    if geopotential <= TROPOPAUSE_ALTITUDE {
        T0 + temperature_delta + TEMPERATURE_GRADIENT * geopotential
    } else {
        TROPOPAUSE_TEMPERATURE + temperature_delta
    }
}

fn pressure_at(geopotential: f64, temperature_delta: f64, pressure_delta: f64) -> f64 {
    if geopotential <= TROPOPAUSE_ALTITUDE {
        (P0 + pressure_delta)
            * (1.0 + TEMPERATURE_GRADIENT * geopotential / (T0 + temperature_delta))
                .powf(-G0 / (TEMPERATURE_GRADIENT * R_AIR))
    } else {
        pressure_at(TROPOPAUSE_ALTITUDE, temperature_delta, pressure_delta)
            * (-G0 * (geopotential - TROPOPAUSE_ALTITUDE)
                / ((TROPOPAUSE_TEMPERATURE + temperature_delta) * R_AIR))
                .exp()
    }
}

/// Atmosphere state: ISA shifted by sea level deltas, plus humidity and wind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Atmosphere {
    temperature_delta: f64,
    pressure_delta: f64,
    relative_humidity: f64,
    wind_speed: f64,
    /// Wind direction in degrees; `None` treats the wind speed as headwind
    /// regardless of track heading.
    wind_direction: Option<f64>,
}

impl Default for Atmosphere {
    fn default() -> Self {
        Self {
            temperature_delta: 0.0,
            pressure_delta: 0.0,
            relative_humidity: 0.7,
            wind_speed: 0.0,
            wind_direction: None,
        }
    }
}

impl Atmosphere {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn temperature_delta(&self) -> f64 {
        self.temperature_delta
    }

    pub fn pressure_delta(&self) -> f64 {
        self.pressure_delta
    }

    pub fn relative_humidity(&self) -> f64 {
        self.relative_humidity
    }

    pub fn set_deltas(&mut self, temperature_delta: f64, pressure_delta: f64) -> Result<(), ModelError> {
        if !(temperature_delta > -100.0 && temperature_delta < 100.0) {
            return Err(ModelError::InvalidTemperatureDelta(temperature_delta));
        }
        if !(pressure_delta > -15000.0 && pressure_delta < 15000.0) {
            return Err(ModelError::InvalidPressureDelta(pressure_delta));
        }
        self.temperature_delta = temperature_delta;
        self.pressure_delta = pressure_delta;
        Ok(())
    }

    pub fn set_relative_humidity(&mut self, relative_humidity: f64) -> Result<(), ModelError> {
        if !(0.0..=1.0).contains(&relative_humidity) {
            return Err(ModelError::InvalidRelativeHumidity(relative_humidity));
        }
        self.relative_humidity = relative_humidity;
        Ok(())
    }

    pub fn set_wind(&mut self, speed: f64, direction: Option<f64>) {
        self.wind_speed = speed;
        self.wind_direction = direction;
    }

    /// Temperature in K at a geometric altitude MSL.
    pub fn temperature(&self, altitude_msl: f64) -> f64 {
        temperature_at(geopotential_altitude(altitude_msl), self.temperature_delta)
    }

    /// Pressure in Pa at a geometric altitude MSL.
    pub fn pressure(&self, altitude_msl: f64) -> f64 {
        pressure_at(
            geopotential_altitude(altitude_msl),
            self.temperature_delta,
            self.pressure_delta,
        )
    }

    /// Density in kg/m^3 at a geometric altitude MSL.
    pub fn density(&self, altitude_msl: f64) -> f64 {
        self.pressure(altitude_msl) / (R_AIR * self.temperature(altitude_msl))
    }

    /// Temperature ratio theta against the ISA sea level reference.
    pub fn temperature_ratio(&self, altitude_msl: f64) -> f64 {
        self.temperature(altitude_msl) / T0
    }

    /// Pressure ratio delta against the ISA sea level reference.
    pub fn pressure_ratio(&self, altitude_msl: f64) -> f64 {
        self.pressure(altitude_msl) / P0
    }

    pub fn density_ratio(&self, altitude_msl: f64) -> f64 {
        self.pressure_ratio(altitude_msl) / self.temperature_ratio(altitude_msl)
    }

    /// Speed of sound for an ideal gas at the altitude's temperature.
    pub fn sound_speed(&self, altitude_msl: f64) -> f64 {
        (1.4 * R_AIR * self.temperature(altitude_msl)).sqrt()
    }

    pub fn mach_number(&self, true_airspeed: f64, altitude_msl: f64) -> f64 {
        true_airspeed / self.sound_speed(altitude_msl)
    }

    /// Headwind component for a track heading in degrees.
    pub fn headwind(&self, heading: f64) -> f64 {
        match self.wind_direction {
            None => self.wind_speed,
            Some(direction) => self.wind_speed * (direction - heading).to_radians().cos(),
        }
    }

    /// Crosswind component for a track heading in degrees.
    pub fn crosswind(&self, heading: f64) -> f64 {
        match self.wind_direction {
            None => 0.0,
            Some(direction) => self.wind_speed * (direction - heading).to_radians().sin(),
        }
    }
}

/// Time-sorted atmosphere table with a default for times before the first
/// entry. Lookup returns the last entry at or before the requested time.
#[derive(Debug, Clone, Default)]
pub struct AtmosphereSeries {
    default_atmosphere: Atmosphere,
    entries: BTreeMap<DateTime<Utc>, Atmosphere>,
}

impl AtmosphereSeries {
    pub fn new(default_atmosphere: Atmosphere) -> Self {
        Self {
            default_atmosphere,
            entries: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, time: DateTime<Utc>, atmosphere: Atmosphere) {
        self.entries.insert(time, atmosphere);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn atmosphere(&self, time: DateTime<Utc>) -> Atmosphere {
        self.entries
            .range(..=time)
            .next_back()
            .map(|(_, atmosphere)| *atmosphere)
            .unwrap_or(self.default_atmosphere)
    }
}
