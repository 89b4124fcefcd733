//! One-third-octave spectra and atmospheric absorption.
//!
//! NPD tables are normalized to the SAE-AIR-1845 reference atmosphere. When a
//! study specifies different absorption, per-distance level deltas are
//! derived from the aircraft spectrum and folded into the NPD tables (see
//! [`super::doc29::Doc29ArrivalGenerator`]).

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Number of one-third-octave bands (50 Hz to 10 kHz).
pub const BAND_COUNT: usize = 24;

/// Per-band values across the one-third-octave bands.
pub type OneThirdOctave = [f64; BAND_COUNT];

/// A-weighting per band, dB.
pub const A_WEIGHTS: OneThirdOctave = [
    -30.2, -26.2, -22.5, -19.1, -16.1, -13.4, -10.9, -8.6, -6.6, -4.8, -3.2, -1.9, -0.8, 0.0, 0.6,
    1.0, 1.2, 1.3, 1.2, 1.0, 0.5, -0.1, -1.1, -2.5,
];

/// Average atmospheric attenuation rates of the NPD reference atmosphere,
/// dB/m per band (SAE-AIR-1845).
pub const NPD_AVERAGE_ATTENUATION_RATES: OneThirdOctave = [
    0.00033, 0.00033, 0.00033, 0.00066, 0.00066, 0.00098, 0.00131, 0.00131, 0.00197, 0.00230,
    0.00295, 0.00361, 0.00459, 0.00590, 0.00754, 0.00983, 0.01311, 0.01705, 0.02295, 0.03115,
    0.03607, 0.05246, 0.07213, 0.09836,
];

/// Center frequency of a band in Hz.
pub fn center_frequency(band: usize) -> f64 {
    debug_assert!(band < BAND_COUNT);
    10f64.powf((17 + band) as f64 / 10.0)
}

/// Unweighted sound levels per band at the 305 m reference distance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spectrum {
    levels: OneThirdOctave,
}

impl Default for Spectrum {
    fn default() -> Self {
        Self {
            levels: [0.0; BAND_COUNT],
        }
    }
}

impl Spectrum {
    pub fn new(levels: OneThirdOctave) -> Result<Self, ModelError> {
        for (band, level) in levels.iter().enumerate() {
            if !level.is_finite() || *level < 0.0 {
                return Err(ModelError::InvalidSpectrumLevel {
                    band,
                    level: *level,
                });
            }
        }
        Ok(Self { levels })
    }

    pub fn set_level(&mut self, band: usize, level: f64) -> Result<(), ModelError> {
        if band >= BAND_COUNT {
            return Err(ModelError::InvalidSpectrumBand(band));
        }
        if !level.is_finite() || level < 0.0 {
            return Err(ModelError::InvalidSpectrumLevel { band, level });
        }
        self.levels[band] = level;
        Ok(())
    }

    pub fn levels(&self) -> &OneThirdOctave {
        &self.levels
    }
}

/// Atmospheric absorption applied to the NPD tables of a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AtmosphericAbsorption {
    /// Keep the NPD reference atmosphere.
    None,
    /// Per-band attenuation rates in dB/m.
    Rates(OneThirdOctave),
}

impl AtmosphericAbsorption {
    pub fn from_rates(rates: OneThirdOctave) -> Result<Self, ModelError> {
        for (band, rate) in rates.iter().enumerate() {
            if !rate.is_finite() || *rate < 0.0 {
                return Err(ModelError::InvalidAbsorptionRate { band, rate: *rate });
            }
        }
        Ok(Self::Rates(rates))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, AtmosphericAbsorption::None)
    }

    pub fn rates(&self) -> Option<&OneThirdOctave> {
        match self {
            AtmosphericAbsorption::None => None,
            AtmosphericAbsorption::Rates(rates) => Some(rates),
        }
    }
}
