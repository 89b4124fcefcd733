//! Doc29 noise model: NPD data, spectral absorption, per-segment generators,
//! the per-receptor calculator and cumulative metrics.

pub mod absorption;
pub mod calculator;
pub mod cumulative;
pub mod doc29;
pub mod npd;

use serde::{Deserialize, Serialize};

use crate::coord::Position;

/// Point on the ground where noise is evaluated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receptor {
    pub name: String,
    pub position: Position,
    /// Elevation above mean sea level, m.
    pub elevation: f64,
}

impl Receptor {
    pub fn new(name: impl Into<String>, longitude: f64, latitude: f64, elevation: f64) -> Self {
        Self {
            name: name.into(),
            position: Position::new(longitude, latitude),
            elevation,
        }
    }
}

/// Per-receptor (LAmax, SEL) pairs of a single operation.
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseSingleEventOutput {
    values: Vec<(f64, f64)>,
}

impl NoiseSingleEventOutput {
    pub fn new(values: Vec<(f64, f64)>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn lamax(&self, receptor: usize) -> f64 {
        self.values[receptor].0
    }

    pub fn sel(&self, receptor: usize) -> f64 {
        self.values[receptor].1
    }

    /// (LAmax, SEL) pairs in receptor order.
    pub fn values(&self) -> &[(f64, f64)] {
        &self.values
    }
}
