//! Error types for the run engine.
//!
//! Three concerns, three enums: [`ModelError`] for invalid domain data at
//! construction time, [`QueueError`] for job preconditions rejected by
//! `queue()`, and [`CalculationError`] for failures raised while a run is
//! executing.

use crate::jobs::JobStatus;
use crate::operation::OperationKind;
use thiserror::Error;

/// Invalid domain data rejected when models are built or mutated.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("thrust must be positive, got {0} N")]
    NonPositiveThrust(f64),

    #[error("noise levels at thrust {0} N already exist")]
    DuplicateThrust(f64),

    #[error("spectrum level for band {band} must be finite and non-negative, got {level} dB")]
    InvalidSpectrumLevel { band: usize, level: f64 },

    #[error("spectrum band {0} is out of range (24 one-third-octave bands)")]
    InvalidSpectrumBand(usize),

    #[error("absorption rate for band {band} must be finite and non-negative, got {rate} dB/m")]
    InvalidAbsorptionRate { band: usize, rate: f64 },

    #[error("relative humidity must be between 0 and 1, got {0}")]
    InvalidRelativeHumidity(f64),

    #[error("temperature delta must be between -100 and +100 K, got {0}")]
    InvalidTemperatureDelta(f64),

    #[error("pressure delta must be between -15000 and +15000 Pa, got {0}")]
    InvalidPressureDelta(f64),

    #[error("cumulative ground distance must increase ({previous} m followed by {next} m)")]
    NonMonotonicDistance { previous: f64, next: f64 },

    #[error("filter minimum {minimum} exceeds maximum {maximum}")]
    InvalidFilterWindow { minimum: f64, maximum: f64 },

    #[error("{0} must be finite and non-negative, got {1}")]
    NegativeQuantity(&'static str, f64),

    #[error("weight for time-of-day must be finite and non-negative, got {0}")]
    InvalidWeight(f64),
}

/// Job precondition failures. A rejected `queue()` leaves the job Ready.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("job is not ready, current status is {0}")]
    NotReady(JobStatus),

    #[error("run has no receptors")]
    EmptyReceptorSet,

    #[error("run has no operations")]
    NoOperations,

    #[error("aircraft '{0}' has no noise record")]
    MissingNoiseRecord(String),

    #[error("noise record '{record}' of aircraft '{aircraft}' is incomplete for {kind} operations")]
    InvalidNoiseRecord {
        record: String,
        aircraft: String,
        kind: OperationKind,
    },

    #[error("aircraft '{0}' has no LTO engine")]
    MissingLtoEngine(String),
}

/// Failures raised by calculators while a run executes. Any of these aborts
/// the run: the task queue is drained and the job transitions to Stopped.
#[derive(Debug, Error)]
pub enum CalculationError {
    #[error("operation '{operation}' has no noise record")]
    MissingNoiseRecord { operation: String },

    #[error("no {kind} noise generator registered for record '{record}'")]
    MissingGenerator { record: String, kind: OperationKind },

    #[error("non-finite noise level for operation '{operation}' at receptor '{receptor}'")]
    NonFiniteNoise { operation: String, receptor: String },

    #[error("operation '{operation}' has no LTO engine")]
    MissingLtoEngine { operation: String },

    #[error("no emissions generator registered for engine '{engine}'")]
    MissingEmissionsGenerator { engine: String },
}
