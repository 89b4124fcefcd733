//! Run specifications and thread-safe run outputs.
//!
//! A run pairs an immutable specification, fixed when the job is queued,
//! with a shared output that calculation tasks write into. Outputs forward
//! every result to a [`noise::NoiseOutputSink`] or
//! [`emissions::EmissionsOutputSink`] so callers can persist results as they
//! are produced.

pub mod emissions;
pub mod noise;
