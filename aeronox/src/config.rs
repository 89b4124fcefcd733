//! Engine configuration.
//!
//! Deserializable knobs for runs: worker threads, the noise maximum segment
//! distance and which detailed results to keep. All fields have defaults, a
//! missing section falls back cleanly.

use serde::{Deserialize, Serialize};

use crate::emissions::calculator::{EmissionsFilters, EmissionsModel};

fn default_maximum_distance() -> f64 {
    f64::INFINITY
}

/// Noise run settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    /// Segments farther from a receptor than this contribute nothing, m.
    #[serde(default = "default_maximum_distance")]
    pub maximum_segment_distance: f64,
    /// Keep per-operation single event results.
    pub save_single_event_metrics: bool,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            maximum_segment_distance: default_maximum_distance(),
            save_single_event_metrics: false,
        }
    }
}

/// Emissions run settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmissionsConfig {
    pub model: EmissionsModel,
    /// Keep per-segment results in the per-operation outputs.
    pub save_segment_results: bool,
    pub filters: EmissionsFilters,
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Worker threads for emissions runs; defaults to the machine's
    /// available parallelism.
    pub worker_threads: Option<usize>,
    pub noise: NoiseConfig,
    pub emissions: EmissionsConfig,
}

impl EngineConfig {
    /// Worker thread count, resolved against the machine.
    pub fn worker_threads(&self) -> usize {
        self.worker_threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|count| count.get())
                .unwrap_or(1)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert!(config.noise.maximum_segment_distance.is_infinite());
        assert!(!config.noise.save_single_event_metrics);
        assert_eq!(config.emissions.model, EmissionsModel::Bffm2);
        assert!(config.worker_threads() >= 1);
    }

    #[test]
    fn test_partial_deserialization_falls_back() {
        let json = r#"{ "noise": { "save_single_event_metrics": true } }"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert!(config.noise.save_single_event_metrics);
        assert!(config.noise.maximum_segment_distance.is_infinite());
        assert_eq!(config.emissions, EmissionsConfig::default());
    }
}
