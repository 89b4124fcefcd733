//! Noise run specification and output.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::atmosphere::AtmosphereSeries;
use crate::coord::CoordinateSystem;
use crate::noise::absorption::AtmosphericAbsorption;
use crate::noise::cumulative::{NoiseCumulativeMetric, NoiseCumulativeOutput};
use crate::noise::{NoiseSingleEventOutput, Receptor};
use crate::operation::Operation;

/// Everything a noise run reads. Fixed once the job is queued.
#[derive(Debug, Clone)]
pub struct NoiseRunSpec {
    pub coordinate_system: CoordinateSystem,
    pub atmospheres: AtmosphereSeries,
    pub absorption: AtmosphericAbsorption,
    pub receptors: Vec<Receptor>,
    pub metrics: Vec<NoiseCumulativeMetric>,
    /// Segments farther from a receptor than this are skipped, m.
    pub maximum_distance: f64,
    /// Keep per-operation single event results in the output.
    pub save_single_event_metrics: bool,
}

impl Default for NoiseRunSpec {
    fn default() -> Self {
        Self {
            coordinate_system: CoordinateSystem::default(),
            atmospheres: AtmosphereSeries::default(),
            absorption: AtmosphericAbsorption::None,
            receptors: Vec::new(),
            metrics: Vec::new(),
            maximum_distance: f64::INFINITY,
            save_single_event_metrics: false,
        }
    }
}

/// Receives results as they are produced, under the output lock.
pub trait NoiseOutputSink: Send + Sync {
    fn save_single_event(&self, _operation: &Operation, _event: &NoiseSingleEventOutput) {}
    fn save_cumulative(&self, _metric: &NoiseCumulativeMetric, _output: &NoiseCumulativeOutput) {}
    fn clear(&self) {}
}

/// Keeps results in memory only.
#[derive(Debug, Default)]
pub struct NullNoiseSink;

impl NoiseOutputSink for NullNoiseSink {}

#[derive(Debug, Default)]
struct NoiseState {
    single_events: HashMap<String, NoiseSingleEventOutput>,
    cumulative: Vec<NoiseCumulativeOutput>,
}

/// Shared output of a noise run.
pub struct NoiseRunOutput {
    state: Mutex<NoiseState>,
    sink: Box<dyn NoiseOutputSink>,
}

impl Default for NoiseRunOutput {
    fn default() -> Self {
        Self::new(Box::new(NullNoiseSink))
    }
}

impl NoiseRunOutput {
    pub fn new(sink: Box<dyn NoiseOutputSink>) -> Self {
        Self {
            state: Mutex::new(NoiseState::default()),
            sink,
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut NoiseState) -> R) -> R {
        let mut guard = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    /// Allocates one cumulative accumulator per metric.
    pub fn start_cumulative(&self, receptor_count: usize, metrics: &[NoiseCumulativeMetric]) {
        self.with_state(|state| {
            state.cumulative = metrics
                .iter()
                .map(|metric| {
                    NoiseCumulativeOutput::new(receptor_count, metric.number_above_thresholds().len())
                })
                .collect();
        });
    }

    /// Stores a single event result and forwards it to the sink.
    pub fn add_single_event(&self, operation: &Operation, event: NoiseSingleEventOutput) {
        self.with_state(|state| {
            self.sink.save_single_event(operation, &event);
            state.single_events.insert(operation.name().to_owned(), event);
        });
    }

    /// Folds a single event into every cumulative metric, weighted by the
    /// operation's time of day.
    pub fn accumulate(
        &self,
        operation: &Operation,
        event: &NoiseSingleEventOutput,
        metrics: &[NoiseCumulativeMetric],
    ) {
        self.with_state(|state| {
            for (output, metric) in state.cumulative.iter_mut().zip(metrics) {
                let weight = metric.weight(operation.time_of_day());
                output.accumulate(event, operation.count(), weight, metric);
            }
        });
    }

    /// Converts the accumulated sums into levels and saves them.
    pub fn finish_cumulative(&self, metrics: &[NoiseCumulativeMetric]) {
        self.with_state(|state| {
            for (output, metric) in state.cumulative.iter_mut().zip(metrics) {
                output.finish(metric);
                self.sink.save_cumulative(metric, output);
            }
        });
    }

    pub fn clear(&self) {
        self.with_state(|state| {
            state.single_events.clear();
            state.cumulative.clear();
            self.sink.clear();
        });
    }

    /// Single event result of an operation, if stored.
    pub fn single_event(&self, operation: &str) -> Option<NoiseSingleEventOutput> {
        self.with_state(|state| state.single_events.get(operation).cloned())
    }

    pub fn single_event_count(&self) -> usize {
        self.with_state(|state| state.single_events.len())
    }

    /// Cumulative outputs in metric order.
    pub fn cumulative_outputs(&self) -> Vec<NoiseCumulativeOutput> {
        self.with_state(|state| state.cumulative.clone())
    }
}
