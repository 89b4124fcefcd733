//! Emissions run specification and output.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::atmosphere::AtmosphereSeries;
use crate::emissions::calculator::{EmissionsFilters, EmissionsModel};
use crate::emissions::{EmissionValues, EmissionsOperationOutput};
use crate::operation::Operation;

/// Everything an emissions run reads. Fixed once the job is queued.
#[derive(Debug, Clone, Default)]
pub struct EmissionsRunSpec {
    pub model: EmissionsModel,
    pub filters: EmissionsFilters,
    pub atmospheres: AtmosphereSeries,
    /// Keep per-segment results in the per-operation outputs.
    pub save_segment_results: bool,
}

/// Receives per-operation results as they are produced, under the output
/// lock.
pub trait EmissionsOutputSink: Send + Sync {
    fn save_operation(&self, _operation: &Operation, _output: &EmissionsOperationOutput) {}
    fn clear(&self) {}
}

/// Keeps results in memory only.
#[derive(Debug, Default)]
pub struct NullEmissionsSink;

impl EmissionsOutputSink for NullEmissionsSink {}

#[derive(Debug, Default)]
struct EmissionsState {
    operations: HashMap<String, EmissionsOperationOutput>,
    fuel: f64,
    emissions: EmissionValues,
}

/// Shared output of an emissions run: per-operation outputs plus run totals.
pub struct EmissionsRunOutput {
    state: Mutex<EmissionsState>,
    sink: Box<dyn EmissionsOutputSink>,
}

impl Default for EmissionsRunOutput {
    fn default() -> Self {
        Self::new(Box::new(NullEmissionsSink))
    }
}

impl EmissionsRunOutput {
    pub fn new(sink: Box<dyn EmissionsOutputSink>) -> Self {
        Self {
            state: Mutex::new(EmissionsState::default()),
            sink,
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut EmissionsState) -> R) -> R {
        let mut guard = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    /// Stores one operation's output, folds it into the run totals and
    /// forwards it to the sink. Per-segment detail is dropped unless
    /// requested.
    pub fn add_operation_output(
        &self,
        operation: &Operation,
        mut output: EmissionsOperationOutput,
        save_segments: bool,
    ) {
        if !save_segments {
            output.clear_segments();
        }
        self.with_state(|state| {
            state.fuel += output.fuel();
            state.emissions += *output.emissions();
            self.sink.save_operation(operation, &output);
            state.operations.insert(operation.name().to_owned(), output);
        });
    }

    /// Total fuel burned over the run, kg.
    pub fn total_fuel(&self) -> f64 {
        self.with_state(|state| state.fuel)
    }

    /// Total emissions over the run.
    pub fn total_emissions(&self) -> EmissionValues {
        self.with_state(|state| state.emissions)
    }

    pub fn operation_count(&self) -> usize {
        self.with_state(|state| state.operations.len())
    }

    /// Output of one operation, if stored.
    pub fn operation_output(&self, operation: &str) -> Option<EmissionsOperationOutput> {
        self.with_state(|state| state.operations.get(operation).cloned())
    }

    pub fn clear(&self) {
        self.with_state(|state| {
            state.operations.clear();
            state.fuel = 0.0;
            state.emissions = EmissionValues::default();
            self.sink.clear();
        });
    }
}
