//! The seam between the execution engine and step bodies.

use super::error::StepError;
use super::result::{PipelineState, StepData};
use super::step::StepId;
use serde_json::Value;

/// What a step body hands back on success.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepOutput {
    pub data: StepData,
    pub warnings: Vec<String>,
    /// Added to the session's asset counter
    pub assets_processed: usize,
}

impl StepOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    pub fn with_assets_processed(mut self, count: usize) -> Self {
        self.assets_processed = count;
        self
    }
}

/// Executes step bodies on behalf of the pipeline.
///
/// Implementations are opaque to the engine beyond "returns data or fails".
pub trait StepRunner {
    fn run(&mut self, step: StepId, state: &PipelineState) -> Result<StepOutput, StepError>;

    /// Undo the effects of a completed step. Defaults to doing nothing.
    fn rollback(&mut self, step: StepId) -> Result<(), StepError> {
        let _ = step;
        Ok(())
    }
}

impl<R: StepRunner + ?Sized> StepRunner for Box<R> {
    fn run(&mut self, step: StepId, state: &PipelineState) -> Result<StepOutput, StepError> {
        (**self).run(step, state)
    }

    fn rollback(&mut self, step: StepId) -> Result<(), StepError> {
        (**self).rollback(step)
    }
}
