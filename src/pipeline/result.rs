//! Step results and per-run pipeline state.

use super::step::StepId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::{Duration, Instant};

/// Data returned by a step body.
pub type StepData = BTreeMap<String, Value>;

/// How a step ended in the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    /// Body ran and returned normally
    Succeeded,
    /// Skipped because a valid cache entry was found
    Cached,
    /// Body failed but the failure policy let the run continue
    ToleratedFailure,
    /// Body failed and the run was aborted
    FatalFailure,
}

impl StepOutcome {
    /// Whether dependents can rely on this step's outputs.
    pub fn is_satisfied(&self) -> bool {
        matches!(self, StepOutcome::Succeeded | StepOutcome::Cached)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, StepOutcome::ToleratedFailure | StepOutcome::FatalFailure)
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepOutcome::Succeeded => write!(f, "succeeded"),
            StepOutcome::Cached => write!(f, "cached"),
            StepOutcome::ToleratedFailure => write!(f, "failed (tolerated)"),
            StepOutcome::FatalFailure => write!(f, "failed"),
        }
    }
}

/// Record of one step execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub step: StepId,
    pub success: bool,
    /// Wall time, stored as fractional seconds
    #[serde(with = "duration_secs")]
    pub duration: Duration,
    pub message: String,
    #[serde(default)]
    pub data: StepData,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl StepResult {
    pub fn success(step: StepId, duration: Duration, data: StepData) -> Self {
        Self {
            step,
            success: true,
            duration,
            message: format!("Step {} completed successfully", step),
            data,
            errors: vec![],
            warnings: vec![],
        }
    }

    pub fn failure(step: StepId, duration: Duration, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            step,
            success: false,
            duration,
            message: format!("Step {} failed: {}", step, error),
            data: StepData::new(),
            errors: vec![error],
            warnings: vec![],
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

/// Mutable state of a pipeline session.
///
/// `completed_steps` and `failed_steps` never share a member.
#[derive(Debug, Clone, Default)]
pub struct PipelineState {
    pub current_step: Option<StepId>,
    pub completed_steps: BTreeSet<StepId>,
    pub failed_steps: BTreeSet<StepId>,
    pub step_results: BTreeMap<StepId, StepResult>,
    pub outcomes: BTreeMap<StepId, StepOutcome>,
    pub start_time: Option<Instant>,
    pub total_assets_processed: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    /// Completed steps in the order they completed
    completion_order: Vec<StepId>,
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_completed(&self, step: StepId) -> bool {
        self.completed_steps.contains(&step)
    }

    pub fn is_failed(&self, step: StepId) -> bool {
        self.failed_steps.contains(&step)
    }

    pub fn outcome(&self, step: StepId) -> Option<StepOutcome> {
        self.outcomes.get(&step).copied()
    }

    pub fn mark_completed(&mut self, step: StepId, outcome: StepOutcome) {
        self.failed_steps.remove(&step);
        if self.completed_steps.insert(step) {
            self.completion_order.push(step);
        }
        self.outcomes.insert(step, outcome);
    }

    pub fn mark_failed(&mut self, step: StepId, outcome: StepOutcome) {
        self.unmark_completed(step);
        self.failed_steps.insert(step);
        self.outcomes.insert(step, outcome);
    }

    /// Remove a step from the completed set, e.g. after rolling it back.
    pub fn unmark_completed(&mut self, step: StepId) {
        if self.completed_steps.remove(&step) {
            self.completion_order.retain(|s| *s != step);
        }
        if self.outcomes.get(&step).is_some_and(StepOutcome::is_satisfied) {
            self.outcomes.remove(&step);
        }
    }

    /// Completed steps in completion order.
    pub fn completion_order(&self) -> &[StepId] {
        &self.completion_order
    }

    /// Steps completed that were not in `snapshot`, most recent last.
    pub fn completed_since(&self, snapshot: &BTreeSet<StepId>) -> Vec<StepId> {
        self.completion_order.iter().copied().filter(|s| !snapshot.contains(s)).collect()
    }

    pub fn record_result(&mut self, result: StepResult) {
        self.step_results.insert(result.step, result);
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.map(|t| t.elapsed()).unwrap_or_default()
    }

    /// Human-readable execution summary.
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Pipeline execution summary".to_string(),
            format!("  Total execution time: {:.2}s", self.elapsed().as_secs_f64()),
            format!("  Steps completed: {}", self.completed_steps.len()),
            format!("  Steps failed: {}", self.failed_steps.len()),
            format!("  Total assets processed: {}", self.total_assets_processed),
            format!("  Cache hits: {}", self.cache_hits),
            format!("  Cache misses: {}", self.cache_misses),
        ];

        if !self.failed_steps.is_empty() {
            lines.push("Failed steps:".to_string());
            for step in &self.failed_steps {
                if let Some(result) = self.step_results.get(step) {
                    lines.push(format!("  - {}: {}", step, result.message));
                }
            }
        }

        if !self.step_results.is_empty() {
            lines.push("Step execution times:".to_string());
            for (step, result) in &self.step_results {
                let status = match self.outcome(*step) {
                    Some(outcome) => outcome.to_string(),
                    None if result.success => StepOutcome::Succeeded.to_string(),
                    None => StepOutcome::FatalFailure.to_string(),
                };
                lines.push(format!(
                    "  {} {}: {:.2}s",
                    step,
                    status,
                    result.duration.as_secs_f64()
                ));
            }
        }

        let warnings: Vec<&String> = self.step_results.values().flat_map(|r| &r.warnings).collect();
        if !warnings.is_empty() {
            lines.push(format!("Warnings ({}):", warnings.len()));
            for warning in warnings.iter().take(5) {
                lines.push(format!("  - {}", warning));
            }
            if warnings.len() > 5 {
                lines.push(format!("  ... and {} more", warnings.len() - 5));
            }
        }

        lines.join("\n")
    }
}
