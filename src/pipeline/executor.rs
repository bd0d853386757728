//! Pipeline execution engine.
//!
//! Runs scheduled steps one at a time, consults the cache index before each
//! step, records a [`StepResult`] per execution and classifies failures.

use super::cache::{AlwaysStale, CacheIndex, StalenessPolicy};
use super::error::PipelineError;
use super::result::{PipelineState, StepOutcome, StepResult};
use super::rollback::RollbackScope;
use super::runner::StepRunner;
use super::scheduler::execution_order;
use super::step::{DependencyGraph, StepId};
use crate::config::PipelineConfig;
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Instant;

/// How the failure policy classified a failed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDisposition {
    /// Step is in the configured ignore list
    Ignored,
    /// Step is in the fixed non-critical set
    NonCritical,
    /// Run must abort
    Fatal,
}

impl FailureDisposition {
    pub fn is_tolerated(&self) -> bool {
        !matches!(self, FailureDisposition::Fatal)
    }
}

/// Orchestrates a pipeline session.
///
/// State persists across calls to [`Pipeline::run`], so a step completed by
/// an earlier run in the same session is skipped by later runs.
pub struct Pipeline<R: StepRunner> {
    runner: R,
    graph: DependencyGraph,
    state: PipelineState,
    cache: CacheIndex,
    policy: Box<dyn StalenessPolicy>,
    fingerprint: String,
    ignored: BTreeSet<StepId>,
}

impl<R: StepRunner> Pipeline<R> {
    /// Create a pipeline over the standard step graph, with the cache index
    /// read from `cache_dir`.
    pub fn new(runner: R, cache_dir: &Path) -> Self {
        Self {
            runner,
            graph: DependencyGraph::standard(),
            state: PipelineState::new(),
            cache: CacheIndex::load(cache_dir),
            policy: Box::new(AlwaysStale),
            fingerprint: PipelineConfig::default().fingerprint(),
            ignored: BTreeSet::new(),
        }
    }

    /// Create a pipeline configured from `config`.
    pub fn from_config(config: &PipelineConfig, runner: R) -> Self {
        let ignored = config.errors.ignore_categories.iter().filter_map(|name| {
            let step = name.parse::<StepId>().ok();
            if step.is_none() {
                tracing::warn!(name = %name, "ignoring unknown step in ignore_categories");
            }
            step
        });

        Self::new(runner, &config.cache.dir)
            .with_policy(config.cache.policy.build())
            .with_fingerprint(config.fingerprint())
            .with_ignored(ignored)
    }

    pub fn with_graph(mut self, graph: DependencyGraph) -> Self {
        self.graph = graph;
        self
    }

    pub fn with_policy(mut self, policy: Box<dyn StalenessPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = fingerprint.into();
        self
    }

    /// Steps whose failures are tolerated.
    pub fn with_ignored(mut self, steps: impl IntoIterator<Item = StepId>) -> Self {
        self.ignored.extend(steps);
        self
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn runner_mut(&mut self) -> &mut R {
        &mut self.runner
    }

    pub fn cache(&self) -> &CacheIndex {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut CacheIndex {
        &mut self.cache
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Order in which `steps` and their dependencies would run.
    pub fn plan(&self, steps: &[StepId]) -> Result<Vec<StepId>, PipelineError> {
        Ok(execution_order(&self.graph, steps)?)
    }

    /// Run `steps` and their transitive dependencies.
    ///
    /// The cache index is written and the summary logged whether or not the
    /// run succeeds.
    pub fn run(&mut self, steps: &[StepId]) -> Result<(), PipelineError> {
        tracing::info!("starting asset pipeline execution");
        self.state.start_time = Some(Instant::now());

        let result = self.plan(steps).and_then(|order| self.execute(&order));

        if let Err(e) = self.cache.save() {
            tracing::warn!(path = %self.cache.path().display(), error = %e, "failed to save cache index");
        }
        tracing::info!("{}", self.state.summary());

        result
    }

    /// Run `body` inside a rollback scope.
    ///
    /// On error, every step completed inside the scope is rolled back newest
    /// first, its cache entries dropped, and the original error returned.
    pub fn rollback_on_failure<T, F>(&mut self, body: F) -> Result<T, PipelineError>
    where
        F: FnOnce(&mut Self) -> Result<T, PipelineError>,
    {
        let scope = RollbackScope::enter(&self.state);
        match body(self) {
            Ok(value) => Ok(value),
            Err(e) => {
                let rolled_back = scope.unwind(&mut self.runner, &mut self.state);
                for step in &rolled_back {
                    self.cache.invalidate(*step);
                }
                if !rolled_back.is_empty() {
                    if let Err(save_err) = self.cache.save() {
                        tracing::warn!(error = %save_err, "failed to save cache index after rollback");
                    }
                }
                Err(e)
            }
        }
    }

    /// Whether `step` has to run, consulting session state and the cache.
    ///
    /// A valid cache entry marks the step completed with its cached result.
    pub fn should_execute(&mut self, step: StepId) -> bool {
        if self.state.is_failed(step) {
            tracing::debug!(step = %step, "step failed previously, re-executing");
            return true;
        }
        if self.state.is_completed(step) {
            return false;
        }

        if let Some(entry) = self.cache.get(step, &self.fingerprint) {
            if self.policy.is_valid(entry, &self.fingerprint) {
                tracing::info!(step = %step, "using cached result");
                let result = entry.result.clone();
                self.state.cache_hits += 1;
                self.state.record_result(result);
                self.state.mark_completed(step, StepOutcome::Cached);
                return false;
            }
            tracing::debug!(step = %step, policy = ?self.policy, "cache entry is stale");
        }

        self.state.cache_misses += 1;
        true
    }

    /// Classify a failure of `step`.
    pub fn failure_disposition(&self, step: StepId) -> FailureDisposition {
        if self.ignored.contains(&step) {
            FailureDisposition::Ignored
        } else if step.is_non_critical() {
            FailureDisposition::NonCritical
        } else {
            FailureDisposition::Fatal
        }
    }

    fn execute(&mut self, order: &[StepId]) -> Result<(), PipelineError> {
        for &step in order {
            if !self.should_execute(step) {
                tracing::info!(step = %step, "skipping step (already completed or cached)");
                continue;
            }

            match self.process(step) {
                Ok(()) => {}
                Err(e) if e.is_recoverable() => continue,
                Err(e) => return Err(e),
            }
        }
        self.state.current_step = None;
        Ok(())
    }

    /// Execute one step body and record its outcome.
    ///
    /// Tolerated failures come back as a recoverable [`PipelineError`].
    fn process(&mut self, step: StepId) -> Result<(), PipelineError> {
        self.state.current_step = Some(step);
        tracing::info!(step = %step, "executing step");

        let unsatisfied: Vec<StepId> = self
            .graph
            .dependencies(step)
            .filter(|dep| !self.state.outcome(*dep).is_some_and(|o| o.is_satisfied()))
            .collect();

        let start = Instant::now();
        let outcome = self.runner.run(step, &self.state);
        let duration = start.elapsed();
        let duration_ms = duration.as_millis() as u64;

        match outcome {
            Ok(output) => {
                let mut warnings: Vec<String> = unsatisfied
                    .iter()
                    .map(|dep| format!("{} ran although dependency {} did not succeed", step, dep))
                    .collect();
                warnings.extend(output.warnings);

                let result = StepResult::success(step, duration, output.data).with_warnings(warnings);
                self.state.total_assets_processed += output.assets_processed;
                self.cache.record(&self.fingerprint, result.clone());
                self.state.record_result(result);
                self.state.mark_completed(step, StepOutcome::Succeeded);

                tracing::info!(step = %step, duration_ms, "step completed");
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                self.state.record_result(StepResult::failure(step, duration, message.clone()));

                let disposition = self.failure_disposition(step);
                match disposition {
                    FailureDisposition::Ignored => tracing::warn!(
                        step = %step, duration_ms, error = %message,
                        "ignoring failure in step (configured to ignore)"
                    ),
                    FailureDisposition::NonCritical => tracing::warn!(
                        step = %step, duration_ms, error = %message,
                        "step failed but is not critical, continuing"
                    ),
                    FailureDisposition::Fatal => tracing::error!(
                        step = %step, duration_ms, error = %message,
                        "critical step failed, stopping pipeline"
                    ),
                }

                let outcome = if disposition.is_tolerated() {
                    StepOutcome::ToleratedFailure
                } else {
                    StepOutcome::FatalFailure
                };
                self.state.mark_failed(step, outcome);

                Err(PipelineError::StepFailed {
                    step,
                    message,
                    recoverable: disposition.is_tolerated(),
                })
            }
        }
    }
}
