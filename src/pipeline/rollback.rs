//! Scoped undo of steps completed during a failed run.

use super::result::PipelineState;
use super::runner::StepRunner;
use super::step::StepId;
use std::collections::BTreeSet;

/// Snapshot of the completed set taken when a rollback scope is entered.
#[derive(Debug, Clone)]
pub struct RollbackScope {
    snapshot: BTreeSet<StepId>,
}

impl RollbackScope {
    pub fn enter(state: &PipelineState) -> Self {
        Self { snapshot: state.completed_steps.clone() }
    }

    /// Steps completed before the scope was entered.
    pub fn snapshot(&self) -> &BTreeSet<StepId> {
        &self.snapshot
    }

    /// Roll back every step completed since the scope was entered, newest first.
    ///
    /// A failing hook is logged and the step is still removed from the
    /// completed set; the remaining steps are rolled back regardless.
    /// Returns the rolled back steps in the order they were processed.
    pub fn unwind<R: StepRunner + ?Sized>(
        self,
        runner: &mut R,
        state: &mut PipelineState,
    ) -> Vec<StepId> {
        let steps = state.completed_since(&self.snapshot);
        if !steps.is_empty() {
            tracing::info!(count = steps.len(), "rolling back pipeline changes due to failure");
        }

        let mut rolled_back = Vec::with_capacity(steps.len());
        for step in steps.into_iter().rev() {
            match runner.rollback(step) {
                Ok(()) => tracing::info!(step = %step, "rolled back step"),
                Err(e) => tracing::warn!(step = %step, error = %e, "rollback hook failed"),
            }
            state.unmark_completed(step);
            rolled_back.push(step);
        }
        rolled_back
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::error::StepError;
    use crate::pipeline::result::StepOutcome;
    use crate::pipeline::runner::StepOutput;

    #[derive(Default)]
    struct Recorder {
        rolled_back: Vec<StepId>,
        fail_on: Option<StepId>,
    }

    impl StepRunner for Recorder {
        fn run(&mut self, _step: StepId, _state: &PipelineState) -> Result<StepOutput, StepError> {
            Ok(StepOutput::new())
        }

        fn rollback(&mut self, step: StepId) -> Result<(), StepError> {
            self.rolled_back.push(step);
            match self.fail_on {
                Some(s) if s == step => Err(StepError::msg("cannot undo")),
                _ => Ok(()),
            }
        }
    }

    #[test]
    fn test_unwind_reverse_completion_order() {
        let mut state = PipelineState::new();
        state.mark_completed(StepId::Symlink, StepOutcome::Succeeded);
        let scope = RollbackScope::enter(&state);
        state.mark_completed(StepId::KenneySources, StepOutcome::Succeeded);
        state.mark_completed(StepId::AiSources, StepOutcome::Succeeded);

        let mut runner = Recorder::default();
        let rolled = scope.unwind(&mut runner, &mut state);

        assert_eq!(rolled, vec![StepId::AiSources, StepId::KenneySources]);
        assert_eq!(runner.rolled_back, rolled);
        assert_eq!(state.completed_steps.iter().copied().collect::<Vec<_>>(), vec![StepId::Symlink]);
    }

    #[test]
    fn test_failing_hook_does_not_stop_unwind() {
        let mut state = PipelineState::new();
        let scope = RollbackScope::enter(&state);
        state.mark_completed(StepId::Symlink, StepOutcome::Succeeded);
        state.mark_completed(StepId::KenneySources, StepOutcome::Succeeded);

        let mut runner = Recorder { fail_on: Some(StepId::KenneySources), ..Default::default() };
        let rolled = scope.unwind(&mut runner, &mut state);

        assert_eq!(rolled, vec![StepId::KenneySources, StepId::Symlink]);
        assert!(state.completed_steps.is_empty());
    }

    #[test]
    fn test_nothing_to_unwind() {
        let mut state = PipelineState::new();
        state.mark_completed(StepId::Symlink, StepOutcome::Succeeded);
        let scope = RollbackScope::enter(&state);

        let mut runner = Recorder::default();
        assert!(scope.unwind(&mut runner, &mut state).is_empty());
        assert!(runner.rolled_back.is_empty());
        assert!(state.is_completed(StepId::Symlink));
    }
}
