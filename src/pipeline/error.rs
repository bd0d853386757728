//! Pipeline error types.

use super::step::StepId;
use crate::atlas::PackingError;
use crate::providers::ProviderError;

fn join_steps(steps: &[StepId]) -> String {
    steps.iter().map(StepId::as_str).collect::<Vec<_>>().join(", ")
}

/// The requested step set or dependency graph is unusable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigurationError {
    #[error("Unknown pipeline step '{0}'")]
    UnknownStep(String),
    /// No remaining step has all of its dependencies scheduled
    #[error("Circular dependency detected among steps: {}", join_steps(.remaining))]
    CircularDependency { remaining: Vec<StepId> },
}

/// Error raised by a pipeline run.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PipelineError {
    #[error("Pipeline configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    /// A critical step failed and the remaining steps were abandoned
    #[error("Step {step} failed: {message}")]
    StepFailed { step: StepId, message: String, recoverable: bool },
}

impl PipelineError {
    /// The step that caused the failure, if any.
    pub fn step(&self) -> Option<StepId> {
        match self {
            PipelineError::StepFailed { step, .. } => Some(*step),
            PipelineError::Configuration(_) => None,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self, PipelineError::StepFailed { recoverable: true, .. })
    }
}

/// Error returned by a step body or rollback hook.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StepError {
    #[error(transparent)]
    Packing(#[from] PackingError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),
    #[error("{0}")]
    Message(String),
}

impl StepError {
    pub fn msg(message: impl Into<String>) -> Self {
        StepError::Message(message.into())
    }
}

/// Cache index could not be written.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circular_dependency_names_steps() {
        let err = ConfigurationError::CircularDependency {
            remaining: vec![StepId::Atlas, StepId::Normalize],
        };
        assert_eq!(err.to_string(), "Circular dependency detected among steps: atlas, normalize");
    }

    #[test]
    fn test_step_failed_carries_step() {
        let err = PipelineError::StepFailed {
            step: StepId::Metadata,
            message: "disk full".to_string(),
            recoverable: false,
        };
        assert_eq!(err.step(), Some(StepId::Metadata));
        assert!(!err.is_recoverable());
        assert_eq!(err.to_string(), "Step metadata failed: disk full");
    }

    #[test]
    fn test_configuration_error_has_no_step() {
        let err = PipelineError::from(ConfigurationError::UnknownStep("bake".to_string()));
        assert_eq!(err.step(), None);
        assert!(err.to_string().contains("bake"));
    }
}
