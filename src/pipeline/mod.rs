//! Dependency-ordered, cacheable, rollback-capable build pipeline
//!
//! A run expands the requested steps to their transitive dependencies,
//! orders them deterministically, and executes each one through a
//! [`StepRunner`]. The cache index persists step results between runs.

pub mod cache;
pub mod error;
pub mod executor;
pub mod result;
pub mod rollback;
pub mod runner;
pub mod scheduler;
pub mod step;
pub mod steps;

pub use cache::{
    cache_key, AlwaysStale, CacheEntry, CacheIndex, CachePolicy, FingerprintMatch,
    StalenessPolicy, CACHE_INDEX_FILENAME,
};
pub use error::{CacheError, ConfigurationError, PipelineError, StepError};
pub use executor::{FailureDisposition, Pipeline};
pub use result::{PipelineState, StepData, StepOutcome, StepResult};
pub use rollback::RollbackScope;
pub use runner::{StepOutput, StepRunner};
pub use scheduler::{execution_order, transitive_closure};
pub use step::{parse_step_list, DependencyGraph, StepId};
pub use steps::{AssetSteps, SPRITE_ATLAS_NAME};
