//! Asset pipeline - build derived game assets from raw sources
//!
//! This library provides functionality to:
//! - Schedule named build steps in dependency order, with caching and rollback
//! - Pack sprite frames into texture atlases (grid and guillotine layouts)
//! - Fetch raw assets from providers and run the processing collaborators

pub mod atlas;
pub mod cli;
pub mod config;
pub mod pipeline;
pub mod processing;
pub mod providers;
