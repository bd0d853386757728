//! Configuration for the asset pipeline
//!
//! Provides types and parsing for `asset-pipeline.toml` (or JSON) configuration.

pub mod loader;
pub mod schema;

pub use loader::{
    apply_env_overrides, find_config, find_config_from, load_config, load_config_file,
    resolve_config_paths, resolve_path, ConfigError, CONFIG_FILENAME, ENV_PREFIX,
};
pub use schema::*;
