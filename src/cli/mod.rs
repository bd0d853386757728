//! Command-line interface implementation
//!
//! This module defines the CLI surface and dispatches to submodules
//! for specific command implementations.

mod atlas;
mod cache;
mod run;

use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::config::{find_config, load_config, resolve_config_paths, PipelineConfig};
use crate::pipeline::{parse_step_list, CachePolicy, StepId};

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// Build game assets: fetch sources, normalize sprites, pack atlases
#[derive(Parser)]
#[command(name = "asset-pipeline")]
#[command(about = "Build game assets: fetch sources, normalize sprites, pack texture atlases")]
#[command(version)]
pub struct Cli {
    /// Configuration file (.toml or .json). Defaults to the nearest asset-pipeline.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run pipeline steps and their dependencies
    Run {
        /// Comma-separated steps to run (default: all)
        #[arg(long)]
        steps: Option<String>,

        /// Undo steps completed by this run if it fails
        #[arg(long)]
        rollback: bool,

        /// Cache staleness policy: always_stale or fingerprint_match
        #[arg(long)]
        cache_policy: Option<CachePolicy>,
    },

    /// Print the execution order without running anything
    Plan {
        /// Comma-separated steps to plan (default: all)
        #[arg(long)]
        steps: Option<String>,
    },

    /// Inspect or clear the step cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Build a single atlas from a directory of images
    Atlas {
        #[command(subcommand)]
        action: AtlasAction,
    },
}

#[derive(Subcommand)]
pub enum CacheAction {
    /// List cache entries
    Show,
    /// Remove every cache entry
    Clear,
}

#[derive(Subcommand)]
pub enum AtlasAction {
    /// Canonical 512x512 worker walking atlas from 64 frames of 64x64
    Worker {
        /// Directory of frame PNGs, ordered by file name
        input: PathBuf,
        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
        /// Atlas name
        #[arg(long, default_value = "worker")]
        name: String,
    },

    /// Grid atlas for a unit animation
    Unit {
        /// Directory of frame PNGs, ordered by file name
        input: PathBuf,
        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
        /// Unit name
        #[arg(long)]
        name: String,
        /// Number of directions (rows)
        #[arg(long, default_value = "8")]
        directions: u32,
        /// Frames per direction (columns)
        #[arg(long, default_value = "8")]
        frames: u32,
        /// Frame size (e.g., "64x64")
        #[arg(long, default_value = "64x64", value_parser = parse_size)]
        frame_size: (u32, u32),
    },

    /// Packed atlas from sprites of any size
    Sprites {
        /// Directory of sprite PNGs
        input: PathBuf,
        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
        /// Atlas name
        #[arg(long, default_value = "sprites")]
        name: String,
    },
}

/// Parse a `WIDTHxHEIGHT` size.
pub(crate) fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("invalid size '{}', expected WIDTHxHEIGHT", s))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| format!("invalid size '{}', dimensions must be positive integers", s))
    };
    Ok((parse(w)?, parse(h)?))
}

/// Run the parsed CLI
pub fn dispatch(cli: Cli) -> ExitCode {
    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Run { steps, rollback, cache_policy } => {
            run::run_pipeline(config_path, steps.as_deref(), rollback, cache_policy)
        }
        Commands::Plan { steps } => run::run_plan(steps.as_deref()),
        Commands::Cache { action } => cache::run_cache(config_path, action),
        Commands::Atlas { action } => atlas::run_atlas(config_path, action),
    }
}

/// Load configuration, resolving relative paths against the config file's
/// directory (or the working directory when no file is used).
pub(crate) fn load_pipeline_config(path: Option<&Path>) -> Result<PipelineConfig, ExitCode> {
    let config_path = path.map(Path::to_path_buf).or_else(find_config);
    let mut config = match load_config(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return Err(ExitCode::from(EXIT_INVALID_ARGS));
        }
    };

    let root = config_path
        .as_deref()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());
    resolve_config_paths(&mut config, &root);
    Ok(config)
}

/// Steps selected by `--steps`, or every step.
pub(crate) fn selected_steps(selector: Option<&str>) -> Result<Vec<StepId>, ExitCode> {
    match selector {
        None => Ok(StepId::ALL.to_vec()),
        Some(s) => parse_step_list(s).map_err(|e| {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_INVALID_ARGS)
        }),
    }
}
