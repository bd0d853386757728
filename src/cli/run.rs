//! Pipeline command implementations (run, plan)

use std::path::Path;
use std::process::ExitCode;

use super::{load_pipeline_config, selected_steps, EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};
use crate::pipeline::{execution_order, AssetSteps, CachePolicy, DependencyGraph, Pipeline, PipelineError};

/// Run the run command
pub fn run_pipeline(
    config_path: Option<&Path>,
    steps: Option<&str>,
    rollback: bool,
    cache_policy: Option<CachePolicy>,
) -> ExitCode {
    let mut config = match load_pipeline_config(config_path) {
        Ok(config) => config,
        Err(code) => return code,
    };
    let steps = match selected_steps(steps) {
        Ok(steps) => steps,
        Err(code) => return code,
    };
    if let Some(policy) = cache_policy {
        config.cache.policy = policy;
    }

    let mut pipeline = Pipeline::from_config(&config, AssetSteps::new(config.clone()));
    let result = if rollback {
        pipeline.rollback_on_failure(|p| p.run(&steps))
    } else {
        pipeline.run(&steps)
    };

    match result {
        Ok(()) => {
            println!("{}", pipeline.state().summary());
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("{}", pipeline.state().summary());
            match e {
                PipelineError::Configuration(_) => ExitCode::from(EXIT_INVALID_ARGS),
                _ => ExitCode::from(EXIT_ERROR),
            }
        }
    }
}

/// Run the plan command
pub fn run_plan(steps: Option<&str>) -> ExitCode {
    let steps = match selected_steps(steps) {
        Ok(steps) => steps,
        Err(code) => return code,
    };

    let graph = DependencyGraph::standard();
    let order = match execution_order(&graph, &steps) {
        Ok(order) => order,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };

    println!("Execution plan: {} steps", order.len());
    for (i, step) in order.iter().enumerate() {
        let deps: Vec<&str> = graph.dependencies(*step).map(|d| d.as_str()).collect();
        if deps.is_empty() {
            println!("  {}. {}", i + 1, step);
        } else {
            println!("  {}. {} (after {})", i + 1, step, deps.join(", "));
        }
    }
    ExitCode::from(EXIT_SUCCESS)
}
