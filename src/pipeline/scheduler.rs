//! Dependency-ordered step scheduling.

use super::error::ConfigurationError;
use super::step::{DependencyGraph, StepId};
use std::collections::BTreeSet;

/// Expand `requested` to every step it transitively depends on.
pub fn transitive_closure(graph: &DependencyGraph, requested: &[StepId]) -> BTreeSet<StepId> {
    let mut closure = BTreeSet::new();
    let mut stack: Vec<StepId> = requested.to_vec();

    while let Some(step) = stack.pop() {
        if closure.insert(step) {
            stack.extend(graph.dependencies(step).filter(|dep| !closure.contains(dep)));
        }
    }

    closure
}

/// Order the closure of `requested` so every step follows its dependencies.
///
/// Among ready steps the one with the smallest name is scheduled first, so the
/// order is the same on every call.
pub fn execution_order(
    graph: &DependencyGraph,
    requested: &[StepId],
) -> Result<Vec<StepId>, ConfigurationError> {
    let mut remaining = transitive_closure(graph, requested);
    let mut scheduled = BTreeSet::new();
    let mut order = Vec::with_capacity(remaining.len());

    while !remaining.is_empty() {
        let next = remaining
            .iter()
            .copied()
            .filter(|step| graph.is_ready(*step, &scheduled))
            .min_by_key(StepId::as_str);

        let Some(step) = next else {
            return Err(ConfigurationError::CircularDependency {
                remaining: remaining.into_iter().collect(),
            });
        };

        remaining.remove(&step);
        scheduled.insert(step);
        order.push(step);
    }

    tracing::debug!(
        order = %order.iter().map(StepId::as_str).collect::<Vec<_>>().join(","),
        "computed execution order"
    );
    Ok(order)
}
