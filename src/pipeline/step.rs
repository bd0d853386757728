//! Step identifiers and the dependency graph between them.

use super::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// A named pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    Symlink,
    KenneySources,
    AiSources,
    Normalize,
    Atlas,
    Metadata,
    Preview,
    Validate,
}

impl StepId {
    /// Every step, in declaration order.
    pub const ALL: [StepId; 8] = [
        StepId::Symlink,
        StepId::KenneySources,
        StepId::AiSources,
        StepId::Normalize,
        StepId::Atlas,
        StepId::Metadata,
        StepId::Preview,
        StepId::Validate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StepId::Symlink => "symlink",
            StepId::KenneySources => "kenney_sources",
            StepId::AiSources => "ai_sources",
            StepId::Normalize => "normalize",
            StepId::Atlas => "atlas",
            StepId::Metadata => "metadata",
            StepId::Preview => "preview",
            StepId::Validate => "validate",
        }
    }

    /// Failure of these steps never aborts a run.
    pub fn is_non_critical(&self) -> bool {
        matches!(self, StepId::Preview | StepId::AiSources)
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepId {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StepId::ALL
            .into_iter()
            .find(|step| step.as_str() == s)
            .ok_or_else(|| ConfigurationError::UnknownStep(s.to_string()))
    }
}

/// Parse a comma-separated step selector such as `"atlas, preview"`.
///
/// Blank entries are ignored; an empty selector yields an empty list.
pub fn parse_step_list(selector: &str) -> Result<Vec<StepId>, ConfigurationError> {
    selector
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(StepId::from_str)
        .collect()
}

/// Owned adjacency map from each step to its prerequisites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyGraph {
    edges: BTreeMap<StepId, BTreeSet<StepId>>,
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::standard()
    }
}

impl DependencyGraph {
    /// Graph with no steps.
    pub fn empty() -> Self {
        Self { edges: BTreeMap::new() }
    }

    /// The asset build graph.
    pub fn standard() -> Self {
        use StepId::*;
        Self::empty()
            .with_step(Symlink, [])
            .with_step(KenneySources, [Symlink])
            .with_step(AiSources, [Symlink])
            .with_step(Normalize, [KenneySources, AiSources])
            .with_step(Atlas, [Normalize])
            .with_step(Metadata, [Atlas])
            .with_step(Preview, [Metadata])
            .with_step(Validate, [Metadata])
    }

    /// Register `step` with the given prerequisites, replacing any previous entry.
    pub fn with_step(mut self, step: StepId, deps: impl IntoIterator<Item = StepId>) -> Self {
        self.insert(step, deps);
        self
    }

    pub fn insert(&mut self, step: StepId, deps: impl IntoIterator<Item = StepId>) {
        self.edges.insert(step, deps.into_iter().collect());
    }

    /// Prerequisites of `step`. Unregistered steps have none.
    pub fn dependencies(&self, step: StepId) -> impl Iterator<Item = StepId> + '_ {
        self.edges.get(&step).into_iter().flat_map(|deps| deps.iter().copied())
    }

    /// Whether every prerequisite of `step` is in `done`.
    pub fn is_ready(&self, step: StepId, done: &BTreeSet<StepId>) -> bool {
        self.dependencies(step).all(|dep| done.contains(&dep))
    }

    /// Steps that list `step` as a direct prerequisite.
    pub fn dependents(&self, step: StepId) -> Vec<StepId> {
        self.edges
            .iter()
            .filter(|(_, deps)| deps.contains(&step))
            .map(|(s, _)| *s)
            .collect()
    }

    pub fn steps(&self) -> impl Iterator<Item = StepId> + '_ {
        self.edges.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_name_round_trip() {
        for step in StepId::ALL {
            assert_eq!(step.as_str().parse::<StepId>().unwrap(), step);
            assert_eq!(step.to_string(), step.as_str());
        }
    }

    #[test]
    fn test_unknown_step() {
        assert_eq!(
            "bake".parse::<StepId>(),
            Err(ConfigurationError::UnknownStep("bake".to_string()))
        );
    }

    #[test]
    fn test_serde_uses_step_names() {
        let json = serde_json::to_string(&StepId::KenneySources).unwrap();
        assert_eq!(json, "\"kenney_sources\"");
        let step: StepId = serde_json::from_str("\"ai_sources\"").unwrap();
        assert_eq!(step, StepId::AiSources);
    }

    #[test]
    fn test_parse_step_list() {
        assert_eq!(
            parse_step_list("atlas, preview,,").unwrap(),
            vec![StepId::Atlas, StepId::Preview]
        );
        assert!(parse_step_list("").unwrap().is_empty());
        assert!(parse_step_list("atlas,nope").is_err());
    }

    #[test]
    fn test_non_critical_steps() {
        let non_critical: Vec<StepId> =
            StepId::ALL.into_iter().filter(StepId::is_non_critical).collect();
        assert_eq!(non_critical, vec![StepId::AiSources, StepId::Preview]);
    }

    #[test]
    fn test_standard_graph() {
        let graph = DependencyGraph::standard();
        assert_eq!(graph.steps().count(), 8);
        assert_eq!(graph.dependencies(StepId::Symlink).count(), 0);
        assert_eq!(
            graph.dependencies(StepId::Normalize).collect::<Vec<_>>(),
            vec![StepId::KenneySources, StepId::AiSources]
        );
        assert_eq!(graph.dependents(StepId::Metadata), vec![StepId::Preview, StepId::Validate]);
    }

    #[test]
    fn test_is_ready() {
        let graph = DependencyGraph::standard();
        let mut done = BTreeSet::new();
        assert!(graph.is_ready(StepId::Symlink, &done));
        assert!(!graph.is_ready(StepId::KenneySources, &done));
        done.insert(StepId::Symlink);
        assert!(graph.is_ready(StepId::KenneySources, &done));
    }
}
