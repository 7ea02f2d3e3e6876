//! Validator configuration.

use serde::Deserialize;

/// Limits applied by the validator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Abort the run once this many AST nodes have been visited.
    pub max_nodes: Option<usize>,
    /// Report an error for operations nested deeper than this.
    pub max_depth: Option<usize>,
}

impl ValidatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the node budget.
    #[must_use]
    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = Some(max_nodes);
        self
    }

    /// Sets the maximum query depth.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }
}
