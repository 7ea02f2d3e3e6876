//! Executor configuration.

use serde::Deserialize;

/// Limits applied while executing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Maximum number of unwrap steps for one lazy value.
    pub max_lazy_depth: usize,
    /// Operations nested deeper than this are rejected before execution.
    pub max_depth: Option<usize>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_lazy_depth: 64,
            max_depth: None,
        }
    }
}

impl ExecutorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_max_lazy_depth(mut self, steps: usize) -> Self {
        self.max_lazy_depth = steps;
        self
    }

    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }
}
