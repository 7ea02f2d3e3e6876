//! Terminal validation errors.

use thiserror::Error;

/// Conditions that abort a validation run.
///
/// Ordinary findings are not errors: they are collected as diagnostics in the
/// [`ValidationResult`](crate::ValidationResult).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidateError {
    #[error("validation visited more than {limit} nodes")]
    NodeBudgetExceeded { limit: usize },
}
