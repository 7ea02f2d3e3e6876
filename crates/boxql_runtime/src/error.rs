//! Runtime errors.

use thiserror::Error;

/// Error from a resolver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolverError {
    #[error("Field not found: {0}")]
    FieldNotFound(String),

    #[error("Missing required argument: {0}")]
    MissingArgument(String),

    #[error("Failed to parse argument '{0}': {1}")]
    ArgumentParseError(String, String),

    #[error("Null value for non-nullable field: {0}")]
    NullValue(String),

    #[error("{0}")]
    Custom(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResolverError {
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }
}

/// Error raised while executing an operation.
///
/// Field-level variants end up as entries in the response's `errors`;
/// operation-level variants abort the request before any field runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Resolver(#[from] ResolverError),

    #[error("Unknown operation named '{0}'")]
    UnknownOperation(String),

    #[error("Document does not contain any operations")]
    NoOperation,

    #[error("Must provide operation name if query contains multiple operations")]
    OperationNameRequired,

    #[error("Schema is not configured for {0}s")]
    MissingRootType(String),

    #[error("Query has depth of {depth}, which exceeds max depth of {limit}")]
    DepthLimitExceeded { depth: usize, limit: usize },

    #[error("Lazy value was still pending after {limit} forcing steps")]
    LazyDepthExceeded { limit: usize },

    #[error("Cannot return null for non-nullable field {owner}.{field}")]
    NonNullViolation { owner: String, field: String },

    #[error("Abstract type {abstract_type} must resolve to an object type at runtime for field {owner}.{field}")]
    UnresolvedAbstractType {
        abstract_type: String,
        owner: String,
        field: String,
    },

    #[error("Field {owner}.{field} returned a value that can't be completed as {ty}")]
    InvalidValue {
        owner: String,
        field: String,
        ty: String,
    },
}
