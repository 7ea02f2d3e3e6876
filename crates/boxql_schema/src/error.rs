//! Schema construction errors.

use boxql_core::Diagnostic;
use thiserror::Error;

/// Errors raised while building or printing a schema.
///
/// These indicate a broken schema definition, never a problem with a query.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("schema source has {} syntax error(s)", .0.len())]
    Syntax(Vec<Diagnostic>),

    #[error("schema source contains an executable definition")]
    ExecutableDefinition,

    #[error("type `{0}` is defined more than once")]
    DuplicateType(String),

    #[error("unknown type `{name}` referenced by `{referenced_by}`")]
    UnknownType { name: String, referenced_by: String },

    #[error("`{name}` must be an object type to be the {operation} root")]
    InvalidRootType { name: String, operation: &'static str },

    #[error("unexpected default value {value} for type `{ty}`")]
    UnexpectedDefaultValue { ty: String, value: serde_json::Value },
}
