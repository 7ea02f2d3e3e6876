//! The response sent back to the caller.

use crate::error::{ExecutionError, ResolverError};
use boxql_core::SourceLocation;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::HashMap;
use std::fmt;

/// A GraphQL response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// The data. `Some(Null)` when a null reached the root.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Json>,
    /// The errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

impl Response {
    /// Creates a response from execution output.
    pub fn new(data: Json, errors: Vec<FieldError>) -> Self {
        Self {
            data: Some(data),
            errors: (!errors.is_empty()).then_some(errors),
        }
    }

    /// Creates an error response without data.
    pub fn error(error: FieldError) -> Self {
        Self {
            data: None,
            errors: Some(vec![error]),
        }
    }

    /// Returns true if the response has errors.
    pub fn has_errors(&self) -> bool {
        self.errors.as_ref().is_some_and(|e| !e.is_empty())
    }

    /// Error messages, in order.
    pub fn messages(&self) -> Vec<&str> {
        self.errors
            .iter()
            .flatten()
            .map(|e| e.message.as_str())
            .collect()
    }
}

/// A field error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    /// The error message.
    pub message: String,
    /// Where the field appears in the query.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<SourceLocation>>,
    /// The path to the field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<PathSegment>>,
    /// Error extensions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<HashMap<String, Json>>,
}

impl FieldError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: None,
            path: None,
            extensions: None,
        }
    }

    pub fn with_path(mut self, path: Vec<PathSegment>) -> Self {
        self.path = Some(path);
        self
    }

    /// Adds source locations; an empty list is ignored.
    pub fn with_locations(mut self, locations: Vec<SourceLocation>) -> Self {
        if !locations.is_empty() {
            self.locations = Some(locations);
        }
        self
    }

    pub fn with_extension(mut self, key: impl Into<String>, value: Json) -> Self {
        self.extensions
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value);
        self
    }

    /// Sets the error code extension.
    pub fn with_code(self, code: impl Into<String>) -> Self {
        self.with_extension("code", Json::String(code.into()))
    }
}

impl From<ResolverError> for FieldError {
    fn from(error: ResolverError) -> Self {
        FieldError::new(error.to_string())
    }
}

impl From<ExecutionError> for FieldError {
    fn from(error: ExecutionError) -> Self {
        FieldError::new(error.to_string())
    }
}

/// A path segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => f.write_str(name),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}
