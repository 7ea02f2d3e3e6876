//! Core utilities for boxql.
//!
//! This crate provides foundational types used throughout boxql:
//! - `span`: Source spans and line/column locations
//! - `text`: String interning
//! - `diagnostics`: Error reporting

pub mod diagnostics;
pub mod span;
pub mod text;

pub use diagnostics::{Diagnostic, DiagnosticBag, DiagnosticSeverity, Label};
pub use span::{LineIndex, SourceLocation, Span};
pub use text::{Interner, Text};
