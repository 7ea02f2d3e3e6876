//! Static validation for boxql.
//!
//! A validation run walks an executable document once. Every enabled
//! [`Rule`] observes the walk and reports findings into the shared
//! [`ValidationContext`]; the [`Rewrite`] participant always runs and turns
//! the document into the [`IrDocument`] the executor consumes.
//!
//! ```ignore
//! let schema = Schema::from_sdl(sdl)?;
//! let result = Validator::new(&schema).validate_source("{ dog { name } }")?;
//! assert!(result.is_valid());
//! ```

mod config;
mod context;
mod error;
pub mod ir;
mod rewrite;
pub mod rules;
mod validator;
mod visitor;

pub use config::ValidatorConfig;
pub use context::ValidationContext;
pub use error::ValidateError;
pub use ir::{
    ConditionKind, IrChildren, IrCondition, IrDocument, IrFragment, IrNode, IrOperation,
    IrValue, IrVariable, Variables,
};
pub use rewrite::Rewrite;
pub use rules::{RuleKind, ALL_RULES};
pub use validator::{validate, ValidationResult, Validator};
pub use visitor::Rule;
