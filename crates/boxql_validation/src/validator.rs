//! The validator entry point.

use crate::config::ValidatorConfig;
use crate::context::ValidationContext;
use crate::error::ValidateError;
use crate::ir::IrDocument;
use crate::rewrite::Rewrite;
use crate::rules::{RuleKind, ALL_RULES};
use crate::visitor::{walk_document, Rule};
use boxql_core::{Diagnostic, Interner, LineIndex};
use boxql_schema::Schema;
use boxql_syntax::Document;

/// The outcome of a validation run.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Findings in detection order.
    pub errors: Vec<Diagnostic>,
    /// The rewritten document, present only when `errors` is empty.
    pub internal_representation: Option<IrDocument>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// The error titles, in order.
    pub fn messages(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.title.as_str()).collect()
    }
}

/// Validates documents against a schema.
///
/// ```ignore
/// let result = Validator::new(&schema)
///     .with_config(ValidatorConfig::new().with_max_depth(10))
///     .validate_source("{ dog { name } }")?;
/// ```
#[derive(Debug, Clone)]
pub struct Validator<'s> {
    schema: &'s Schema,
    rules: Vec<RuleKind>,
    config: ValidatorConfig,
    enabled: bool,
}

impl<'s> Validator<'s> {
    /// Creates a validator running every built-in rule.
    pub fn new(schema: &'s Schema) -> Self {
        Self {
            schema,
            rules: ALL_RULES.to_vec(),
            config: ValidatorConfig::default(),
            enabled: true,
        }
    }

    /// Replaces the rule set.
    #[must_use]
    pub fn with_rules(mut self, rules: impl IntoIterator<Item = RuleKind>) -> Self {
        self.rules = rules.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: ValidatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Skips every rule. The document is still rewritten.
    #[must_use]
    pub fn without_validation(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Validates a parsed document.
    pub fn validate<'a>(
        &'a self,
        document: &'a Document<'a>,
        interner: &'a Interner,
    ) -> Result<ValidationResult, ValidateError> {
        self.run(document, interner, None)
    }

    /// Parses and validates `source`.
    ///
    /// Syntax errors are returned as findings. Rewritten nodes carry
    /// line/column locations.
    pub fn validate_source(&self, source: &str) -> Result<ValidationResult, ValidateError> {
        let interner = Interner::new();
        let parsed = boxql_syntax::parse(source, &interner);
        if parsed.has_errors() {
            return Ok(ValidationResult {
                errors: parsed.diagnostics.into_vec(),
                internal_representation: None,
            });
        }
        let line_index = LineIndex::new(source);
        self.run(&parsed.document, &interner, Some(&line_index))
    }

    fn run<'a>(
        &'a self,
        document: &'a Document<'a>,
        interner: &'a Interner,
        line_index: Option<&'a LineIndex>,
    ) -> Result<ValidationResult, ValidateError> {
        let mut ctx = ValidationContext::new(self.schema, document, interner)
            .with_node_budget(self.config.max_nodes);

        let mut rules: Vec<Box<dyn Rule<'a> + 'a>> = if self.enabled {
            self.rules
                .iter()
                .map(|kind| kind.instantiate(&self.config))
                .collect()
        } else {
            Vec::new()
        };
        tracing::debug!(rules = rules.len(), "validation started");

        let mut rewrite = Rewrite::new(line_index);
        {
            let mut participants: Vec<&mut dyn Rule<'a>> = Vec::with_capacity(rules.len() + 1);
            participants.push(&mut rewrite);
            participants.extend(rules.iter_mut().map(|rule| rule.as_mut() as &mut dyn Rule<'a>));
            walk_document(&mut ctx, &mut participants)?;
        }

        let ir = rewrite.finish();
        for rule in &mut rules {
            rule.check_ir(&mut ctx, &ir);
        }

        let errors = ctx.into_diagnostics().into_vec();
        tracing::debug!(errors = errors.len(), "validation finished");
        let internal_representation = errors.is_empty().then_some(ir);
        Ok(ValidationResult {
            errors,
            internal_representation,
        })
    }
}

/// Validates `document` with the given rules and default limits.
pub fn validate<'a>(
    document: &'a Document<'a>,
    interner: &'a Interner,
    schema: &'a Schema,
    rules: &[RuleKind],
) -> Result<ValidationResult, ValidateError> {
    Validator::new(schema)
        .with_rules(rules.iter().copied())
        .validate(document, interner)
}
