//! Validation context.
//!
//! One context is created per validation run. It owns the collected
//! diagnostics, the fragment table and the type scope stack that rules read
//! while the traversal is inside a selection set.

use crate::error::ValidateError;
use boxql_core::{Diagnostic, DiagnosticBag, Interner, Span, Text};
use boxql_schema::{FieldDef, Schema, TypeDef};
use boxql_syntax::{Document, FragmentDefinition, OperationDefinition};
use rustc_hash::FxHashMap;
use std::rc::Rc;

/// Shared state for one validation run.
pub struct ValidationContext<'a> {
    schema: &'a Schema,
    document: &'a Document<'a>,
    interner: &'a Interner,
    diagnostics: DiagnosticBag,
    fragments: FxHashMap<Text, &'a FragmentDefinition>,
    type_stack: Vec<Option<&'a TypeDef>>,
    field_stack: Vec<Option<&'a FieldDef>>,
    operation: Option<&'a OperationDefinition>,
    visited_nodes: usize,
    max_nodes: Option<usize>,
}

impl<'a> ValidationContext<'a> {
    pub fn new(schema: &'a Schema, document: &'a Document<'a>, interner: &'a Interner) -> Self {
        let mut fragments = FxHashMap::default();
        for fragment in document.fragments() {
            fragments.entry(fragment.name.value).or_insert(fragment);
        }

        Self {
            schema,
            document,
            interner,
            diagnostics: DiagnosticBag::new(),
            fragments,
            type_stack: Vec::new(),
            field_stack: Vec::new(),
            operation: None,
            visited_nodes: 0,
            max_nodes: None,
        }
    }

    pub(crate) fn with_node_budget(mut self, max_nodes: Option<usize>) -> Self {
        self.max_nodes = max_nodes;
        self
    }

    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    pub fn document(&self) -> &'a Document<'a> {
        self.document
    }

    pub fn interner(&self) -> &'a Interner {
        self.interner
    }

    /// Resolves an interned name.
    pub fn name(&self, text: Text) -> Rc<str> {
        self.interner.resolve(text).unwrap_or_else(|| Rc::from(""))
    }

    /// Looks up a fragment definition. The first definition of a name wins.
    pub fn fragment(&self, name: Text) -> Option<&'a FragmentDefinition> {
        self.fragments.get(&name).copied()
    }

    /// Looks up a schema type by interned name.
    pub fn type_named(&self, name: Text) -> Option<&'a TypeDef> {
        self.schema.get_type(&self.name(name))
    }

    /// The type whose selection set is being visited.
    ///
    /// Inside a field hook this is the field's return type.
    pub fn current_type(&self) -> Option<&'a TypeDef> {
        self.type_stack.last().copied().flatten()
    }

    /// The type enclosing the current one.
    ///
    /// Inside a field hook this is the type that owns the field.
    pub fn parent_type(&self) -> Option<&'a TypeDef> {
        let len = self.type_stack.len();
        if len < 2 {
            return None;
        }
        self.type_stack[len - 2]
    }

    /// The schema definition of the field being visited.
    pub fn field_definition(&self) -> Option<&'a FieldDef> {
        self.field_stack.last().copied().flatten()
    }

    /// The operation being visited, if any.
    pub fn operation(&self) -> Option<&'a OperationDefinition> {
        self.operation
    }

    /// Records a finding.
    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.add(diagnostic);
    }

    /// Records an error attached to every span in `spans`.
    pub fn error(
        &mut self,
        code: &'static str,
        message: impl Into<String>,
        spans: impl IntoIterator<Item = Span>,
    ) {
        self.report(Diagnostic::error(code, message).with_spans(spans));
    }

    pub fn diagnostics(&self) -> &DiagnosticBag {
        &self.diagnostics
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }

    pub(crate) fn into_diagnostics(self) -> DiagnosticBag {
        self.diagnostics
    }

    pub(crate) fn set_operation(&mut self, operation: Option<&'a OperationDefinition>) {
        self.operation = operation;
    }

    pub(crate) fn push_type(&mut self, ty: Option<&'a TypeDef>) {
        self.type_stack.push(ty);
    }

    pub(crate) fn pop_type(&mut self) {
        self.type_stack.pop();
    }

    pub(crate) fn push_field(&mut self, field: Option<&'a FieldDef>) {
        self.field_stack.push(field);
    }

    pub(crate) fn pop_field(&mut self) {
        self.field_stack.pop();
    }

    /// Counts one visited node against the budget.
    pub(crate) fn visit_node(&mut self) -> Result<(), ValidateError> {
        self.visited_nodes += 1;
        match self.max_nodes {
            Some(limit) if self.visited_nodes > limit => {
                Err(ValidateError::NodeBudgetExceeded { limit })
            }
            _ => Ok(()),
        }
    }
}
