use crate::context::ValidationContext;
use crate::visitor::Rule;
use boxql_core::diagnostics::codes;
use boxql_core::Text;
use boxql_syntax::{Directive, Name, OperationDefinition, Selection, SelectionSet};
use rustc_hash::FxHashSet;

/// Variables used by an operation, including inside the fragments it
/// spreads, must be declared by that operation.
pub struct VariablesAreDefined;

struct Usages<'c, 'a> {
    ctx: &'c ValidationContext<'a>,
    visited: FxHashSet<Text>,
    names: Vec<Name>,
}

impl Usages<'_, '_> {
    fn directives(&mut self, directives: &[Directive]) {
        for directive in directives {
            for argument in &directive.arguments {
                argument.value.for_each_variable(&mut |name| self.names.push(name));
            }
        }
    }

    fn selection_set(&mut self, selection_set: &SelectionSet) {
        for selection in &selection_set.selections {
            self.directives(selection.directives());
            match selection {
                Selection::Field(field) => {
                    for argument in &field.arguments {
                        argument.value.for_each_variable(&mut |name| self.names.push(name));
                    }
                    if let Some(nested) = &field.selection_set {
                        self.selection_set(nested);
                    }
                }
                Selection::InlineFragment(inline) => self.selection_set(&inline.selection_set),
                Selection::FragmentSpread(spread) => {
                    if !self.visited.insert(spread.name.value) {
                        continue;
                    }
                    if let Some(fragment) = self.ctx.fragment(spread.name.value) {
                        self.directives(&fragment.directives);
                        self.selection_set(&fragment.selection_set);
                    }
                }
            }
        }
    }
}

impl<'a> Rule<'a> for VariablesAreDefined {
    fn name(&self) -> &'static str {
        "VariablesAreDefined"
    }

    fn enter_operation(&mut self, ctx: &mut ValidationContext<'a>, operation: &'a OperationDefinition) {
        let mut usages = Usages {
            ctx,
            visited: FxHashSet::default(),
            names: Vec::new(),
        };
        usages.directives(&operation.directives);
        usages.selection_set(&operation.selection_set);
        let names = usages.names;

        let declared: FxHashSet<Text> = operation.variables.iter().map(|v| v.name.value).collect();
        let operation_name = match operation.name {
            Some(name) => ctx.name(name.value).to_string(),
            None => format!("anonymous {}", operation.operation),
        };
        let mut reported = FxHashSet::default();
        for name in names {
            if declared.contains(&name.value) || !reported.insert(name.value) {
                continue;
            }
            ctx.error(
                codes::UNDEFINED_VARIABLE,
                format!(
                    "Variable ${} is used by {operation_name} but not declared",
                    ctx.name(name.value)
                ),
                [name.span],
            );
        }
    }
}
