use crate::context::ValidationContext;
use crate::visitor::Rule;
use boxql_core::diagnostics::codes;
use boxql_schema::TypeDef;
use boxql_syntax::{FieldSelection, OperationDefinition};

/// Selected fields must exist on the type they are selected on.
pub struct FieldsOnCorrectType;

impl<'a> Rule<'a> for FieldsOnCorrectType {
    fn name(&self) -> &'static str {
        "FieldsOnCorrectType"
    }

    fn enter_operation(&mut self, ctx: &mut ValidationContext<'a>, operation: &'a OperationDefinition) {
        if ctx.current_type().is_none() {
            ctx.error(
                codes::UNDEFINED_TYPE,
                format!("Schema is not configured for {}s", operation.operation),
                [operation.span],
            );
        }
    }

    fn enter_field(&mut self, ctx: &mut ValidationContext<'a>, field: &'a FieldSelection) {
        if ctx.field_definition().is_some() {
            return;
        }
        let Some(parent) = ctx.parent_type().filter(|ty| ty.is_composite()) else {
            return;
        };

        let message = match parent {
            TypeDef::Union(union) => format!(
                "Selections can't be made directly on unions (see selections on {})",
                union.name
            ),
            _ => format!(
                "Field '{}' doesn't exist on type '{}'",
                ctx.name(field.name.value),
                parent.name()
            ),
        };
        ctx.error(codes::UNDEFINED_FIELD, message, [field.span]);
    }
}
