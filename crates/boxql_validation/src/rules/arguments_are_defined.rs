use crate::context::ValidationContext;
use crate::visitor::Rule;
use boxql_core::diagnostics::codes;
use boxql_syntax::{Directive, DirectiveLocation, FieldSelection};

/// Every argument must be declared by its field or directive.
pub struct ArgumentsAreDefined;

impl<'a> Rule<'a> for ArgumentsAreDefined {
    fn name(&self) -> &'static str {
        "ArgumentsAreDefined"
    }

    fn enter_field(&mut self, ctx: &mut ValidationContext<'a>, field: &'a FieldSelection) {
        let Some(definition) = ctx.field_definition() else {
            return;
        };
        for argument in &field.arguments {
            let name = ctx.name(argument.name.value);
            if !definition.arguments.contains_key(&*name) {
                ctx.error(
                    codes::UNDEFINED_ARGUMENT,
                    format!("Field '{}' doesn't accept argument '{name}'", definition.name),
                    [argument.span],
                );
            }
        }
    }

    fn enter_directive(
        &mut self,
        ctx: &mut ValidationContext<'a>,
        directive: &'a Directive,
        _location: DirectiveLocation,
    ) {
        let Some(definition) = ctx.schema().get_directive(&ctx.name(directive.name.value)) else {
            return;
        };
        for argument in &directive.arguments {
            let name = ctx.name(argument.name.value);
            if !definition.arguments.contains_key(&*name) {
                ctx.error(
                    codes::UNDEFINED_ARGUMENT,
                    format!("Directive '@{}' doesn't accept argument '{name}'", definition.name),
                    [argument.span],
                );
            }
        }
    }
}
