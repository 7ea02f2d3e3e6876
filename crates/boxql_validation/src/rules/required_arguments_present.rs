use crate::context::ValidationContext;
use crate::visitor::Rule;
use boxql_core::diagnostics::codes;
use boxql_core::Span;
use boxql_schema::InputFieldDef;
use boxql_syntax::{Argument, Directive, DirectiveLocation, FieldSelection};
use indexmap::IndexMap;

/// Non-null arguments without a default must be provided.
pub struct RequiredArgumentsPresent;

fn missing_arguments(
    ctx: &ValidationContext<'_>,
    declared: &IndexMap<String, InputFieldDef>,
    provided: &[Argument],
) -> Vec<String> {
    declared
        .values()
        .filter(|arg| arg.ty.is_non_null() && arg.default_value.is_none())
        .filter(|arg| {
            !provided
                .iter()
                .any(|given| *ctx.name(given.name.value) == *arg.name)
        })
        .map(|arg| arg.name.clone())
        .collect()
}

fn report(ctx: &mut ValidationContext<'_>, subject: String, missing: Vec<String>, span: Span) {
    if !missing.is_empty() {
        ctx.error(
            codes::MISSING_ARGUMENT,
            format!("{subject} is missing required arguments: {}", missing.join(", ")),
            [span],
        );
    }
}

impl<'a> Rule<'a> for RequiredArgumentsPresent {
    fn name(&self) -> &'static str {
        "RequiredArgumentsPresent"
    }

    fn enter_field(&mut self, ctx: &mut ValidationContext<'a>, field: &'a FieldSelection) {
        let Some(definition) = ctx.field_definition() else {
            return;
        };
        let missing = missing_arguments(ctx, &definition.arguments, &field.arguments);
        report(ctx, format!("Field '{}'", definition.name), missing, field.span);
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
        let missing = missing_arguments(ctx, &definition.arguments, &directive.arguments);
        report(ctx, format!("Directive '@{}'", definition.name), missing, directive.span);
    }
}
