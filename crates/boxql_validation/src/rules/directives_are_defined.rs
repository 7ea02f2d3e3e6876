use crate::context::ValidationContext;
use crate::visitor::Rule;
use boxql_core::diagnostics::codes;
use boxql_syntax::{Directive, DirectiveLocation};

/// Directives must be defined and used where their definition allows.
pub struct DirectivesAreDefined;

impl<'a> Rule<'a> for DirectivesAreDefined {
    fn name(&self) -> &'static str {
        "DirectivesAreDefined"
    }

    fn enter_directive(
        &mut self,
        ctx: &mut ValidationContext<'a>,
        directive: &'a Directive,
        location: DirectiveLocation,
    ) {
        let name = ctx.name(directive.name.value);
        match ctx.schema().get_directive(&name) {
            None => ctx.error(
                codes::UNDEFINED_DIRECTIVE,
                format!("Directive @{name} is not defined"),
                [directive.span],
            ),
            Some(definition) if !definition.locations.contains(&location) => {
                let allowed: Vec<&str> = definition.locations.iter().map(|l| l.as_str()).collect();
                ctx.error(
                    codes::UNDEFINED_DIRECTIVE,
                    format!(
                        "'@{name}' can't be applied to {} (allowed: {})",
                        location.as_str(),
                        allowed.join(", ")
                    ),
                    [directive.span],
                );
            }
            Some(_) => {}
        }
    }
}
