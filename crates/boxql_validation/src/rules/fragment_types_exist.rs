use crate::context::ValidationContext;
use crate::visitor::Rule;
use boxql_core::diagnostics::codes;
use boxql_syntax::{FragmentDefinition, InlineFragment, Name};

/// Fragment type conditions must name composite types in the schema.
pub struct FragmentTypesExist;

impl FragmentTypesExist {
    fn check(ctx: &mut ValidationContext<'_>, condition: Name) {
        let name = ctx.name(condition.value);
        match ctx.current_type() {
            None => ctx.error(
                codes::UNDEFINED_TYPE,
                format!("No such type {name}, so it can't be a fragment condition"),
                [condition.span],
            ),
            Some(ty) if !ty.is_composite() => ctx.error(
                codes::SELECTION_MISMATCH,
                format!("Invalid fragment on type {name} (must be Union, Interface or Object)"),
                [condition.span],
            ),
            Some(_) => {}
        }
    }
}

impl<'a> Rule<'a> for FragmentTypesExist {
    fn name(&self) -> &'static str {
        "FragmentTypesExist"
    }

    fn enter_fragment_definition(
        &mut self,
        ctx: &mut ValidationContext<'a>,
        fragment: &'a FragmentDefinition,
    ) {
        Self::check(ctx, fragment.type_condition);
    }

    fn enter_inline_fragment(&mut self, ctx: &mut ValidationContext<'a>, inline: &'a InlineFragment) {
        if let Some(condition) = inline.type_condition {
            Self::check(ctx, condition);
        }
    }
}
