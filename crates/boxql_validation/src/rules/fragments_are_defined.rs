use crate::context::ValidationContext;
use crate::visitor::Rule;
use boxql_core::diagnostics::codes;
use boxql_syntax::FragmentSpread;

/// Spread fragments must be defined in the document.
pub struct FragmentsAreDefined;

impl<'a> Rule<'a> for FragmentsAreDefined {
    fn name(&self) -> &'static str {
        "FragmentsAreDefined"
    }

    fn enter_fragment_spread(&mut self, ctx: &mut ValidationContext<'a>, spread: &'a FragmentSpread) {
        if ctx.fragment(spread.name.value).is_none() {
            ctx.error(
                codes::UNDEFINED_FRAGMENT,
                format!("Fragment {} was used, but not defined", ctx.name(spread.name.value)),
                [spread.span],
            );
        }
    }
}
