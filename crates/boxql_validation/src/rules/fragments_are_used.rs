use crate::context::ValidationContext;
use crate::visitor::Rule;
use boxql_core::diagnostics::codes;
use boxql_core::Text;
use boxql_syntax::FragmentSpread;
use rustc_hash::FxHashSet;

/// Every defined fragment must be spread somewhere.
#[derive(Default)]
pub struct FragmentsAreUsed {
    used: FxHashSet<Text>,
}

impl<'a> Rule<'a> for FragmentsAreUsed {
    fn name(&self) -> &'static str {
        "FragmentsAreUsed"
    }

    fn enter_fragment_spread(&mut self, _ctx: &mut ValidationContext<'a>, spread: &'a FragmentSpread) {
        self.used.insert(spread.name.value);
    }

    fn leave_document(&mut self, ctx: &mut ValidationContext<'a>) {
        for fragment in ctx.document().fragments() {
            if !self.used.contains(&fragment.name.value) {
                ctx.error(
                    codes::UNUSED_FRAGMENT,
                    format!("Fragment {} was defined, but not used", ctx.name(fragment.name.value)),
                    [fragment.span],
                );
            }
        }
    }
}
