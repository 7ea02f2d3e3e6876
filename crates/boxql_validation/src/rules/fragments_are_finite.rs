use crate::context::ValidationContext;
use crate::visitor::Rule;
use boxql_core::diagnostics::codes;
use boxql_core::Text;
use boxql_syntax::{Selection, SelectionSet};
use rustc_hash::FxHashSet;

/// Fragments must not spread themselves, directly or through other fragments.
pub struct FragmentsAreFinite;

fn spreads(selection_set: &SelectionSet, out: &mut Vec<Text>) {
    for selection in &selection_set.selections {
        match selection {
            Selection::Field(field) => {
                if let Some(nested) = &field.selection_set {
                    spreads(nested, out);
                }
            }
            Selection::InlineFragment(inline) => spreads(&inline.selection_set, out),
            Selection::FragmentSpread(spread) => out.push(spread.name.value),
        }
    }
}

/// True if following spreads from `start` leads back to it.
fn reaches_itself(ctx: &ValidationContext<'_>, start: Text) -> bool {
    let mut seen = FxHashSet::default();
    let mut pending = Vec::new();
    if let Some(fragment) = ctx.fragment(start) {
        spreads(&fragment.selection_set, &mut pending);
    }
    while let Some(name) = pending.pop() {
        if name == start {
            return true;
        }
        if !seen.insert(name) {
            continue;
        }
        if let Some(fragment) = ctx.fragment(name) {
            spreads(&fragment.selection_set, &mut pending);
        }
    }
    false
}

impl<'a> Rule<'a> for FragmentsAreFinite {
    fn name(&self) -> &'static str {
        "FragmentsAreFinite"
    }

    fn leave_document(&mut self, ctx: &mut ValidationContext<'a>) {
        for fragment in ctx.document().fragments() {
            if reaches_itself(ctx, fragment.name.value) {
                ctx.error(
                    codes::FRAGMENT_CYCLE,
                    format!("Fragment {} contains an infinite loop", ctx.name(fragment.name.value)),
                    [fragment.span],
                );
            }
        }
    }
}
