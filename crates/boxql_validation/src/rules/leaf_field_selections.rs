use crate::context::ValidationContext;
use crate::visitor::Rule;
use boxql_core::diagnostics::codes;
use boxql_schema::TypeDef;
use boxql_syntax::FieldSelection;

/// Leaf fields can't have selections; composite fields must have them.
pub struct LeafFieldSelections;

impl<'a> Rule<'a> for LeafFieldSelections {
    fn name(&self) -> &'static str {
        "LeafFieldSelections"
    }

    fn enter_field(&mut self, ctx: &mut ValidationContext<'a>, field: &'a FieldSelection) {
        let (Some(definition), Some(ty)) = (ctx.field_definition(), ctx.current_type()) else {
            return;
        };
        let name = ctx.name(field.name.value);

        match (&field.selection_set, ty.is_leaf()) {
            (Some(selection_set), true) => {
                let kind = match ty {
                    TypeDef::Enum(_) => "enums",
                    _ => "scalars",
                };
                ctx.error(
                    codes::SELECTION_MISMATCH,
                    format!(
                        "Selections can't be made on {kind} (field '{name}' returns {} but has selections)",
                        definition.ty
                    ),
                    [selection_set.span],
                );
            }
            (None, false) if ty.is_composite() => {
                ctx.error(
                    codes::SELECTION_MISMATCH,
                    format!(
                        "Field '{name}' of type '{}' must have a selection of subfields",
                        definition.ty
                    ),
                    [field.span],
                );
            }
            _ => {}
        }
    }
}
