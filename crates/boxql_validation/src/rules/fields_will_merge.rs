//! Fields with the same response key must be mergeable.
//!
//! Two fields sharing a response key conflict when they can apply to the same
//! object but select different fields or pass different arguments. Fields on
//! two distinct object types are mutually exclusive; their sub-selections are
//! still compared, with exclusivity carried down.
//!
//! Fragment comparisons are cached by sorted name pair and exclusivity, so a
//! fragment spread in many places is only compared once per pairing.

use crate::context::ValidationContext;
use crate::visitor::Rule;
use boxql_core::diagnostics::codes;
use boxql_core::Text;
use boxql_schema::{FieldDef, TypeDef};
use boxql_syntax::{
    print_value, FieldSelection, FragmentDefinition, OperationDefinition, Selection, SelectionSet,
    SelectionSetId,
};
use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;
use std::rc::Rc;

/// One field appearance attributed to the type it was selected on.
#[derive(Clone, Copy)]
struct FieldRecord<'a> {
    node: &'a FieldSelection,
    definition: Option<&'a FieldDef>,
    parent_type: &'a TypeDef,
}

type ResponseKeys<'a> = IndexMap<Text, Vec<FieldRecord<'a>>>;

/// Fields grouped by response key plus the fragment spreads of one selection set.
#[derive(Default)]
struct FieldsAndFragments<'a> {
    set: Option<SelectionSetId>,
    fields: ResponseKeys<'a>,
    fragment_names: Vec<Text>,
}

/// The field merging rule.
#[derive(Default)]
pub struct FieldsWillMerge<'a> {
    fields_and_fragments: FxHashMap<SelectionSetId, Rc<FieldsAndFragments<'a>>>,
    compared_fragments: FxHashSet<(Text, Text, bool)>,
    visited_fragments: FxHashSet<(Option<SelectionSetId>, Text, bool)>,
    fragment_pairs_compared: usize,
}

impl<'a> FieldsWillMerge<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of fragment pairs compared so far, cache hits excluded.
    pub fn fragment_pairs_compared(&self) -> usize {
        self.fragment_pairs_compared
    }

    fn conflicts_within_selection_set(
        &mut self,
        ctx: &mut ValidationContext<'a>,
        selection_set: &'a SelectionSet,
        parent_type: &'a TypeDef,
    ) {
        let set = self.fields_and_fragments(ctx, Some(selection_set), parent_type);

        self.find_conflicts_within(ctx, &set.fields);

        for (i, &fragment) in set.fragment_names.iter().enumerate() {
            self.find_conflicts_between_fields_and_fragment(ctx, fragment, &set, false);
            for &other in &set.fragment_names[i + 1..] {
                self.find_conflicts_between_fragments(ctx, fragment, other, false);
            }
        }
    }

    fn find_conflicts_within(&mut self, ctx: &mut ValidationContext<'a>, fields: &ResponseKeys<'a>) {
        for (&key, records) in fields {
            for (i, &first) in records.iter().enumerate() {
                for &second in &records[i + 1..] {
                    self.find_conflict(ctx, key, first, second, false);
                }
            }
        }
    }

    fn find_conflicts_between_fragments(
        &mut self,
        ctx: &mut ValidationContext<'a>,
        name1: Text,
        name2: Text,
        mutually_exclusive: bool,
    ) {
        if name1 == name2 {
            return;
        }
        let key = (name1.min(name2), name1.max(name2), mutually_exclusive);
        if !self.compared_fragments.insert(key) {
            tracing::trace!(
                left = %ctx.name(key.0),
                right = %ctx.name(key.1),
                mutually_exclusive,
                "fragment pair already compared"
            );
            return;
        }

        let (Some(fragment1), Some(fragment2)) = (ctx.fragment(name1), ctx.fragment(name2)) else {
            return;
        };
        let (Some(type1), Some(type2)) = (
            ctx.type_named(fragment1.type_condition.value),
            ctx.type_named(fragment2.type_condition.value),
        ) else {
            return;
        };
        self.fragment_pairs_compared += 1;

        let set1 = self.fields_and_fragments(ctx, Some(&fragment1.selection_set), type1);
        let set2 = self.fields_and_fragments(ctx, Some(&fragment2.selection_set), type2);

        self.find_conflicts_between(ctx, &set1.fields, &set2.fields, mutually_exclusive);

        for &nested in &set2.fragment_names {
            self.find_conflicts_between_fragments(ctx, name1, nested, mutually_exclusive);
        }
        for &nested in &set1.fragment_names {
            self.find_conflicts_between_fragments(ctx, nested, name2, mutually_exclusive);
        }
    }

    /// Compares a field collection with a fragment and every fragment it spreads.
    fn find_conflicts_between_fields_and_fragment(
        &mut self,
        ctx: &mut ValidationContext<'a>,
        fragment_name: Text,
        fields: &FieldsAndFragments<'a>,
        mutually_exclusive: bool,
    ) {
        if !self
            .visited_fragments
            .insert((fields.set, fragment_name, mutually_exclusive))
        {
            return;
        }

        let Some(fragment) = ctx.fragment(fragment_name) else {
            return;
        };
        let Some(fragment_type) = ctx.type_named(fragment.type_condition.value) else {
            return;
        };
        let fragment_set = self.fields_and_fragments(ctx, Some(&fragment.selection_set), fragment_type);

        self.find_conflicts_between(ctx, &fields.fields, &fragment_set.fields, mutually_exclusive);

        for &nested in &fragment_set.fragment_names {
            self.find_conflicts_between_fields_and_fragment(ctx, nested, fields, mutually_exclusive);
        }
    }

    fn find_conflicts_between(
        &mut self,
        ctx: &mut ValidationContext<'a>,
        fields1: &ResponseKeys<'a>,
        fields2: &ResponseKeys<'a>,
        mutually_exclusive: bool,
    ) {
        for (&key, records1) in fields1 {
            let Some(records2) = fields2.get(&key) else {
                continue;
            };
            for &field1 in records1 {
                for &field2 in records2 {
                    self.find_conflict(ctx, key, field1, field2, mutually_exclusive);
                }
            }
        }
    }

    fn find_conflict(
        &mut self,
        ctx: &mut ValidationContext<'a>,
        response_key: Text,
        field1: FieldRecord<'a>,
        field2: FieldRecord<'a>,
        mutually_exclusive: bool,
    ) {
        let node1 = field1.node;
        let node2 = field2.node;
        let mutually_exclusive = mutually_exclusive
            || (field1.parent_type.name() != field2.parent_type.name()
                && field1.parent_type.is_object()
                && field2.parent_type.is_object());

        if !mutually_exclusive {
            let key = ctx.name(response_key);
            if node1.name.value != node2.name.value {
                let mut names = [ctx.name(node1.name.value), ctx.name(node2.name.value)];
                names.sort();
                ctx.error(
                    codes::FIELD_CONFLICT,
                    format!(
                        "Field '{key}' has a field conflict: {} or {}?",
                        names[0], names[1]
                    ),
                    [node1.span, node2.span],
                );
            }

            let args1 = serialize_arguments(ctx, node1);
            let args2 = serialize_arguments(ctx, node2);
            if args1 != args2 {
                let mut args = [args1, args2];
                args.sort();
                ctx.error(
                    codes::ARGUMENT_CONFLICT,
                    format!(
                        "Field '{key}' has an argument conflict: {} or {}?",
                        args[0], args[1]
                    ),
                    [node1.span, node2.span],
                );
            }
        }

        self.find_conflicts_between_sub_selection_sets(ctx, field1, field2, mutually_exclusive);
    }

    fn find_conflicts_between_sub_selection_sets(
        &mut self,
        ctx: &mut ValidationContext<'a>,
        field1: FieldRecord<'a>,
        field2: FieldRecord<'a>,
        mutually_exclusive: bool,
    ) {
        let (Some(definition1), Some(definition2)) = (field1.definition, field2.definition) else {
            return;
        };
        let schema = ctx.schema();
        let (Some(type1), Some(type2)) = (
            schema.get_type(definition1.ty.inner_name()),
            schema.get_type(definition2.ty.inner_name()),
        ) else {
            return;
        };

        let set1 = self.fields_and_fragments(ctx, field1.node.selection_set.as_ref(), type1);
        let set2 = self.fields_and_fragments(ctx, field2.node.selection_set.as_ref(), type2);

        self.find_conflicts_between(ctx, &set1.fields, &set2.fields, mutually_exclusive);

        for &fragment in &set1.fragment_names {
            self.find_conflicts_between_fields_and_fragment(ctx, fragment, &set2, mutually_exclusive);
        }
        for &fragment in &set2.fragment_names {
            self.find_conflicts_between_fields_and_fragment(ctx, fragment, &set1, mutually_exclusive);
        }

        for &fragment1 in &set1.fragment_names {
            for &fragment2 in &set2.fragment_names {
                self.find_conflicts_between_fragments(ctx, fragment1, fragment2, mutually_exclusive);
            }
        }
    }

    /// Groups the fields of a selection set by response key, memoized per set.
    fn fields_and_fragments(
        &mut self,
        ctx: &ValidationContext<'a>,
        selection_set: Option<&'a SelectionSet>,
        owner_type: &'a TypeDef,
    ) -> Rc<FieldsAndFragments<'a>> {
        let Some(selection_set) = selection_set else {
            return Rc::default();
        };
        if let Some(cached) = self.fields_and_fragments.get(&selection_set.id) {
            return Rc::clone(cached);
        }

        let mut result = FieldsAndFragments {
            set: Some(selection_set.id),
            ..FieldsAndFragments::default()
        };
        find_fields_and_fragments(ctx, selection_set, owner_type, &mut result);
        let result = Rc::new(result);
        self.fields_and_fragments
            .insert(selection_set.id, Rc::clone(&result));
        result
    }
}

fn find_fields_and_fragments<'a>(
    ctx: &ValidationContext<'a>,
    selection_set: &'a SelectionSet,
    owner_type: &'a TypeDef,
    out: &mut FieldsAndFragments<'a>,
) {
    for selection in &selection_set.selections {
        match selection {
            Selection::Field(node) => {
                let definition = ctx
                    .schema()
                    .get_field(owner_type.name(), &ctx.name(node.name.value));
                out.fields
                    .entry(node.response_key())
                    .or_default()
                    .push(FieldRecord {
                        node,
                        definition,
                        parent_type: owner_type,
                    });
            }
            Selection::InlineFragment(inline) => {
                let fragment_type = match inline.type_condition {
                    Some(name) => ctx.type_named(name.value),
                    None => Some(owner_type),
                };
                if let Some(fragment_type) = fragment_type {
                    find_fields_and_fragments(ctx, &inline.selection_set, fragment_type, out);
                }
            }
            Selection::FragmentSpread(spread) => out.fragment_names.push(spread.name.value),
        }
    }
}

/// Canonical argument form: `{name: literal}` sorted by name.
fn serialize_arguments(ctx: &ValidationContext<'_>, field: &FieldSelection) -> String {
    let arguments: BTreeMap<String, String> = field
        .arguments
        .iter()
        .map(|arg| {
            (
                ctx.name(arg.name.value).to_string(),
                print_value(&arg.value, ctx.interner()),
            )
        })
        .collect();
    let pairs: Vec<String> = arguments
        .iter()
        .map(|(name, value)| format!("{name}: {value}"))
        .collect();
    format!("{{{}}}", pairs.join(", "))
}

impl<'a> Rule<'a> for FieldsWillMerge<'a> {
    fn name(&self) -> &'static str {
        "FieldsWillMerge"
    }

    fn enter_operation(&mut self, ctx: &mut ValidationContext<'a>, operation: &'a OperationDefinition) {
        if let Some(root) = ctx.current_type() {
            self.conflicts_within_selection_set(ctx, &operation.selection_set, root);
        }
    }

    fn enter_fragment_definition(
        &mut self,
        ctx: &mut ValidationContext<'a>,
        fragment: &'a FragmentDefinition,
    ) {
        if let Some(ty) = ctx.current_type() {
            self.conflicts_within_selection_set(ctx, &fragment.selection_set, ty);
        }
    }

    fn enter_field(&mut self, ctx: &mut ValidationContext<'a>, field: &'a FieldSelection) {
        if let (Some(selection_set), Some(ty)) = (&field.selection_set, ctx.current_type()) {
            self.conflicts_within_selection_set(ctx, selection_set, ty);
        }
    }

    fn leave_document(&mut self, _ctx: &mut ValidationContext<'a>) {
        tracing::debug!(
            fragment_pairs = self.fragment_pairs_compared,
            selection_sets = self.fields_and_fragments.len(),
            "field merge check finished"
        );
    }
}
