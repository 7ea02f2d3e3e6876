//! Rewrites executable definitions into the internal representation.
//!
//! The rewrite takes part in every validation run, including runs with no
//! rules attached, so the executor always has a tree to work from.

use crate::context::ValidationContext;
use crate::ir::*;
use crate::visitor::Rule;
use boxql_core::{LineIndex, Span, Text};
use boxql_schema::{FieldDef, TypeDef, TypeRef};
use boxql_syntax::{
    ast, Directive, FieldSelection, FragmentDefinition, OperationDefinition, Selection,
    SelectionSet,
};
use indexmap::IndexMap;

/// Builds an [`IrDocument`] while the document is traversed.
pub struct Rewrite<'l> {
    document: IrDocument,
    line_index: Option<&'l LineIndex>,
}

/// One occurrence of a field in a merged selection.
struct Appearance<'a> {
    field: &'a FieldSelection,
    conditions: Vec<IrCondition>,
    /// Fragments entered on the way to this occurrence.
    fragments: Vec<Text>,
}

struct PendingField<'a> {
    definition: &'a FieldDef,
    appearances: Vec<Appearance<'a>>,
}

type Pending<'a> = IndexMap<Text, PendingField<'a>>;

impl<'l> Rewrite<'l> {
    pub fn new(line_index: Option<&'l LineIndex>) -> Self {
        Self {
            document: IrDocument::default(),
            line_index,
        }
    }

    pub fn finish(self) -> IrDocument {
        self.document
    }

    fn selection_children<'a>(
        &self,
        ctx: &ValidationContext<'a>,
        selection_set: &'a SelectionSet,
        object: &'a TypeDef,
        fragments: &[Text],
    ) -> IrChildren {
        let mut pending = Pending::new();
        let mut stack = fragments.to_vec();
        collect_fields(ctx, selection_set, object, &[], &mut stack, &mut pending);
        self.build_children(ctx, object, pending)
    }

    fn build_children<'a>(
        &self,
        ctx: &ValidationContext<'a>,
        object: &'a TypeDef,
        pending: Pending<'a>,
    ) -> IrChildren {
        pending
            .into_iter()
            .filter_map(|(key, field)| {
                let node = self.build_node(ctx, object, key, field)?;
                Some((node.response_key.clone(), node))
            })
            .collect()
    }

    fn build_node<'a>(
        &self,
        ctx: &ValidationContext<'a>,
        object: &'a TypeDef,
        key: Text,
        field: PendingField<'a>,
    ) -> Option<IrNode> {
        let schema = ctx.schema();
        let first = field.appearances.first()?.field;

        let mut typed_children = IndexMap::new();
        let return_type = schema
            .get_type(field.definition.ty.inner_name())
            .filter(|ty| ty.is_composite());
        if let Some(return_type) = return_type {
            for possible in schema.possible_types(return_type.name()) {
                let Some(concrete) = schema.get_type(possible) else {
                    continue;
                };
                let mut pending = Pending::new();
                for appearance in &field.appearances {
                    if let Some(selection_set) = &appearance.field.selection_set {
                        let mut stack = appearance.fragments.clone();
                        collect_fields(
                            ctx,
                            selection_set,
                            concrete,
                            &appearance.conditions,
                            &mut stack,
                            &mut pending,
                        );
                    }
                }
                typed_children.insert(possible.clone(), self.build_children(ctx, concrete, pending));
            }
        }

        let spans: Vec<Span> = field.appearances.iter().map(|a| a.field.span).collect();
        Some(IrNode {
            response_key: ctx.name(key).to_string(),
            name: field.definition.name.clone(),
            owner_type: object.name().to_string(),
            return_type: field.definition.ty.clone(),
            arguments: first
                .arguments
                .iter()
                .map(|arg| (ctx.name(arg.name.value).to_string(), ir_value(ctx, &arg.value)))
                .collect(),
            locations: self
                .line_index
                .map(|index| spans.iter().map(|span| index.span_start(*span)).collect())
                .unwrap_or_default(),
            spans,
            conditions: field.appearances.into_iter().map(|a| a.conditions).collect(),
            typed_children,
        })
    }

    fn operation<'a>(
        &self,
        ctx: &ValidationContext<'a>,
        operation: &'a OperationDefinition,
    ) -> Option<IrOperation> {
        let root = ctx.current_type().filter(|ty| ty.is_object())?;
        let variables = operation
            .variables
            .iter()
            .map(|variable| IrVariable {
                name: ctx.name(variable.name.value).to_string(),
                ty: type_ref(ctx, &variable.ty),
                default_value: variable
                    .default_value
                    .as_ref()
                    .map(|value| ir_value(ctx, value).resolve(&Variables::new())),
            })
            .collect();

        Some(IrOperation {
            name: operation.name.map(|name| ctx.name(name.value).to_string()),
            kind: operation.operation,
            root_type: root.name().to_string(),
            variables,
            children: self.selection_children(ctx, &operation.selection_set, root, &[]),
            span: operation.span,
        })
    }

    fn fragment<'a>(
        &self,
        ctx: &ValidationContext<'a>,
        fragment: &'a FragmentDefinition,
    ) -> Option<IrFragment> {
        let condition = ctx.current_type().filter(|ty| ty.is_composite())?;
        let schema = ctx.schema();
        let typed_children = schema
            .possible_types(condition.name())
            .iter()
            .filter_map(|possible| {
                let concrete = schema.get_type(possible)?;
                let children =
                    self.selection_children(ctx, &fragment.selection_set, concrete, &[fragment.name.value]);
                Some((possible.clone(), children))
            })
            .collect();

        Some(IrFragment {
            name: ctx.name(fragment.name.value).to_string(),
            type_condition: condition.name().to_string(),
            typed_children,
        })
    }
}

impl<'a> Rule<'a> for Rewrite<'_> {
    fn name(&self) -> &'static str {
        "Rewrite"
    }

    fn enter_operation(&mut self, ctx: &mut ValidationContext<'a>, operation: &'a OperationDefinition) {
        if let Some(ir) = self.operation(ctx, operation) {
            let key = ir.name.clone().unwrap_or_default();
            self.document.operations.entry(key).or_insert(ir);
        }
    }

    fn enter_fragment_definition(
        &mut self,
        ctx: &mut ValidationContext<'a>,
        fragment: &'a FragmentDefinition,
    ) {
        if let Some(ir) = self.fragment(ctx, fragment) {
            self.document.fragments.entry(ir.name.clone()).or_insert(ir);
        }
    }
}

/// Gathers the fields of `selection_set` that apply to `object`, following
/// inline fragments and fragment spreads.
fn collect_fields<'a>(
    ctx: &ValidationContext<'a>,
    selection_set: &'a SelectionSet,
    object: &'a TypeDef,
    inherited: &[IrCondition],
    fragments: &mut Vec<Text>,
    out: &mut Pending<'a>,
) {
    let schema = ctx.schema();
    for selection in &selection_set.selections {
        let mut conditions = inherited.to_vec();
        conditions.extend(selection.directives().iter().filter_map(|d| condition(ctx, d)));

        match selection {
            Selection::Field(field) => {
                let Some(definition) = schema.get_field(object.name(), &ctx.name(field.name.value))
                else {
                    continue;
                };
                out.entry(field.response_key())
                    .or_insert_with(|| PendingField {
                        definition,
                        appearances: Vec::new(),
                    })
                    .appearances
                    .push(Appearance {
                        field,
                        conditions,
                        fragments: fragments.clone(),
                    });
            }
            Selection::InlineFragment(inline) => {
                if applies(ctx, inline.type_condition.map(|n| n.value), object) {
                    collect_fields(ctx, &inline.selection_set, object, &conditions, fragments, out);
                }
            }
            Selection::FragmentSpread(spread) => {
                let name = spread.name.value;
                let Some(fragment) = ctx.fragment(name) else {
                    continue;
                };
                if fragments.contains(&name)
                    || !applies(ctx, Some(fragment.type_condition.value), object)
                {
                    continue;
                }
                fragments.push(name);
                collect_fields(ctx, &fragment.selection_set, object, &conditions, fragments, out);
                fragments.pop();
            }
        }
    }
}

/// A fragment applies to a concrete type if it is untyped, names that type,
/// or names an abstract type containing it.
fn applies(ctx: &ValidationContext<'_>, type_condition: Option<Text>, object: &TypeDef) -> bool {
    let Some(name) = type_condition else {
        return true;
    };
    match ctx.type_named(name) {
        Some(ty) if ty.name() == object.name() => true,
        Some(ty) if ty.is_abstract() => ctx.schema().is_possible_type(ty.name(), object.name()),
        _ => false,
    }
}

fn condition(ctx: &ValidationContext<'_>, directive: &Directive) -> Option<IrCondition> {
    let kind = match &*ctx.name(directive.name.value) {
        "skip" => ConditionKind::Skip,
        "include" => ConditionKind::Include,
        _ => return None,
    };
    let argument = directive
        .arguments
        .iter()
        .find(|arg| &*ctx.name(arg.name.value) == "if")?;
    Some(IrCondition {
        kind,
        value: ir_value(ctx, &argument.value),
    })
}

pub(crate) fn ir_value(ctx: &ValidationContext<'_>, value: &ast::Value) -> IrValue {
    match value {
        ast::Value::Variable(name) => IrValue::Variable(ctx.name(name.value).to_string()),
        ast::Value::Int(n, _) => IrValue::Int(*n),
        ast::Value::Float(n, _) => IrValue::Float(*n),
        ast::Value::String(s, _) => IrValue::String(s.clone()),
        ast::Value::Boolean(b, _) => IrValue::Boolean(*b),
        ast::Value::Null(_) => IrValue::Null,
        ast::Value::Enum(name) => IrValue::Enum(ctx.name(name.value).to_string()),
        ast::Value::List(items, _) => {
            IrValue::List(items.iter().map(|item| ir_value(ctx, item)).collect())
        }
        ast::Value::Object(fields, _) => IrValue::Object(
            fields
                .iter()
                .map(|(name, value)| (ctx.name(name.value).to_string(), ir_value(ctx, value)))
                .collect(),
        ),
    }
}

fn type_ref(ctx: &ValidationContext<'_>, ty: &ast::Type) -> TypeRef {
    match ty {
        ast::Type::Named(named) => TypeRef::Named(ctx.name(named.name).to_string()),
        ast::Type::List(inner, _) => TypeRef::list(type_ref(ctx, inner)),
        ast::Type::NonNull(inner, _) => TypeRef::non_null(type_ref(ctx, inner)),
    }
}
