//! The rule trait and the document traversal that drives it.
//!
//! A run walks the document once. Every participant is notified of each node
//! in participant order, with the context's type scope already updated for
//! that node.

use crate::context::ValidationContext;
use crate::error::ValidateError;
use crate::ir::IrDocument;
use boxql_syntax::{
    Definition, Directive, DirectiveLocation, FieldSelection, FragmentDefinition, FragmentSpread,
    InlineFragment, OperationDefinition, OperationType, Selection, SelectionSet,
};

/// A validation rule reacting to traversal events.
///
/// Rules keep whatever private state they need. A fresh instance is created
/// for every validation run.
#[allow(unused_variables)]
pub trait Rule<'a> {
    /// The rule's name, used in logs.
    fn name(&self) -> &'static str;

    fn enter_operation(&mut self, ctx: &mut ValidationContext<'a>, operation: &'a OperationDefinition) {}

    fn leave_operation(&mut self, ctx: &mut ValidationContext<'a>, operation: &'a OperationDefinition) {}

    fn enter_fragment_definition(
        &mut self,
        ctx: &mut ValidationContext<'a>,
        fragment: &'a FragmentDefinition,
    ) {
    }

    fn leave_fragment_definition(
        &mut self,
        ctx: &mut ValidationContext<'a>,
        fragment: &'a FragmentDefinition,
    ) {
    }

    /// Called with the field's return type as the current type.
    fn enter_field(&mut self, ctx: &mut ValidationContext<'a>, field: &'a FieldSelection) {}

    fn leave_field(&mut self, ctx: &mut ValidationContext<'a>, field: &'a FieldSelection) {}

    fn enter_fragment_spread(&mut self, ctx: &mut ValidationContext<'a>, spread: &'a FragmentSpread) {}

    /// Called with the fragment's type condition as the current type.
    fn enter_inline_fragment(&mut self, ctx: &mut ValidationContext<'a>, inline: &'a InlineFragment) {}

    fn leave_inline_fragment(&mut self, ctx: &mut ValidationContext<'a>, inline: &'a InlineFragment) {}

    fn enter_directive(
        &mut self,
        ctx: &mut ValidationContext<'a>,
        directive: &'a Directive,
        location: DirectiveLocation,
    ) {
    }

    /// Called once after every definition has been visited.
    fn leave_document(&mut self, ctx: &mut ValidationContext<'a>) {}

    /// Called with the rewritten document after the traversal.
    fn check_ir(&mut self, ctx: &mut ValidationContext<'a>, ir: &IrDocument) {}
}

/// Walks `ctx.document()`, notifying every participant.
pub(crate) fn walk_document<'a>(
    ctx: &mut ValidationContext<'a>,
    participants: &mut [&mut dyn Rule<'a>],
) -> Result<(), ValidateError> {
    let document = ctx.document();
    for definition in &document.definitions {
        match definition {
            Definition::Operation(operation) => walk_operation(ctx, participants, operation)?,
            Definition::Fragment(fragment) => walk_fragment(ctx, participants, fragment)?,
            Definition::Schema(_) | Definition::Type(_) | Definition::Directive(_) => {}
        }
    }
    for rule in participants.iter_mut() {
        rule.leave_document(ctx);
    }
    Ok(())
}

fn walk_operation<'a>(
    ctx: &mut ValidationContext<'a>,
    participants: &mut [&mut dyn Rule<'a>],
    operation: &'a OperationDefinition,
) -> Result<(), ValidateError> {
    ctx.visit_node()?;
    let root = ctx
        .schema()
        .root_type_name(operation.operation)
        .and_then(|name| ctx.schema().get_type(name));
    ctx.set_operation(Some(operation));
    ctx.push_type(root);

    for rule in participants.iter_mut() {
        rule.enter_operation(ctx, operation);
    }
    let location = match operation.operation {
        OperationType::Query => DirectiveLocation::Query,
        OperationType::Mutation => DirectiveLocation::Mutation,
        OperationType::Subscription => DirectiveLocation::Subscription,
    };
    walk_directives(ctx, participants, &operation.directives, location);
    for variable in &operation.variables {
        walk_directives(
            ctx,
            participants,
            &variable.directives,
            DirectiveLocation::VariableDefinition,
        );
    }
    walk_selection_set(ctx, participants, &operation.selection_set)?;
    for rule in participants.iter_mut() {
        rule.leave_operation(ctx, operation);
    }

    ctx.pop_type();
    ctx.set_operation(None);
    Ok(())
}

fn walk_fragment<'a>(
    ctx: &mut ValidationContext<'a>,
    participants: &mut [&mut dyn Rule<'a>],
    fragment: &'a FragmentDefinition,
) -> Result<(), ValidateError> {
    ctx.visit_node()?;
    let ty = ctx.type_named(fragment.type_condition.value);
    ctx.push_type(ty);

    for rule in participants.iter_mut() {
        rule.enter_fragment_definition(ctx, fragment);
    }
    walk_directives(
        ctx,
        participants,
        &fragment.directives,
        DirectiveLocation::FragmentDefinition,
    );
    walk_selection_set(ctx, participants, &fragment.selection_set)?;
    for rule in participants.iter_mut() {
        rule.leave_fragment_definition(ctx, fragment);
    }

    ctx.pop_type();
    Ok(())
}

fn walk_selection_set<'a>(
    ctx: &mut ValidationContext<'a>,
    participants: &mut [&mut dyn Rule<'a>],
    selection_set: &'a SelectionSet,
) -> Result<(), ValidateError> {
    for selection in &selection_set.selections {
        ctx.visit_node()?;
        match selection {
            Selection::Field(field) => walk_field(ctx, participants, field)?,
            Selection::FragmentSpread(spread) => {
                for rule in participants.iter_mut() {
                    rule.enter_fragment_spread(ctx, spread);
                }
                walk_directives(
                    ctx,
                    participants,
                    &spread.directives,
                    DirectiveLocation::FragmentSpread,
                );
            }
            Selection::InlineFragment(inline) => {
                let ty = match inline.type_condition {
                    Some(name) => ctx.type_named(name.value),
                    None => ctx.current_type(),
                };
                ctx.push_type(ty);
                for rule in participants.iter_mut() {
                    rule.enter_inline_fragment(ctx, inline);
                }
                walk_directives(
                    ctx,
                    participants,
                    &inline.directives,
                    DirectiveLocation::InlineFragment,
                );
                walk_selection_set(ctx, participants, &inline.selection_set)?;
                for rule in participants.iter_mut() {
                    rule.leave_inline_fragment(ctx, inline);
                }
                ctx.pop_type();
            }
        }
    }
    Ok(())
}

fn walk_field<'a>(
    ctx: &mut ValidationContext<'a>,
    participants: &mut [&mut dyn Rule<'a>],
    field: &'a FieldSelection,
) -> Result<(), ValidateError> {
    let schema = ctx.schema();
    let definition = ctx
        .current_type()
        .and_then(|parent| schema.get_field(parent.name(), &ctx.name(field.name.value)));
    let return_type = definition.and_then(|def| schema.get_type(def.ty.inner_name()));
    ctx.push_field(definition);
    ctx.push_type(return_type);

    for rule in participants.iter_mut() {
        rule.enter_field(ctx, field);
    }
    walk_directives(ctx, participants, &field.directives, DirectiveLocation::Field);
    if let Some(selection_set) = &field.selection_set {
        walk_selection_set(ctx, participants, selection_set)?;
    }
    for rule in participants.iter_mut() {
        rule.leave_field(ctx, field);
    }

    ctx.pop_type();
    ctx.pop_field();
    Ok(())
}

fn walk_directives<'a>(
    ctx: &mut ValidationContext<'a>,
    participants: &mut [&mut dyn Rule<'a>],
    directives: &'a [Directive],
    location: DirectiveLocation,
) {
    for directive in directives {
        for rule in participants.iter_mut() {
            rule.enter_directive(ctx, directive, location);
        }
    }
}
