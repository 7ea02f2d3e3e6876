//! Query execution for boxql.
//!
//! Execution walks the rewritten document. A field whose value is lazy is
//! parked in a queue instead of being forced on the spot; once everything
//! reachable without forcing has been resolved, the queued values are forced
//! together and completed in queue order, which may queue the next round.
//! Sibling lazy values therefore overlap while they are awaited.
//!
//! Mutation root fields are the exception: each one is resolved and fully
//! settled before the next one starts.

use crate::config::ExecutorConfig;
use crate::context::Context;
use crate::error::{ExecutionError, ResolverError};
use crate::input::coerce_arguments;
use crate::lazy::LazyRegistry;
use crate::resolver::{ResolverInfo, ResolverMap};
use crate::response::{FieldError, PathSegment, Response};
use crate::value::FieldValue;
use futures::future::join_all;
use boxql_schema::schema::TYPENAME_FIELD;
use boxql_schema::{OperationType, Schema, TypeDef, TypeRef};
use boxql_validation::{IrChildren, IrDocument, IrNode, IrOperation, Variables};
use indexmap::IndexMap;
use serde_json::Value as Json;
use std::collections::VecDeque;

/// The query executor.
pub struct Executor<'s> {
    schema: &'s Schema,
    resolvers: ResolverMap,
    lazy: LazyRegistry,
    config: ExecutorConfig,
}

impl std::fmt::Debug for Executor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("config", &self.config)
            .field("resolvers", &self.resolvers)
            .field("lazy", &self.lazy)
            .finish()
    }
}

impl<'s> Executor<'s> {
    /// Creates an executor with default resolvers.
    pub fn new(schema: &'s Schema) -> Self {
        Self {
            schema,
            resolvers: ResolverMap::new(),
            lazy: LazyRegistry::new(),
            config: ExecutorConfig::default(),
        }
    }

    #[must_use]
    pub fn with_resolvers(mut self, resolvers: ResolverMap) -> Self {
        self.resolvers = resolvers;
        self
    }

    #[must_use]
    pub fn with_lazy_registry(mut self, lazy: LazyRegistry) -> Self {
        self.lazy = lazy;
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn schema(&self) -> &Schema {
        self.schema
    }

    pub fn resolvers(&self) -> &ResolverMap {
        &self.resolvers
    }

    /// Registers further resolvers on an executor already built.
    pub fn resolvers_mut(&mut self) -> &mut ResolverMap {
        &mut self.resolvers
    }

    pub fn lazy_registry(&self) -> &LazyRegistry {
        &self.lazy
    }

    /// Registers further host types on an executor already built.
    pub fn lazy_registry_mut(&mut self) -> &mut LazyRegistry {
        &mut self.lazy
    }

    /// Executes one operation of a validated document.
    ///
    /// `variables` override the operation's declared defaults. Operation
    /// level failures produce a response without data.
    pub async fn execute(
        &self,
        ir: &IrDocument,
        operation_name: Option<&str>,
        variables: Variables,
        root_value: impl Into<FieldValue>,
        ctx: &Context,
    ) -> Response {
        let (operation, variables) = match self.prepare(ir, operation_name, variables) {
            Ok(prepared) => prepared,
            Err(error) => return Response::error(error.into()),
        };
        tracing::debug!(
            operation = operation.name.as_deref().unwrap_or("<anonymous>"),
            kind = %operation.kind,
            "execution started"
        );

        let mut run = Run {
            schema: self.schema,
            resolvers: &self.resolvers,
            lazy: &self.lazy,
            max_lazy_depth: self.config.max_lazy_depth,
            ctx,
            variables: &variables,
            slots: vec![Slot {
                parent: None,
                nullable: true,
                value: SlotValue::Object(IndexMap::new()),
            }],
            errors: Vec::new(),
            queue: VecDeque::new(),
        };
        let root_value = root_value.into();

        if operation.kind == OperationType::Mutation {
            for node in operation.children.values() {
                if run.is_dead(ROOT) {
                    break;
                }
                if !node.is_included(&variables) {
                    continue;
                }
                run.execute_field(ROOT, node, &root_value, &[]);
                run.settle().await;
                tracing::debug!(field = %node.response_key, "mutation field settled");
            }
        } else {
            run.execute_fields(ROOT, &operation.children, &root_value, &[]);
            run.settle().await;
        }

        tracing::debug!(errors = run.errors.len(), "execution finished");
        Response::new(run.render(ROOT), run.errors)
    }

    fn prepare<'i>(
        &self,
        ir: &'i IrDocument,
        operation_name: Option<&str>,
        variables: Variables,
    ) -> Result<(&'i IrOperation, Variables), ExecutionError> {
        let operation = match (ir.operation(operation_name), operation_name) {
            (Some(operation), _) => operation,
            (None, Some(name)) => return Err(ExecutionError::UnknownOperation(name.to_string())),
            (None, None) if ir.operations.is_empty() => return Err(ExecutionError::NoOperation),
            (None, None) => return Err(ExecutionError::OperationNameRequired),
        };
        if !matches!(self.schema.get_type(&operation.root_type), Some(TypeDef::Object(_))) {
            return Err(ExecutionError::MissingRootType(operation.kind.to_string()));
        }

        let mut all = operation.default_variables();
        all.extend(variables);

        if let Some(limit) = self.config.max_depth {
            let depth = operation.depth(&all);
            if depth > limit {
                return Err(ExecutionError::DepthLimitExceeded { depth, limit });
            }
        }
        Ok((operation, all))
    }
}

const ROOT: usize = 0;

/// One position in the response tree.
struct Slot {
    parent: Option<usize>,
    /// False if a null here must propagate to the parent.
    nullable: bool,
    value: SlotValue,
}

enum SlotValue {
    /// Waiting for a lazy value.
    Unset,
    Null,
    Leaf(Json),
    List(Vec<usize>),
    Object(IndexMap<String, usize>),
}

/// A lazy field value waiting to be forced.
struct Task<'r> {
    slot: usize,
    node: &'r IrNode,
    ty: &'r TypeRef,
    value: FieldValue,
    path: Vec<PathSegment>,
}

/// State of one execution.
struct Run<'r> {
    schema: &'r Schema,
    resolvers: &'r ResolverMap,
    lazy: &'r LazyRegistry,
    max_lazy_depth: usize,
    ctx: &'r Context,
    variables: &'r Variables,
    slots: Vec<Slot>,
    errors: Vec<FieldError>,
    queue: VecDeque<Task<'r>>,
}

impl<'r> Run<'r> {
    fn alloc(&mut self, parent: usize, nullable: bool) -> usize {
        self.slots.push(Slot {
            parent: Some(parent),
            nullable,
            value: SlotValue::Unset,
        });
        self.slots.len() - 1
    }

    fn set(&mut self, slot: usize, value: SlotValue) {
        self.slots[slot].value = value;
    }

    /// Forces queued lazy values round by round until none are left.
    async fn settle(&mut self) {
        let lazy = self.lazy;
        let max_steps = self.max_lazy_depth;
        while !self.queue.is_empty() {
            let mut round: Vec<Task<'r>> = self.queue.drain(..).collect();
            round.retain(|task| !self.is_dead(task.slot));
            tracing::trace!(size = round.len(), "forcing lazy values");

            let (values, heads): (Vec<_>, Vec<_>) = round
                .into_iter()
                .map(|task| (task.value, (task.slot, task.node, task.ty, task.path)))
                .unzip();
            let forced =
                join_all(values.into_iter().map(|value| lazy.force(value, max_steps))).await;

            for ((slot, node, ty, path), result) in heads.into_iter().zip(forced) {
                if self.is_dead(slot) {
                    continue;
                }
                match result {
                    Ok(value) => self.complete(slot, node, ty, value, path),
                    Err(error) => self.field_error(slot, node, path, error),
                }
            }
        }
    }

    /// True if the slot sits below a null.
    fn is_dead(&self, slot: usize) -> bool {
        let mut current = Some(slot);
        while let Some(index) = current {
            if matches!(self.slots[index].value, SlotValue::Null) {
                return true;
            }
            current = self.slots[index].parent;
        }
        false
    }

    fn execute_fields(
        &mut self,
        object_slot: usize,
        children: &'r IrChildren,
        parent: &FieldValue,
        path: &[PathSegment],
    ) {
        for node in children.values() {
            if matches!(self.slots[object_slot].value, SlotValue::Null) {
                break;
            }
            if node.is_included(self.variables) {
                self.execute_field(object_slot, node, parent, path);
            }
        }
    }

    fn execute_field(
        &mut self,
        object_slot: usize,
        node: &'r IrNode,
        parent: &FieldValue,
        path: &[PathSegment],
    ) {
        let slot = self.alloc(object_slot, !node.return_type.is_non_null());
        if let SlotValue::Object(fields) = &mut self.slots[object_slot].value {
            fields.insert(node.response_key.clone(), slot);
        }
        let mut field_path = path.to_vec();
        field_path.push(PathSegment::Field(node.response_key.clone()));

        match self.resolve(node, parent, &field_path) {
            Ok(value) => self.complete(slot, node, &node.return_type, value, field_path),
            Err(error) => self.field_error(slot, node, field_path, error),
        }
    }

    fn resolve(
        &self,
        node: &IrNode,
        parent: &FieldValue,
        path: &[PathSegment],
    ) -> Result<FieldValue, ExecutionError> {
        let owner = node.owner_type.as_str();
        if node.name == TYPENAME_FIELD {
            return Ok(FieldValue::from(owner));
        }
        let not_found = || ResolverError::FieldNotFound(format!("{owner}.{}", node.name));
        let definition = self.schema.get_field(owner, &node.name).ok_or_else(not_found)?;
        let resolver = self.resolvers.get(owner, &node.name).ok_or_else(not_found)?;
        let args = coerce_arguments(self.schema, definition, &node.arguments, self.variables)?;
        let info = ResolverInfo::new(&node.name, owner)
            .with_return_type(node.return_type.to_string())
            .with_path(path.to_vec())
            .with_selected_fields(selected_fields(node));
        Ok(resolver.resolve(parent, &args, self.ctx, &info)?)
    }

    /// Places a resolved value into `slot`, checking it against `ty`.
    fn complete(
        &mut self,
        slot: usize,
        node: &'r IrNode,
        ty: &'r TypeRef,
        value: FieldValue,
        path: Vec<PathSegment>,
    ) {
        if self.lazy.is_lazy(&value) {
            self.queue.push_back(Task {
                slot,
                node,
                ty,
                value,
                path,
            });
            return;
        }
        if value.is_null() {
            if ty.is_non_null() {
                let error = ExecutionError::NonNullViolation {
                    owner: node.owner_type.clone(),
                    field: node.name.clone(),
                };
                self.field_error(slot, node, path, error);
            } else {
                self.set(slot, SlotValue::Null);
            }
            return;
        }

        match ty.nullable() {
            TypeRef::NonNull(inner) => self.complete(slot, node, inner, value, path),
            TypeRef::List(item) => self.complete_list(slot, node, ty, item, value, path),
            TypeRef::Named(name) => match self.schema.get_type(name) {
                Some(def) if def.is_leaf() => match value {
                    FieldValue::Json(json) => self.set(slot, SlotValue::Leaf(json)),
                    _ => self.invalid_value(slot, node, ty, path),
                },
                Some(def) if def.is_composite() => {
                    let Some(object_type) = self.object_type(def, &value) else {
                        let error = ExecutionError::UnresolvedAbstractType {
                            abstract_type: name.clone(),
                            owner: node.owner_type.clone(),
                            field: node.name.clone(),
                        };
                        self.field_error(slot, node, path, error);
                        return;
                    };
                    self.set(slot, SlotValue::Object(IndexMap::new()));
                    if let Some(children) = node.children_for(&object_type) {
                        self.execute_fields(slot, children, &value, &path);
                    }
                }
                _ => self.invalid_value(slot, node, ty, path),
            },
        }
    }

    fn complete_list(
        &mut self,
        slot: usize,
        node: &'r IrNode,
        ty: &'r TypeRef,
        item: &'r TypeRef,
        value: FieldValue,
        path: Vec<PathSegment>,
    ) {
        let items: Vec<FieldValue> = match value {
            FieldValue::List(items) => items,
            FieldValue::Json(Json::Array(items)) => items.into_iter().map(FieldValue::from).collect(),
            _ => return self.invalid_value(slot, node, ty, path),
        };
        let item_slots: Vec<usize> = items
            .iter()
            .map(|_| self.alloc(slot, !item.is_non_null()))
            .collect();
        self.set(slot, SlotValue::List(item_slots.clone()));

        for (index, (item_slot, item_value)) in item_slots.into_iter().zip(items).enumerate() {
            if self.is_dead(slot) {
                break;
            }
            let mut item_path = path.clone();
            item_path.push(PathSegment::Index(index));
            self.complete(item_slot, node, item, item_value, item_path);
        }
    }

    /// The concrete object type for a value of composite type `def`.
    fn object_type(&self, def: &TypeDef, value: &FieldValue) -> Option<String> {
        if def.is_object() {
            return Some(def.name().to_string());
        }
        let possible = self.schema.possible_types(def.name());
        match self.resolvers.resolve_type(def.name(), value, self.ctx) {
            Some(name) => possible.contains(&name).then_some(name),
            None if possible.len() == 1 => possible.first().cloned(),
            None => None,
        }
    }

    fn invalid_value(&mut self, slot: usize, node: &IrNode, ty: &TypeRef, path: Vec<PathSegment>) {
        let error = ExecutionError::InvalidValue {
            owner: node.owner_type.clone(),
            field: node.name.clone(),
            ty: ty.to_string(),
        };
        self.field_error(slot, node, path, error);
    }

    /// Records an error and nulls `slot`, propagating through non-null
    /// parents.
    fn field_error(
        &mut self,
        slot: usize,
        node: &IrNode,
        path: Vec<PathSegment>,
        error: impl Into<FieldError>,
    ) {
        let error = error
            .into()
            .with_path(path)
            .with_locations(node.locations.clone());
        tracing::debug!(message = %error.message, "field error");
        self.errors.push(error);

        let mut current = slot;
        loop {
            self.slots[current].value = SlotValue::Null;
            if self.slots[current].nullable {
                break;
            }
            match self.slots[current].parent {
                Some(parent) => current = parent,
                None => break,
            }
        }
    }

    fn render(&self, slot: usize) -> Json {
        match &self.slots[slot].value {
            SlotValue::Unset | SlotValue::Null => Json::Null,
            SlotValue::Leaf(json) => json.clone(),
            SlotValue::List(items) => Json::Array(items.iter().map(|&item| self.render(item)).collect()),
            SlotValue::Object(fields) => Json::Object(
                fields
                    .iter()
                    .map(|(key, &field)| (key.clone(), self.render(field)))
                    .collect(),
            ),
        }
    }
}

/// Response keys selected below `node`, across all object types.
fn selected_fields(node: &IrNode) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for children in node.typed_children.values() {
        for key in children.keys() {
            if !keys.contains(key) {
                keys.push(key.clone());
            }
        }
    }
    keys
}
