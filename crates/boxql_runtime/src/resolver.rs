//! Resolver system for boxql.
//!
//! Resolvers are synchronous: anything that needs to wait returns a lazy
//! [`FieldValue`] and the executor forces it later.

use crate::context::Context;
use crate::error::ResolverError;
use crate::response::PathSegment;
use crate::value::{BoxFuture, FieldResult, FieldValue, Pending};
use serde_json::Value as Json;
use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;

/// Arguments passed to a resolver, already coerced to their declared types.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolverArgs {
    args: HashMap<String, Json>,
}

impl ResolverArgs {
    /// Creates new resolver args.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates resolver args from a list of (name, value) pairs.
    pub fn from_pairs(pairs: Vec<(String, Json)>) -> Self {
        Self {
            args: pairs.into_iter().collect(),
        }
    }

    /// Gets an argument by name.
    pub fn get(&self, name: &str) -> Option<&Json> {
        self.args.get(name)
    }

    /// Gets an argument as a specific type.
    pub fn get_as<T: serde::de::DeserializeOwned>(&self, name: &str) -> Option<T> {
        self.args
            .get(name)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Gets a required argument, returning an error if not found.
    pub fn require<T: serde::de::DeserializeOwned>(&self, name: &str) -> Result<T, ResolverError> {
        self.args
            .get(name)
            .ok_or_else(|| ResolverError::MissingArgument(name.to_string()))
            .and_then(|v| {
                serde_json::from_value(v.clone())
                    .map_err(|e| ResolverError::ArgumentParseError(name.to_string(), e.to_string()))
            })
    }

    /// Returns all arguments.
    pub fn all(&self) -> &HashMap<String, Json> {
        &self.args
    }

    /// Returns true if no arguments were passed.
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Sets an argument value.
    pub fn set(&mut self, name: impl Into<String>, value: Json) {
        self.args.insert(name.into(), value);
    }
}

/// Info about the field being resolved.
#[derive(Debug, Clone)]
pub struct ResolverInfo {
    /// The field name being resolved.
    pub field_name: String,

    /// The declared return type, e.g. `[Dog!]`.
    pub return_type: String,

    /// The object type the field is resolved on.
    pub parent_type: String,

    /// Path to this field.
    pub path: Vec<PathSegment>,

    /// Response keys selected below this field.
    pub selected_fields: Vec<String>,
}

impl ResolverInfo {
    /// Creates new resolver info.
    pub fn new(field_name: impl Into<String>, parent_type: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            return_type: String::new(),
            parent_type: parent_type.into(),
            path: Vec::new(),
            selected_fields: Vec::new(),
        }
    }

    /// Sets the return type.
    pub fn with_return_type(mut self, ty: impl Into<String>) -> Self {
        self.return_type = ty.into();
        self
    }

    /// Sets the path.
    pub fn with_path(mut self, path: Vec<PathSegment>) -> Self {
        self.path = path;
        self
    }

    /// Sets the selected fields.
    pub fn with_selected_fields(mut self, fields: Vec<String>) -> Self {
        self.selected_fields = fields;
        self
    }
}

/// Trait for field resolvers.
pub trait Resolver: Send + Sync {
    fn resolve(
        &self,
        parent: &FieldValue,
        args: &ResolverArgs,
        ctx: &Context,
        info: &ResolverInfo,
    ) -> FieldResult;
}

/// A boxed resolver.
pub type BoxedResolver = Box<dyn Resolver>;

/// A sync resolver function.
pub type SyncResolverFn =
    Arc<dyn Fn(&FieldValue, &ResolverArgs, &Context, &ResolverInfo) -> FieldResult + Send + Sync>;

/// A wrapper for sync resolver functions.
pub struct FnResolver {
    func: SyncResolverFn,
}

impl FnResolver {
    /// Creates a new function resolver.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&FieldValue, &ResolverArgs, &Context, &ResolverInfo) -> FieldResult
            + Send
            + Sync
            + 'static,
    {
        Self { func: Arc::new(f) }
    }
}

impl Resolver for FnResolver {
    fn resolve(
        &self,
        parent: &FieldValue,
        args: &ResolverArgs,
        ctx: &Context,
        info: &ResolverInfo,
    ) -> FieldResult {
        (self.func)(parent, args, ctx, info)
    }
}

type AsyncResolverFn = Arc<
    dyn Fn(FieldValue, ResolverArgs, Context, ResolverInfo) -> BoxFuture<FieldResult>
        + Send
        + Sync,
>;

/// A wrapper for async resolver functions.
///
/// The future is spawned as soon as the field is resolved, so sibling fields
/// run concurrently while the executor is still walking the query. Outside a
/// tokio runtime it runs when forced instead.
pub struct AsyncFnResolver {
    func: AsyncResolverFn,
}

impl AsyncFnResolver {
    /// Creates a new async function resolver.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(FieldValue, ResolverArgs, Context, ResolverInfo) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FieldResult> + Send + 'static,
    {
        Self {
            func: Arc::new(
                move |parent, args, ctx, info| -> BoxFuture<FieldResult> {
                    Box::pin(f(parent, args, ctx, info))
                },
            ),
        }
    }
}

impl Resolver for AsyncFnResolver {
    fn resolve(
        &self,
        parent: &FieldValue,
        args: &ResolverArgs,
        ctx: &Context,
        info: &ResolverInfo,
    ) -> FieldResult {
        let future = (self.func)(parent.clone(), args.clone(), ctx.clone(), info.clone());
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return Ok(FieldValue::Pending(Pending::new(future)));
        };
        let handle = runtime.spawn(future);
        Ok(FieldValue::pending(async move {
            handle
                .await
                .unwrap_or_else(|e| Err(ResolverError::Internal(e.to_string())))
        }))
    }
}

/// Default resolver that reads properties from a JSON parent.
pub struct DefaultResolver;

impl Resolver for DefaultResolver {
    fn resolve(
        &self,
        parent: &FieldValue,
        _args: &ResolverArgs,
        _ctx: &Context,
        info: &ResolverInfo,
    ) -> FieldResult {
        let field_name = &info.field_name;
        match parent {
            FieldValue::Json(Json::Object(map)) => {
                let value = map
                    .get(field_name)
                    .or_else(|| map.get(&to_snake_case(field_name)))
                    .cloned()
                    .unwrap_or(Json::Null);
                Ok(FieldValue::from(value))
            }
            FieldValue::Null => Ok(FieldValue::Null),
            _ => Err(ResolverError::FieldNotFound(format!(
                "{}.{}",
                info.parent_type, field_name
            ))),
        }
    }
}

/// Converts camelCase to snake_case.
fn to_snake_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 4);
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.extend(c.to_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}

/// Picks the object type of a value returned for an abstract type.
pub type TypeResolverFn = Arc<dyn Fn(&FieldValue, &Context) -> Option<String> + Send + Sync>;

/// Storage for resolvers organized by type and field.
#[derive(Default)]
pub struct ResolverMap {
    /// Resolvers indexed by "TypeName.fieldName".
    resolvers: HashMap<String, BoxedResolver>,

    /// Default resolver for unregistered fields.
    default_resolver: Option<BoxedResolver>,

    /// Type resolvers indexed by abstract type name.
    type_resolvers: HashMap<String, TypeResolverFn>,
}

impl ResolverMap {
    /// Creates a resolver map that falls back to [`DefaultResolver`].
    pub fn new() -> Self {
        Self {
            resolvers: HashMap::new(),
            default_resolver: Some(Box::new(DefaultResolver)),
            type_resolvers: HashMap::new(),
        }
    }

    /// Registers a resolver for a specific type and field.
    pub fn register<R: Resolver + 'static>(
        &mut self,
        type_name: impl Into<String>,
        field_name: impl Into<String>,
        resolver: R,
    ) -> &mut Self {
        let key = format!("{}.{}", type_name.into(), field_name.into());
        self.resolvers.insert(key, Box::new(resolver));
        self
    }

    /// Registers a sync function as a resolver.
    pub fn register_fn<F>(
        &mut self,
        type_name: impl Into<String>,
        field_name: impl Into<String>,
        f: F,
    ) -> &mut Self
    where
        F: Fn(&FieldValue, &ResolverArgs, &Context, &ResolverInfo) -> FieldResult
            + Send
            + Sync
            + 'static,
    {
        self.register(type_name, field_name, FnResolver::new(f))
    }

    /// Registers an async function as a resolver.
    pub fn register_async<F, Fut>(
        &mut self,
        type_name: impl Into<String>,
        field_name: impl Into<String>,
        f: F,
    ) -> &mut Self
    where
        F: Fn(FieldValue, ResolverArgs, Context, ResolverInfo) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FieldResult> + Send + 'static,
    {
        self.register(type_name, field_name, AsyncFnResolver::new(f))
    }

    /// Registers the type resolver for an interface or union.
    pub fn register_type_resolver<F>(&mut self, abstract_type: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&FieldValue, &Context) -> Option<String> + Send + Sync + 'static,
    {
        self.type_resolvers.insert(abstract_type.into(), Arc::new(f));
        self
    }

    /// Gets a resolver for a type and field.
    pub fn get(&self, type_name: &str, field_name: &str) -> Option<&dyn Resolver> {
        let key = format!("{}.{}", type_name, field_name);
        self.resolvers
            .get(&key)
            .map(|r| r.as_ref())
            .or(self.default_resolver.as_ref().map(|r| r.as_ref()))
    }

    /// Names the object type of `value`, returned for `abstract_type`.
    ///
    /// Without a registered type resolver, a JSON `__typename` property is
    /// used.
    pub fn resolve_type(
        &self,
        abstract_type: &str,
        value: &FieldValue,
        ctx: &Context,
    ) -> Option<String> {
        if let Some(resolver) = self.type_resolvers.get(abstract_type) {
            return resolver(value, ctx);
        }
        value
            .as_json()?
            .get("__typename")?
            .as_str()
            .map(str::to_string)
    }

    /// Sets the default resolver.
    pub fn set_default<R: Resolver + 'static>(&mut self, resolver: R) {
        self.default_resolver = Some(Box::new(resolver));
    }

    /// Removes the default resolver.
    pub fn remove_default(&mut self) {
        self.default_resolver = None;
    }
}

impl Debug for ResolverMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverMap")
            .field("resolver_count", &self.resolvers.len())
            .field("type_resolver_count", &self.type_resolvers.len())
            .field("has_default", &self.default_resolver.is_some())
            .finish()
    }
}
