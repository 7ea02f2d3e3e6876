//! Lazy ("boxed") values.
//!
//! A host type registered with a [`LazyRegistry`] is unwrapped by its
//! accessor before the executor completes a field. Unwrapping repeats until
//! the value is no longer lazy, so a lazy value may produce another one.
//!
//! ```ignore
//! let mut registry = LazyRegistry::new();
//! registry.register::<Later, _>(|later| later.value());
//! registry.inherit::<SoonerOrLater>();
//! ```

use crate::error::ExecutionError;
use crate::value::FieldValue;
use rustc_hash::FxHashMap;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

type Accessor = Arc<dyn Fn(&dyn Any) -> Option<FieldValue> + Send + Sync>;
type Upcast = fn(&dyn Any) -> Option<&dyn Any>;

/// A host type that extends another one.
///
/// Registry lookups for a type with no accessor of its own continue with its
/// parent, so registering a base type covers everything built on it.
pub trait Ancestry: Any + Send + Sync {
    type Parent: Any + Send + Sync;

    fn parent(&self) -> &Self::Parent;
}

struct Registered {
    name: &'static str,
    accessor: Accessor,
}

struct ParentLink {
    parent: TypeId,
    upcast: Upcast,
}

/// The accessor found for a concrete type, with the upcasts that lead to it.
struct Resolution {
    upcasts: Vec<Upcast>,
    accessor: Accessor,
    name: &'static str,
}

/// Maps host types to the accessor that unwraps them.
///
/// Registration happens during setup; lookups during execution go through a
/// per-type cache.
pub struct LazyRegistry {
    accessors: FxHashMap<TypeId, Registered>,
    parents: FxHashMap<TypeId, ParentLink>,
    cache: Mutex<FxHashMap<TypeId, Option<Arc<Resolution>>>>,
}

impl Default for LazyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LazyRegistry {
    /// Creates a registry that knows [`Deferred`].
    pub fn new() -> Self {
        let mut registry = Self {
            accessors: FxHashMap::default(),
            parents: FxHashMap::default(),
            cache: Mutex::new(FxHashMap::default()),
        };
        registry.register::<Deferred, _>(Deferred::value);
        registry
    }

    /// Registers the accessor that unwraps a `T`.
    pub fn register<T, F>(&mut self, accessor: F) -> &mut Self
    where
        T: Any + Send + Sync,
        F: Fn(&T) -> FieldValue + Send + Sync + 'static,
    {
        let accessor: Accessor =
            Arc::new(move |value: &dyn Any| value.downcast_ref::<T>().map(&accessor));
        self.accessors.insert(
            TypeId::of::<T>(),
            Registered {
                name: std::any::type_name::<T>(),
                accessor,
            },
        );
        self.clear_cache();
        self
    }

    /// Declares that `T` extends `T::Parent`.
    pub fn inherit<T: Ancestry>(&mut self) -> &mut Self {
        self.parents.insert(
            TypeId::of::<T>(),
            ParentLink {
                parent: TypeId::of::<T::Parent>(),
                upcast: upcast::<T>,
            },
        );
        self.clear_cache();
        self
    }

    /// Returns true if the executor must force `value` before using it.
    pub fn is_lazy(&self, value: &FieldValue) -> bool {
        match value {
            FieldValue::Pending(_) => true,
            FieldValue::Object(object) => self.lookup(object.as_ref().type_id()).is_some(),
            _ => false,
        }
    }

    /// Name of the registered type that makes `value` lazy.
    pub fn accessor_name(&self, value: &FieldValue) -> Option<&'static str> {
        match value {
            FieldValue::Object(object) => self.lookup(object.as_ref().type_id()).map(|r| r.name),
            _ => None,
        }
    }

    /// Forces `value` until it is no longer lazy.
    ///
    /// Each unwrap counts as one step; more than `max_steps` steps is an
    /// error, which stops lazy values that keep producing lazy values.
    pub async fn force(
        &self,
        mut value: FieldValue,
        max_steps: usize,
    ) -> Result<FieldValue, ExecutionError> {
        for _ in 0..max_steps {
            value = match value {
                FieldValue::Pending(pending) => pending.force().await?,
                FieldValue::Object(object) => match self.unwrap_once(object.as_ref()) {
                    Some(next) => next,
                    None => return Ok(FieldValue::Object(object)),
                },
                other => return Ok(other),
            };
        }
        if self.is_lazy(&value) {
            tracing::warn!(limit = max_steps, "lazy value did not settle");
            return Err(ExecutionError::LazyDepthExceeded { limit: max_steps });
        }
        Ok(value)
    }

    fn unwrap_once(&self, object: &(dyn Any + Send + Sync)) -> Option<FieldValue> {
        let resolution = self.lookup(object.type_id())?;
        let mut current: &dyn Any = object;
        for upcast in &resolution.upcasts {
            current = upcast(current)?;
        }
        (resolution.accessor)(current)
    }

    fn lookup(&self, type_id: TypeId) -> Option<Arc<Resolution>> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache
            .entry(type_id)
            .or_insert_with(|| self.walk_ancestry(type_id).map(Arc::new))
            .clone()
    }

    fn walk_ancestry(&self, type_id: TypeId) -> Option<Resolution> {
        let mut upcasts = Vec::new();
        let mut current = type_id;
        // Every step follows a distinct link unless the links form a cycle.
        for _ in 0..=self.parents.len() {
            if let Some(registered) = self.accessors.get(&current) {
                return Some(Resolution {
                    upcasts,
                    accessor: Arc::clone(&registered.accessor),
                    name: registered.name,
                });
            }
            let link = self.parents.get(&current)?;
            upcasts.push(link.upcast);
            current = link.parent;
        }
        None
    }

    fn clear_cache(&mut self) {
        self.cache
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl fmt::Debug for LazyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyRegistry")
            .field(
                "registered",
                &self.accessors.values().map(|r| r.name).collect::<Vec<_>>(),
            )
            .field("inherited", &self.parents.len())
            .finish()
    }
}

fn upcast<T: Ancestry>(value: &dyn Any) -> Option<&dyn Any> {
    value.downcast_ref::<T>().map(|value| value.parent() as &dyn Any)
}

type Thunk = Box<dyn FnOnce() -> FieldValue + Send>;

/// A value computed on first force and remembered afterwards.
pub struct Deferred {
    thunk: Mutex<Option<Thunk>>,
    value: OnceLock<FieldValue>,
}

impl Deferred {
    pub fn new<F>(thunk: F) -> Self
    where
        F: FnOnce() -> FieldValue + Send + 'static,
    {
        Self {
            thunk: Mutex::new(Some(Box::new(thunk))),
            value: OnceLock::new(),
        }
    }

    /// Shorthand for a lazy [`FieldValue::Object`] holding a `Deferred`.
    pub fn field<F>(thunk: F) -> FieldValue
    where
        F: FnOnce() -> FieldValue + Send + 'static,
    {
        FieldValue::object(Self::new(thunk))
    }

    /// Runs the thunk once and returns the stored value.
    pub fn value(&self) -> FieldValue {
        self.value
            .get_or_init(|| {
                let thunk = self
                    .thunk
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take();
                thunk.map_or(FieldValue::Null, |thunk| thunk())
            })
            .clone()
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("forced", &self.value.get().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Boxed(i64);

    struct SubBoxed(Boxed);

    impl Ancestry for SubBoxed {
        type Parent = Boxed;

        fn parent(&self) -> &Boxed {
            &self.0
        }
    }

    struct Sum(i64);

    fn registry() -> LazyRegistry {
        let mut registry = LazyRegistry::new();
        registry
            .register::<Boxed, _>(|b| FieldValue::from(b.0))
            .register::<Sum, _>(|s| FieldValue::from(s.0 * 10))
            .inherit::<SubBoxed>();
        registry
    }

    #[test]
    fn test_lookup_follows_ancestry() {
        let registry = registry();
        let boxed = FieldValue::object(Boxed(1));
        let sub = FieldValue::object(SubBoxed(Boxed(2)));
        let sum = FieldValue::object(Sum(3));

        assert_eq!(registry.accessor_name(&boxed), registry.accessor_name(&sub));
        assert!(registry.accessor_name(&sum).is_some_and(|name| name.ends_with("Sum")));
        assert!(registry.is_lazy(&sub));
        assert!(!registry.is_lazy(&FieldValue::object(5_u8)));
        assert!(!registry.is_lazy(&FieldValue::from(1)));
    }

    #[tokio::test]
    async fn test_force_subclass() {
        let registry = registry();
        let value = registry
            .force(FieldValue::object(SubBoxed(Boxed(2))), 8)
            .await
            .unwrap();
        assert_eq!(value.as_json(), Some(&json!(2)));
    }

    #[tokio::test]
    async fn test_nested_force_is_idempotent() {
        let registry = LazyRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let outer = Deferred::field(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Deferred::field(|| FieldValue::pending(async { Ok(FieldValue::from("done")) }))
        });

        let first = registry.force(outer.clone(), 8).await.unwrap();
        let second = registry.force(outer, 8).await.unwrap();
        assert_eq!(first.as_json(), Some(&json!("done")));
        assert_eq!(second.as_json(), Some(&json!("done")));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_force_is_bounded() {
        fn chain(n: usize) -> FieldValue {
            if n == 0 {
                FieldValue::from(0)
            } else {
                Deferred::field(move || chain(n - 1))
            }
        }

        let registry = LazyRegistry::new();
        assert!(registry.force(chain(3), 3).await.is_ok());
        assert_eq!(
            registry.force(chain(5), 3).await.unwrap_err(),
            ExecutionError::LazyDepthExceeded { limit: 3 }
        );
    }
}
