//! Values produced by resolvers.

use crate::error::ResolverError;
use serde_json::Value as Json;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;

/// Result of resolving one field.
pub type FieldResult = Result<FieldValue, ResolverError>;

/// A boxed, sendable future.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// A field value as seen by the executor.
///
/// `Pending` values and `Object`s whose type is registered with the
/// [`LazyRegistry`](crate::LazyRegistry) are lazy: the executor forces them
/// before completing the field.
#[derive(Clone)]
pub enum FieldValue {
    Null,
    Json(Json),
    List(Vec<FieldValue>),
    /// An opaque host value. Child fields receive it as their parent.
    Object(Arc<dyn Any + Send + Sync>),
    Pending(Pending),
}

impl FieldValue {
    /// Wraps a host value.
    pub fn object<T: Any + Send + Sync>(value: T) -> Self {
        Self::Object(Arc::new(value))
    }

    /// Wraps a future. It is not polled until forced.
    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = FieldResult> + Send + 'static,
    {
        Self::Pending(Pending::new(future))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null | Self::Json(Json::Null))
    }

    pub fn as_json(&self) -> Option<&Json> {
        match self {
            Self::Json(json) => Some(json),
            _ => None,
        }
    }

    /// Borrows the host value if it is a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Object(object) => object.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl From<Json> for FieldValue {
    fn from(value: Json) -> Self {
        match value {
            Json::Null => Self::Null,
            other => Self::Json(other),
        }
    }
}

macro_rules! impl_from_json {
    ($($ty:ty),*) => {
        $(impl From<$ty> for FieldValue {
            fn from(value: $ty) -> Self {
                Self::Json(Json::from(value))
            }
        })*
    };
}

impl_from_json!(i32, i64, u32, u64, f64, bool, String, &str);

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Json(json) => f.debug_tuple("Json").field(json).finish(),
            Self::List(items) => f.debug_tuple("List").field(items).finish(),
            Self::Object(_) => f.write_str("Object(..)"),
            Self::Pending(pending) => fmt::Debug::fmt(pending, f),
        }
    }
}

/// A shared, memoised future.
///
/// Clones share one computation; the future runs at most once and every
/// clone observes the same result.
#[derive(Clone)]
pub struct Pending(Arc<PendingInner>);

struct PendingInner {
    future: Mutex<Option<BoxFuture<FieldResult>>>,
    result: OnceCell<FieldResult>,
}

impl Pending {
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = FieldResult> + Send + 'static,
    {
        Self(Arc::new(PendingInner {
            future: Mutex::new(Some(Box::pin(future))),
            result: OnceCell::new(),
        }))
    }

    /// True once the value has been forced.
    pub fn is_forced(&self) -> bool {
        self.0.result.initialized()
    }

    /// Drives the future to completion, or returns the stored result.
    pub async fn force(&self) -> FieldResult {
        self.0
            .result
            .get_or_init(|| async {
                let future = self
                    .0
                    .future
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take();
                match future {
                    Some(future) => future.await,
                    None => Err(ResolverError::Internal("pending value lost its future".into())),
                }
            })
            .await
            .clone()
    }
}

impl fmt::Debug for Pending {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pending")
            .field("forced", &self.is_forced())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_pending_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let pending = Pending::new(async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(FieldValue::from(7))
        });
        let clone = pending.clone();

        assert!(!pending.is_forced());
        let first = pending.force().await.unwrap();
        let second = clone.force().await.unwrap();
        assert_eq!(first.as_json(), Some(&json!(7)));
        assert_eq!(second.as_json(), Some(&json!(7)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(clone.is_forced());
    }

    #[test]
    fn test_conversions() {
        assert!(FieldValue::from(json!(null)).is_null());
        assert!(FieldValue::from(None::<i64>).is_null());
        assert!(matches!(FieldValue::from(vec![1, 2]), FieldValue::List(items) if items.len() == 2));
        assert_eq!(FieldValue::object(5_u8).downcast_ref::<u8>(), Some(&5));
    }
}
