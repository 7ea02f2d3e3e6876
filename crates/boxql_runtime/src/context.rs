//! Request-scoped state handed to every resolver.

use crate::batch::{BatchResult, BatchTable, Batched};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// Execution context.
///
/// Cloning is cheap: clones share the batch table.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Request-scoped data.
    pub data: HashMap<String, Json>,
    batches: Arc<BatchTable>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a value in the context.
    pub fn set<T: Serialize>(&mut self, key: impl Into<String>, value: T) {
        if let Ok(v) = serde_json::to_value(value) {
            self.data.insert(key.into(), v);
        }
    }

    /// Gets a value from the context.
    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Joins the open batch group for `key`. See [`BatchTable::enqueue`].
    pub fn batch<F, Fut>(&self, key: &str, input: Json, loader: F) -> Batched
    where
        F: Fn(Vec<Json>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = BatchResult> + Send + 'static,
    {
        self.batches.enqueue(key, input, loader)
    }

    pub fn batches(&self) -> &BatchTable {
        &self.batches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResolverError;
    use crate::value::FieldValue;
    use serde_json::json;

    #[test]
    fn test_context_data() {
        let mut ctx = Context::new();
        ctx.set("user_id", 42);
        assert_eq!(ctx.get::<i64>("user_id"), Some(42));
        assert_eq!(ctx.get::<i64>("missing"), None);
    }

    #[tokio::test]
    async fn test_clones_share_batches() {
        let ctx = Context::new();
        let clone = ctx.clone();
        let double = |inputs: Vec<Json>| async move {
            let values: Vec<FieldValue> = inputs
                .iter()
                .map(|v| FieldValue::from(v.as_i64().unwrap_or(0) * 2))
                .collect();
            Ok::<_, ResolverError>(values)
        };
        let a = ctx.batch("double", json!(1), double);
        let b = clone.batch("double", json!(4), double);
        assert_eq!(ctx.batches().pending("double"), 2);
        assert_eq!(b.load().await.unwrap().as_json(), Some(&json!(8)));
        assert_eq!(a.load().await.unwrap().as_json(), Some(&json!(2)));
    }
}
