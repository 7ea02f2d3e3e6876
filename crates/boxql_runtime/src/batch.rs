//! Batched loads shared by sibling fields.
//!
//! Fields that enqueue under the same key join one group. The group's
//! loader runs when the first member is forced, with every input enqueued
//! so far; later enqueues under that key start a fresh group.

use crate::error::ResolverError;
use crate::value::{BoxFuture, FieldValue};
use rustc_hash::FxHashMap;
use serde_json::Value as Json;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;

/// Result of a batch load: one value per input, in enqueue order.
pub type BatchResult = Result<Vec<FieldValue>, ResolverError>;

type Loader = Arc<dyn Fn(Vec<Json>) -> BoxFuture<BatchResult> + Send + Sync>;

/// Open batch groups keyed by name.
#[derive(Default)]
pub struct BatchTable {
    groups: Mutex<FxHashMap<String, Arc<BatchGroup>>>,
}

struct BatchGroup {
    key: String,
    state: Mutex<GroupState>,
    loader: Loader,
    result: OnceCell<BatchResult>,
}

#[derive(Default)]
struct GroupState {
    inputs: Vec<Json>,
    closed: bool,
}

impl BatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `input` to the open group for `key` and returns its lazy result.
    ///
    /// `loader` is used only if this call opens a new group.
    pub fn enqueue<F, Fut>(&self, key: &str, input: Json, loader: F) -> Batched
    where
        F: Fn(Vec<Json>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = BatchResult> + Send + 'static,
    {
        let mut groups = self.groups.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(group) = groups.get(key) {
            if let Some(index) = group.push(input.clone()) {
                return Batched {
                    group: Arc::clone(group),
                    index,
                };
            }
        }

        let loader: Loader =
            Arc::new(move |inputs: Vec<Json>| -> BoxFuture<BatchResult> { Box::pin(loader(inputs)) });
        let group = Arc::new(BatchGroup {
            key: key.to_string(),
            state: Mutex::new(GroupState {
                inputs: vec![input],
                closed: false,
            }),
            loader,
            result: OnceCell::new(),
        });
        groups.insert(key.to_string(), Arc::clone(&group));
        Batched { group, index: 0 }
    }

    /// Number of inputs waiting in the open group for `key`.
    pub fn pending(&self, key: &str) -> usize {
        let groups = self.groups.lock().unwrap_or_else(PoisonError::into_inner);
        groups.get(key).map_or(0, |group| group.open_len())
    }
}

impl fmt::Debug for BatchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let groups = self.groups.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("BatchTable")
            .field("groups", &groups.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl BatchGroup {
    /// Appends an input unless the group has already flushed.
    fn push(&self, input: Json) -> Option<usize> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            return None;
        }
        state.inputs.push(input);
        Some(state.inputs.len() - 1)
    }

    fn open_len(&self) -> usize {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            0
        } else {
            state.inputs.len()
        }
    }

    async fn flush(&self) -> &BatchResult {
        self.result
            .get_or_init(|| async {
                let inputs = {
                    let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
                    state.closed = true;
                    std::mem::take(&mut state.inputs)
                };
                tracing::debug!(key = %self.key, size = inputs.len(), "flushing batch");
                let expected = inputs.len();
                let values = (self.loader)(inputs).await?;
                if values.len() == expected {
                    Ok(values)
                } else {
                    Err(ResolverError::Internal(format!(
                        "batch '{}' loaded {} values for {} inputs",
                        self.key,
                        values.len(),
                        expected
                    )))
                }
            })
            .await
    }
}

/// One member's share of a batch group.
#[derive(Clone)]
pub struct Batched {
    group: Arc<BatchGroup>,
    index: usize,
}

impl Batched {
    /// Flushes the group if needed and returns this member's value.
    pub async fn load(&self) -> Result<FieldValue, ResolverError> {
        match self.group.flush().await {
            Ok(values) => values
                .get(self.index)
                .cloned()
                .ok_or_else(|| ResolverError::Internal("batch result out of range".into())),
            Err(error) => Err(error.clone()),
        }
    }

    /// The lazy field value that loads this member when forced.
    pub fn into_field(self) -> FieldValue {
        FieldValue::pending(async move { self.load().await })
    }
}

impl From<Batched> for FieldValue {
    fn from(batched: Batched) -> Self {
        batched.into_field()
    }
}

impl fmt::Debug for Batched {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Batched")
            .field("key", &self.group.key)
            .field("index", &self.index)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn summing(calls: Arc<AtomicUsize>) -> impl Fn(Vec<Json>) -> BoxFuture<BatchResult> + Send + Sync {
        move |inputs: Vec<Json>| {
            calls.fetch_add(1, Ordering::SeqCst);
            let total: i64 = inputs.iter().filter_map(Json::as_i64).sum();
            Box::pin(async move { Ok::<_, ResolverError>(vec![FieldValue::from(total); inputs.len()]) })
        }
    }

    #[tokio::test]
    async fn test_group_flushes_once() {
        let table = BatchTable::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let a = table.enqueue("sum", json!(1), summing(Arc::clone(&calls)));
        let b = table.enqueue("sum", json!(2), summing(Arc::clone(&calls)));
        assert_eq!(table.pending("sum"), 2);

        assert_eq!(b.load().await.unwrap().as_json(), Some(&json!(3)));
        assert_eq!(a.load().await.unwrap().as_json(), Some(&json!(3)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(table.pending("sum"), 0);
    }

    #[tokio::test]
    async fn test_flushed_group_is_closed() {
        let table = BatchTable::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let first = table.enqueue("sum", json!(5), summing(Arc::clone(&calls)));
        assert_eq!(first.load().await.unwrap().as_json(), Some(&json!(5)));

        let second = table.enqueue("sum", json!(7), summing(Arc::clone(&calls)));
        assert_eq!(second.load().await.unwrap().as_json(), Some(&json!(7)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_short_result_is_an_error() {
        let table = BatchTable::new();
        let member = table.enqueue("broken", json!(1), |_| async {
            Ok::<Vec<FieldValue>, ResolverError>(Vec::new())
        });
        assert!(matches!(member.load().await, Err(ResolverError::Internal(_))));
    }
}
