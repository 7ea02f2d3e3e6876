//! Execution runtime for boxql.
//!
//! The [`Executor`] runs a rewritten document against resolvers. Resolvers
//! may return lazy values: [`Pending`] futures, [`Batched`] loads or host
//! types registered with the [`LazyRegistry`]. The executor defers forcing
//! them so independent lazy values overlap.
//!
//! ```ignore
//! let mut resolvers = ResolverMap::new();
//! resolvers.register_async("Query", "user", |_, args, _, _| async move {
//!     load_user(args.require("id")?).await
//! });
//! let response = Executor::new(&schema)
//!     .with_resolvers(resolvers)
//!     .execute(&ir, None, Variables::new(), json!({}), &Context::new())
//!     .await;
//! ```

pub mod batch;
pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod input;
pub mod lazy;
pub mod resolver;
pub mod response;
pub mod value;

pub use batch::{BatchResult, BatchTable, Batched};
pub use config::ExecutorConfig;
pub use context::Context;
pub use error::{ExecutionError, ResolverError};
pub use executor::Executor;
pub use input::{coerce_arguments, coerce_value};
pub use lazy::{Ancestry, Deferred, LazyRegistry};
pub use resolver::{
    AsyncFnResolver, DefaultResolver, FnResolver, Resolver, ResolverArgs, ResolverInfo,
    ResolverMap,
};
pub use response::{FieldError, PathSegment, Response};
pub use value::{BoxFuture, FieldResult, FieldValue, Pending};
