//! End-to-end execution of validated documents.

use boxql_runtime::{
    Context, Deferred, ExecutionError, Executor, ExecutorConfig, FieldError, FieldValue,
    ResolverError, ResolverMap, Response,
};
use boxql_schema::Schema;
use boxql_validation::{IrDocument, Validator, Variables};
use serde_json::{json, Value as Json};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const SCHEMA: &str = r#"
    type Query {
        slow(ms: Int!): Int
        sleepy(ms: Int!): Int
        double(n: Int = 2): Int
        foo(x: Int): String
        broken: String
        strict: String!
        pet(name: String!): Pet
        pets: [Pet!]!
        chain(steps: Int!): Int
        user: User
    }

    interface Pet { name: String }
    type Dog implements Pet { name: String barkVolume: Int }
    type Cat implements Pet { name: String meowVolume: Int }
    type User { name: String friend: User }
"#;

fn schema() -> Schema {
    Schema::from_sdl(SCHEMA).unwrap()
}

fn rewrite(schema: &Schema, query: &str) -> IrDocument {
    let result = Validator::new(schema).validate_source(query).unwrap();
    assert!(result.is_valid(), "{:?}", result.messages());
    result.internal_representation.unwrap()
}

fn pet(name: &str) -> Json {
    match name {
        "rex" => json!({"__typename": "Dog", "name": "rex", "barkVolume": 9}),
        _ => json!({"__typename": "Cat", "name": name, "meowVolume": 3}),
    }
}

/// Counts down through nested deferred values.
fn chain(steps: i64) -> FieldValue {
    if steps == 0 {
        FieldValue::from(0)
    } else {
        Deferred::field(move || chain(steps - 1))
    }
}

fn resolvers(foo_calls: Arc<AtomicUsize>) -> ResolverMap {
    let mut resolvers = ResolverMap::new();
    resolvers
        .register_async("Query", "slow", |_, args, _, _| async move {
            let ms: u64 = args.require("ms")?;
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok::<_, ResolverError>(FieldValue::from(ms))
        })
        .register_fn("Query", "sleepy", |_, args, _, _| {
            let ms: u64 = args.require("ms")?;
            Ok(FieldValue::pending(async move {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok::<_, ResolverError>(FieldValue::from(ms))
            }))
        })
        .register_fn("Query", "double", |_, args, _, _| {
            Ok(args.get_as::<i64>("n").map(|n| n * 2).into())
        })
        .register_fn("Query", "foo", move |_, args, _, _| {
            let calls = Arc::clone(&foo_calls);
            let x: i64 = args.get_as("x").unwrap_or(0);
            Ok(Deferred::field(move || {
                calls.fetch_add(1, Ordering::SeqCst);
                FieldValue::from(format!("foo-{x}"))
            }))
        })
        .register_fn("Query", "broken", |_, _, _, _| {
            Err(ResolverError::custom("boom"))
        })
        .register_fn("Query", "strict", |_, _, _, _| Ok(FieldValue::Null))
        .register_fn("Query", "pet", |_, args, _, _| {
            let name: String = args.require("name")?;
            Ok(pet(&name).into())
        })
        .register_fn("Query", "pets", |_, _, _, _| {
            Ok(FieldValue::from(vec![pet("rex"), pet("tom")]))
        })
        .register_fn("Query", "chain", |_, args, _, _| {
            Ok(chain(args.require("steps")?))
        })
        .register_fn("Query", "user", |_, _, _, _| {
            Ok(json!({"name": "ada", "friend": {"name": "grace", "friend": null}}).into())
        })
        .register_type_resolver("Pet", |value, _| {
            value
                .as_json()
                .and_then(|json| json["__typename"].as_str())
                .map(str::to_string)
        });
    resolvers
}

struct Harness {
    schema: Schema,
    foo_calls: Arc<AtomicUsize>,
    config: ExecutorConfig,
}

impl Harness {
    fn new() -> Self {
        Self {
            schema: schema(),
            foo_calls: Arc::new(AtomicUsize::new(0)),
            config: ExecutorConfig::default(),
        }
    }

    fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    async fn run(&self, query: &str, operation: Option<&str>, variables: Json) -> Response {
        let ir = rewrite(&self.schema, query);
        let Json::Object(variables) = variables else {
            panic!("variables must be an object");
        };
        Executor::new(&self.schema)
            .with_resolvers(resolvers(Arc::clone(&self.foo_calls)))
            .with_config(self.config.clone())
            .execute(&ir, operation, variables, json!({}), &Context::new())
            .await
    }

    async fn query(&self, query: &str) -> Response {
        self.run(query, None, json!({})).await
    }
}

#[tokio::test]
async fn test_async_fields_overlap() {
    let harness = Harness::new();
    let started = Instant::now();
    let response = harness
        .query("{ a: slow(ms: 100) b: slow(ms: 200) c: slow(ms: 300) }")
        .await;
    let elapsed = started.elapsed();

    assert_eq!(response.data, Some(json!({"a": 100, "b": 200, "c": 300})));
    assert!(elapsed < Duration::from_millis(450), "took {elapsed:?}");
}

#[tokio::test]
async fn test_pending_siblings_overlap() {
    let harness = Harness::new();
    let started = Instant::now();
    let response = harness
        .query("{ a: sleepy(ms: 100) b: sleepy(ms: 200) c: sleepy(ms: 300) }")
        .await;
    let elapsed = started.elapsed();

    assert!(!response.has_errors(), "{:?}", response.messages());
    assert_eq!(response.data, Some(json!({"a": 100, "b": 200, "c": 300})));
    assert!(elapsed < Duration::from_millis(450), "took {elapsed:?}");
}

#[tokio::test]
async fn test_identical_lazy_fields_under_aliases() {
    let harness = Harness::new();
    let response = harness.query("{ a: foo(x: 1) b: foo(x: 1) }").await;

    assert!(!response.has_errors());
    assert_eq!(response.data, Some(json!({"a": "foo-1", "b": "foo-1"})));
    assert_eq!(harness.foo_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_arguments_from_variables_and_defaults() {
    let harness = Harness::new();
    let query = "query Double($n: Int = 5) { fromVar: double(n: $n) fromDefault: double }";

    let response = harness.query(query).await;
    assert_eq!(response.data, Some(json!({"fromVar": 10, "fromDefault": 4})));

    let response = harness.run(query, None, json!({"n": 7})).await;
    assert_eq!(response.data, Some(json!({"fromVar": 14, "fromDefault": 4})));
}

#[tokio::test]
async fn test_skip_and_include() {
    let harness = Harness::new();
    let query = "query ($show: Boolean!) { a: double @include(if: $show) b: double @skip(if: $show) }";

    let shown = harness.run(query, None, json!({"show": true})).await;
    assert_eq!(shown.data, Some(json!({"a": 4})));

    let hidden = harness.run(query, None, json!({"show": false})).await;
    assert_eq!(hidden.data, Some(json!({"b": 4})));
}

#[tokio::test]
async fn test_abstract_types() {
    let harness = Harness::new();
    let response = harness
        .query(
            r#"{
                pet(name: "rex") { __typename name ... on Dog { barkVolume } ... on Cat { meowVolume } }
                pets { name ... on Cat { meowVolume } }
            }"#,
        )
        .await;

    assert!(!response.has_errors(), "{:?}", response.messages());
    assert_eq!(
        response.data,
        Some(json!({
            "pet": {"__typename": "Dog", "name": "rex", "barkVolume": 9},
            "pets": [{"name": "rex"}, {"name": "tom", "meowVolume": 3}],
        }))
    );
}

#[tokio::test]
async fn test_resolver_error_has_path_and_location() {
    let harness = Harness::new();
    let response = harness.query("{\n  double\n  broken\n}").await;

    assert_eq!(response.data, Some(json!({"double": 4, "broken": null})));
    insta::assert_snapshot!(
        serde_json::to_string_pretty(&response.errors).unwrap(),
        @r#"
    [
      {
        "message": "boom",
        "locations": [
          {
            "line": 3,
            "column": 3
          }
        ],
        "path": [
          "broken"
        ]
      }
    ]
    "#
    );
}

#[tokio::test]
async fn test_non_null_violation_nulls_the_root() {
    let harness = Harness::new();
    let response = harness.query("{ double strict }").await;

    assert_eq!(response.data, Some(Json::Null));
    assert_eq!(
        response.messages(),
        vec!["Cannot return null for non-nullable field Query.strict"]
    );
}

#[tokio::test]
async fn test_json_parents_use_default_resolver() {
    let harness = Harness::new();
    let response = harness
        .query("{ user { name friend { name friend { name } } } }")
        .await;

    assert_eq!(
        response.data,
        Some(json!({"user": {"name": "ada", "friend": {"name": "grace", "friend": null}}}))
    );
}

#[tokio::test]
async fn test_operation_selection() {
    let harness = Harness::new();
    let document = "query A { double } query B { foo(x: 2) }";

    let response = harness.run(document, Some("B"), json!({})).await;
    assert_eq!(response.data, Some(json!({"foo": "foo-2"})));

    let response = harness.run(document, None, json!({})).await;
    assert_eq!(response.data, None);
    assert_eq!(
        response.errors,
        Some(vec![FieldError::from(ExecutionError::OperationNameRequired)])
    );

    let response = harness.run(document, Some("C"), json!({})).await;
    assert_eq!(
        response.messages(),
        vec!["Unknown operation named 'C'"]
    );
}

#[tokio::test]
async fn test_depth_limit() {
    let harness = Harness::new().with_config(ExecutorConfig::new().with_max_depth(2));

    let response = harness.query("{ user { name } }").await;
    assert!(!response.has_errors());

    let response = harness
        .query("{ user { friend { friend { name } } } }")
        .await;
    assert_eq!(response.data, None);
    assert_eq!(
        response.messages(),
        vec!["Query has depth of 4, which exceeds max depth of 2"]
    );
}

#[tokio::test]
async fn test_lazy_depth_limit() {
    let harness = Harness::new().with_config(ExecutorConfig::new().with_max_lazy_depth(4));

    let response = harness.query("{ short: chain(steps: 4) long: chain(steps: 9) }").await;
    assert_eq!(response.data, Some(json!({"short": 0, "long": null})));
    assert_eq!(
        response.messages(),
        vec!["Lazy value was still pending after 4 forcing steps"]
    );
}
