//! Host types and batched sums forced by the executor.

use boxql_runtime::{
    Ancestry, Context, Executor, FieldValue, LazyRegistry, ResolverError, ResolverMap, Response,
};
use boxql_schema::Schema;
use boxql_validation::{Validator, Variables};
use serde_json::{json, Value as Json};

const SCHEMA: &str = r#"
    schema { query: Query mutation: Query }

    type Query {
        int(value: Int!, plus: Int = 0): Int!
        nestedSum(value: Int!): BoxedSum!
        nullableNestedSum(value: Int): BoxedSum
        listSum(values: [Int]): [BoxedSum]
    }

    type BoxedSum {
        value: Int
        nestedSum(value: Int!): BoxedSum!
        nullableNestedSum(value: Int): BoxedSum
    }
"#;

/// A value wrapped by the host application.
struct Boxed(Option<i64>);

/// A host type built on [`Boxed`] with no accessor of its own.
struct LabeledBox {
    inner: Boxed,
    #[allow(dead_code)]
    label: &'static str,
}

impl Ancestry for LabeledBox {
    type Parent = Boxed;

    fn parent(&self) -> &Boxed {
        &self.inner
    }
}

/// Joins the "sum_all" batch; every member resolves to the group's total.
fn sum_all(ctx: &Context, value: i64) -> FieldValue {
    ctx.batch("sum_all", json!(value), |inputs| async move {
        let total: i64 = inputs.iter().filter_map(Json::as_i64).sum();
        Ok::<_, ResolverError>(vec![FieldValue::from(total); inputs.len()])
    })
    .into_field()
}

fn own_value(parent: &FieldValue) -> i64 {
    parent.as_json().and_then(Json::as_i64).unwrap_or(0)
}

fn nested(parent: &FieldValue, value: Option<i64>, ctx: &Context) -> FieldValue {
    match value {
        Some(13) => FieldValue::object(Boxed(None)),
        Some(value) => sum_all(ctx, own_value(parent) + value),
        None => FieldValue::Null,
    }
}

fn register_resolvers(resolvers: &mut ResolverMap) {
    resolvers
        .register_fn("Query", "int", |_, args, _, _| {
            let value: i64 = args.require("value")?;
            let plus: i64 = args.get_as("plus").unwrap_or(0);
            Ok(FieldValue::object(LabeledBox {
                inner: Boxed(Some(value + plus)),
                label: "int",
            }))
        })
        .register_fn("Query", "nestedSum", |parent, args, ctx, _| {
            Ok(nested(parent, args.get_as("value"), ctx))
        })
        .register_fn("Query", "nullableNestedSum", |parent, args, ctx, _| {
            Ok(nested(parent, args.get_as("value"), ctx))
        })
        .register_fn("Query", "listSum", |_, args, _, _| {
            Ok(FieldValue::from(args.get("values").cloned().unwrap_or(Json::Null)))
        })
        .register_fn("BoxedSum", "value", |parent, _, _, _| {
            Ok(match own_value(parent) {
                13 => FieldValue::Null,
                value => FieldValue::from(value),
            })
        })
        .register_fn("BoxedSum", "nestedSum", |parent, args, ctx, _| {
            Ok(nested(parent, args.get_as("value"), ctx))
        })
        .register_fn("BoxedSum", "nullableNestedSum", |parent, args, ctx, _| {
            Ok(nested(parent, args.get_as("value"), ctx))
        });
}

fn register_host_types(lazy: &mut LazyRegistry) {
    lazy.register::<Boxed, _>(|boxed| FieldValue::from(boxed.0))
        .inherit::<LabeledBox>();
}

async fn run(query: &str) -> Response {
    let schema = Schema::from_sdl(SCHEMA).unwrap();
    let result = Validator::new(&schema).validate_source(query).unwrap();
    assert!(result.is_valid(), "{:?}", result.messages());
    let ir = result.internal_representation.unwrap();

    let mut executor = Executor::new(&schema);
    register_resolvers(executor.resolvers_mut());
    register_host_types(executor.lazy_registry_mut());
    executor
        .execute(&ir, None, Variables::new(), FieldValue::Null, &Context::new())
        .await
}

#[tokio::test]
async fn test_unwraps_registered_host_types() {
    let response = run("{ int(value: 2, plus: 1) }").await;
    assert_eq!(response.data, Some(json!({"int": 3})));
    assert!(!response.has_errors());
}

#[tokio::test]
async fn test_sibling_sums_share_a_batch() {
    let response = run(
        r#"{
            a: nestedSum(value: 3) {
                value
                nestedSum(value: 7) { value }
            }
            b: nestedSum(value: 2) {
                value
                nestedSum(value: 11) { value }
            }
            c: listSum(values: [1, 2]) {
                nestedSum(value: 3) { value }
            }
        }"#,
    )
    .await;

    assert!(!response.has_errors(), "{:?}", response.messages());
    assert_eq!(
        response.data,
        Some(json!({
            "a": {"value": 14, "nestedSum": {"value": 46}},
            "b": {"value": 14, "nestedSum": {"value": 46}},
            "c": [{"nestedSum": {"value": 14}}, {"nestedSum": {"value": 14}}],
        }))
    );
}

#[tokio::test]
async fn test_null_reaches_the_root() {
    let response = run(
        r#"{
            nestedSum(value: 1) {
                value
                nestedSum(value: 13) { value }
            }
        }"#,
    )
    .await;

    assert_eq!(response.data, Some(Json::Null));
    assert_eq!(
        response.messages(),
        vec!["Cannot return null for non-nullable field BoxedSum.nestedSum"]
    );
}

#[tokio::test]
async fn test_null_stops_at_nullable_field() {
    let response = run(
        r#"{
            nullableNestedSum(value: 1) {
                value
                nullableNestedSum(value: 2) {
                    nestedSum(value: 13) { value }
                }
            }
        }"#,
    )
    .await;

    assert_eq!(
        response.data,
        Some(json!({"nullableNestedSum": {"value": 1, "nullableNestedSum": null}}))
    );
    let errors = response.errors.unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(
        serde_json::to_value(&errors[0].path).unwrap(),
        json!(["nullableNestedSum", "nullableNestedSum", "nestedSum"])
    );
}

#[tokio::test]
async fn test_mutation_fields_settle_in_order() {
    let selection = r#"{
        a: nestedSum(value: 2) { value }
        b: nestedSum(value: 4) { value }
        c: nestedSum(value: 6) { value }
    }"#;

    let query = run(selection).await;
    let values: Vec<&Json> = ["a", "b", "c"]
        .iter()
        .map(|key| &query.data.as_ref().unwrap()[key]["value"])
        .collect();
    assert_eq!(values, [&json!(12), &json!(12), &json!(12)]);

    let mutation = run(&format!("mutation {selection}")).await;
    let values: Vec<&Json> = ["a", "b", "c"]
        .iter()
        .map(|key| &mutation.data.as_ref().unwrap()[key]["value"])
        .collect();
    assert_eq!(values, [&json!(2), &json!(4), &json!(6)]);
}
