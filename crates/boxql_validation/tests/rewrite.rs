//! Shape of the rewritten document.

use boxql_core::SourceLocation;
use boxql_schema::{Schema, TypeRef};
use boxql_validation::{ConditionKind, IrDocument, IrValue, Validator, Variables};
use serde_json::json;

const SCHEMA: &str = r#"
    type Query { pet: Pet dog: Dog }
    interface Pet { name: String }
    type Dog implements Pet { name: String nickname: String barkVolume: Int owner: Human }
    type Cat implements Pet { name: String meowVolume: Int }
    type Human { name: String }
"#;

fn rewrite(query: &str) -> IrDocument {
    let schema = Schema::from_sdl(SCHEMA).unwrap();
    let result = Validator::new(&schema).validate_source(query).unwrap();
    assert!(result.is_valid(), "{:?}", result.messages());
    result.internal_representation.unwrap()
}

fn keys<V>(map: &indexmap::IndexMap<String, V>) -> Vec<&str> {
    map.keys().map(String::as_str).collect()
}

/// Abstract return types are expanded per concrete type, fragments inlined.
#[test]
fn test_typed_children() {
    let ir = rewrite(
        "query Q($withName: Boolean = false) {\n  pet { name ... on Dog { barkVolume } ...CatFields }\n}\n\
         fragment CatFields on Cat { meowVolume name @include(if: $withName) }",
    );

    let op = ir.operation(None).unwrap();
    assert_eq!(op.name.as_deref(), Some("Q"));
    assert_eq!(op.root_type, "Query");
    assert_eq!(op.variables[0].ty, TypeRef::named("Boolean"));
    assert_eq!(op.default_variables()["withName"], json!(false));

    let pet = &op.children["pet"];
    assert_eq!(pet.owner_type, "Query");
    assert_eq!(pet.locations, [SourceLocation { line: 2, column: 3 }]);
    assert_eq!(keys(&pet.typed_children), ["Dog", "Cat"]);
    assert_eq!(keys(pet.children_for("Dog").unwrap()), ["name", "barkVolume"]);
    assert_eq!(keys(pet.children_for("Cat").unwrap()), ["name", "meowVolume"]);

    let cat_name = &pet.children_for("Cat").unwrap()["name"];
    assert_eq!(cat_name.owner_type, "Cat");
    assert_eq!(cat_name.spans.len(), 2);
    assert_eq!(cat_name.conditions.len(), 2);
    assert_eq!(cat_name.conditions[1][0].kind, ConditionKind::Include);
    assert!(cat_name.is_included(&Variables::new()));

    assert_eq!(keys(&ir.fragments["CatFields"].typed_children), ["Cat"]);
    assert!(ir.operation(Some("Q")).is_some());
    assert!(ir.operation(Some("Other")).is_none());
}

/// Sub-selections of merged appearances are concatenated.
#[test]
fn test_merged_sub_selections() {
    let ir = rewrite("{ dog { name } dog { owner { name } } }");
    let dog = &ir.operations[""].children["dog"];
    assert_eq!(dog.spans.len(), 2);
    assert_eq!(keys(dog.children_for("Dog").unwrap()), ["name", "owner"]);
}

/// Conditions on enclosing fragments apply to the fields inside them.
#[test]
fn test_inherited_conditions() {
    let ir = rewrite("{ dog { ... @skip(if: true) { name } nickname } }");
    let children = ir.operations[""].children["dog"].children_for("Dog").unwrap();
    let vars = Variables::new();
    assert!(!children["name"].is_included(&vars));
    assert!(children["nickname"].is_included(&vars));
    assert_eq!(
        children["name"].conditions[0][0].value,
        IrValue::Boolean(true)
    );
}

#[test]
fn test_arguments_keep_variables() {
    let schema = Schema::from_sdl("type Query { add(a: Int, b: [Int]): Int }").unwrap();
    let result = Validator::new(&schema)
        .validate_source("query Q($x: Int) { add(a: $x, b: [1, 2]) }")
        .unwrap();
    let ir = result.internal_representation.unwrap();
    let add = &ir.operations["Q"].children["add"];
    assert_eq!(add.arguments["a"], IrValue::Variable("x".to_string()));

    let vars: Variables = [("x".to_string(), json!(5))].into_iter().collect();
    assert_eq!(add.arguments["a"].resolve(&vars), json!(5));
    assert_eq!(add.arguments["b"].resolve(&vars), json!([1, 2]));

    insta::assert_snapshot!(serde_json::to_string_pretty(&add.arguments).unwrap(), @r#"
    {
      "a": {
        "kind": "variable",
        "value": "x"
      },
      "b": {
        "kind": "list",
        "value": [
          {
            "kind": "int",
            "value": 1
          },
          {
            "kind": "int",
            "value": 2
          }
        ]
      }
    }
    "#);
}

#[test]
fn test_ir_serializes() {
    let ir = rewrite("{ dog { name } }");
    let json = serde_json::to_value(&ir).unwrap();
    assert_eq!(json["operations"][""]["kind"], "query");
    assert_eq!(
        json["operations"][""]["children"]["dog"]["typed_children"]["Dog"]["name"]["return_type"],
        json!({"Named": "String"})
    );
}
