//! Integration tests for the validation pipeline.

use boxql_schema::Schema;
use boxql_validation::{RuleKind, ValidateError, ValidationResult, Validator, ValidatorConfig};

const SCHEMA: &str = r#"
    type Query {
      dog: Dog
      pet: Pet
      catOrDog: CatOrDog
      foo(x: Int): Int
    }

    interface Pet { name: String }

    type Dog implements Pet {
      name: String
      nickname: String
      barkVolume: Int
      doesKnowCommand(command: DogCommand!): Boolean
      owner: Human
    }

    type Cat implements Pet {
      name: String
      nickname: String
      meowVolume: Int
      owner: Human
    }

    union CatOrDog = Cat | Dog

    enum DogCommand { SIT DOWN }

    type Human { name: String nickname: String }
"#;

fn schema() -> Schema {
    Schema::from_sdl(SCHEMA).unwrap()
}

fn validate(query: &str) -> ValidationResult {
    Validator::new(&schema()).validate_source(query).unwrap()
}

fn messages(query: &str) -> Vec<String> {
    validate(query)
        .errors
        .into_iter()
        .map(|e| e.title)
        .collect()
}

/// Same response key, same field and same arguments merge.
#[test]
fn test_identical_fields_merge() {
    assert!(messages("{ a: foo(x: 1) b: foo(x: 1) }").is_empty());
    assert!(messages("{ a: foo(x: 1) a: foo(x: 1) }").is_empty());
    assert!(messages("{ dog { name } dog { name } ... on Query { dog { name } } }").is_empty());
}

/// Differing arguments under one response key are one conflict.
#[test]
fn test_argument_conflict() {
    assert_eq!(
        messages("{ a: foo(x: 1) a: foo(x: 2) }"),
        ["Field 'a' has an argument conflict: {x: 1} or {x: 2}?"]
    );
}

/// Variables are compared by name.
#[test]
fn test_argument_conflict_with_variables() {
    assert_eq!(
        messages("query Q($a: Int, $b: Int) { foo(x: $b) foo(x: $a) }"),
        ["Field 'foo' has an argument conflict: {x: $a} or {x: $b}?"]
    );
    assert!(messages("query Q($a: Int) { foo(x: $a) foo(x: $a) }").is_empty());
}

/// Aliasing two different fields to one key is a conflict, names sorted.
#[test]
fn test_field_conflict() {
    let result = validate("{ dog { name: nickname name } }");
    assert_eq!(
        result.messages(),
        ["Field 'name' has a field conflict: name or nickname?"]
    );
    assert_eq!(result.errors[0].labels.len(), 2);
    assert!(result.internal_representation.is_none());
}

/// Conflicts nested under merged fields are found.
#[test]
fn test_nested_conflict() {
    assert_eq!(
        messages("{ dog { owner { n: name } } dog { owner { n: nickname } } }"),
        ["Field 'n' has a field conflict: name or nickname?"]
    );
}

/// An interface and one of its objects can be the same value.
#[test]
fn test_interface_and_object_not_exclusive() {
    assert_eq!(
        messages("{ pet { n: name ... on Dog { n: nickname } } }"),
        ["Field 'n' has a field conflict: name or nickname?"]
    );
}

/// Union members are mutually exclusive, down through sub-selections.
#[test]
fn test_union_members_exclusive() {
    let query = r#"
        {
          catOrDog {
            ... on Dog { volume: barkVolume friend: owner { title: name } }
            ... on Cat { volume: meowVolume friend: owner { title: nickname } }
          }
        }
    "#;
    assert!(messages(query).is_empty());
}

/// Conflicts reached through fragment spreads are reported.
#[test]
fn test_conflict_between_fragments() {
    let query = r#"
        { dog { ...A ...B } }
        fragment A on Dog { x: name }
        fragment B on Dog { x: barkVolume }
    "#;
    assert_eq!(
        messages(query),
        ["Field 'x' has a field conflict: barkVolume or name?"]
    );
}

#[test]
fn test_rule_findings() {
    let cases: &[(&str, &str)] = &[
        (
            "{ dog { unknownField } }",
            "Field 'unknownField' doesn't exist on type 'Dog'",
        ),
        (
            "{ catOrDog { name } }",
            "Selections can't be made directly on unions (see selections on CatOrDog)",
        ),
        (
            "{ dog }",
            "Field 'dog' of type 'Dog' must have a selection of subfields",
        ),
        (
            "{ dog { name { length } } }",
            "Selections can't be made on scalars (field 'name' returns String but has selections)",
        ),
        (
            "{ dog { name(x: 1) } }",
            "Field 'name' doesn't accept argument 'x'",
        ),
        (
            "{ dog { doesKnowCommand } }",
            "Field 'doesKnowCommand' is missing required arguments: command",
        ),
        (
            "{ dog @nope { name } }",
            "Directive @nope is not defined",
        ),
        (
            "{ dog { name @skip } }",
            "Directive '@skip' is missing required arguments: if",
        ),
        (
            "query @skip(if: true) { dog { name } }",
            "'@skip' can't be applied to QUERY (allowed: FIELD, FRAGMENT_SPREAD, INLINE_FRAGMENT)",
        ),
        (
            "{ dog { ...Missing } }",
            "Fragment Missing was used, but not defined",
        ),
        (
            "{ dog { name } } fragment F on Dog { name }",
            "Fragment F was defined, but not used",
        ),
        (
            "{ dog { ...F } } fragment F on Nope { name }",
            "No such type Nope, so it can't be a fragment condition",
        ),
        (
            "query Q { dog { doesKnowCommand(command: $cmd) } }",
            "Variable $cmd is used by Q but not declared",
        ),
        ("mutation { x }", "Schema is not configured for mutations"),
    ];

    for (query, expected) in cases {
        assert_eq!(messages(query), [*expected], "query: {query}");
    }
}

#[test]
fn test_variables_used_in_fragments() {
    let query = r#"
        { dog { ...F } }
        fragment F on Dog { doesKnowCommand(command: $cmd) }
    "#;
    assert_eq!(
        messages(query),
        ["Variable $cmd is used by anonymous query but not declared"]
    );
}

#[test]
fn test_fragment_cycles() {
    let query = r#"
        { dog { ...A } }
        fragment A on Dog { name ...B }
        fragment B on Dog { name ...A }
    "#;
    assert_eq!(
        messages(query),
        [
            "Fragment A contains an infinite loop",
            "Fragment B contains an infinite loop",
        ]
    );
}

/// Findings from every rule are collected, in detection order.
#[test]
fn test_validation_is_exhaustive() {
    let result = validate("{ dog { unknownField } a: foo(x: 1) a: foo(x: 2) }");
    assert_eq!(
        result.messages(),
        [
            "Field 'a' has an argument conflict: {x: 1} or {x: 2}?",
            "Field 'unknownField' doesn't exist on type 'Dog'",
        ]
    );
}

#[test]
fn test_ir_present_only_when_valid() {
    let valid = validate("{ dog { name } }");
    assert!(valid.is_valid());
    assert!(valid.internal_representation.is_some());

    let invalid = validate("{ dog { unknownField } }");
    assert!(!invalid.is_valid());
    assert!(invalid.internal_representation.is_none());
}

/// Disabling validation still produces the rewritten document.
#[test]
fn test_rewrite_runs_without_validation() {
    let schema = schema();
    let result = Validator::new(&schema)
        .without_validation()
        .validate_source("{ dog { unknownField name } }")
        .unwrap();
    assert!(result.errors.is_empty());

    let ir = result.internal_representation.unwrap();
    let dog = &ir.operations[""].children["dog"];
    let children = dog.children_for("Dog").unwrap();
    assert_eq!(children.keys().collect::<Vec<_>>(), ["name"]);
}

#[test]
fn test_rule_subset() {
    let schema = schema();
    let result = Validator::new(&schema)
        .with_rules([RuleKind::FieldsWillMerge])
        .validate_source("{ dog { unknownField } a: foo(x: 1) a: foo(x: 2) }")
        .unwrap();
    assert_eq!(
        result.messages(),
        ["Field 'a' has an argument conflict: {x: 1} or {x: 2}?"]
    );
}

#[test]
fn test_node_budget() {
    let schema = schema();
    let validator =
        Validator::new(&schema).with_config(ValidatorConfig::new().with_max_nodes(2));
    assert_eq!(
        validator.validate_source("{ dog { name nickname } }").unwrap_err(),
        ValidateError::NodeBudgetExceeded { limit: 2 }
    );
    assert!(validator.validate_source("{ dog }").is_ok());
}

#[test]
fn test_syntax_errors_are_findings() {
    let result = validate("{ dog { name ");
    assert!(!result.is_valid());
    assert!(result.internal_representation.is_none());
}
