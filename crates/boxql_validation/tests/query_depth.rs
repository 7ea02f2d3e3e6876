//! Query depth measured on the rewritten document.

use boxql_schema::Schema;
use boxql_validation::{IrOperation, Validator, ValidatorConfig, Variables};
use serde_json::json;

const SCHEMA: &str = r#"
    type Query { cheese(id: Int!): Cheese }
    type Cheese {
      id: Int
      flavor: String
      similarCheese(source: DairyAnimal!): Cheese
    }
    enum DairyAnimal { COW SHEEP }
"#;

const SIMPLE: &str = r#"
    query cheeses($isIncluded: Boolean = true) {
      # depth of 2
      cheese1: cheese(id: 1) {
        id
        flavor
      }

      # depth of 4
      cheese2: cheese(id: 2) @include(if: $isIncluded) {
        similarCheese(source: SHEEP) {
          ... on Cheese {
            similarCheese(source: SHEEP) {
              id
            }
          }
        }
      }
    }
"#;

const WITH_FRAGMENTS: &str = r#"
    {
      # depth of 2
      cheese1: cheese(id: 1) {
        id
        flavor
      }

      # depth of 4
      cheese2: cheese(id: 2) {
        ... cheeseFields1
      }
    }

    fragment cheeseFields1 on Cheese {
      similarCheese(source: COW) {
        id
        ... cheeseFields2
      }
    }

    fragment cheeseFields2 on Cheese {
      similarCheese(source: SHEEP) {
        id
      }
    }
"#;

fn operation(query: &str) -> IrOperation {
    let schema = Schema::from_sdl(SCHEMA).unwrap();
    let result = Validator::new(&schema).validate_source(query).unwrap();
    assert!(result.is_valid(), "{:?}", result.messages());
    let ir = result.internal_representation.unwrap();
    ir.operation(None).unwrap().clone()
}

#[test]
fn test_finds_the_max_depth() {
    let op = operation(SIMPLE);
    assert_eq!(op.depth(&op.default_variables()), 4);
}

#[test]
fn test_skipped_fields_dont_count() {
    let op = operation(SIMPLE);
    let variables: Variables = [("isIncluded".to_string(), json!(false))]
        .into_iter()
        .collect();
    assert_eq!(op.depth(&variables), 2);
}

#[test]
fn test_depth_through_fragments() {
    let op = operation(WITH_FRAGMENTS);
    assert_eq!(op.depth(&Variables::new()), 4);
}

#[test]
fn test_max_depth_rule() {
    let schema = Schema::from_sdl(SCHEMA).unwrap();

    let strict = Validator::new(&schema).with_config(ValidatorConfig::new().with_max_depth(3));
    let result = strict.validate_source(WITH_FRAGMENTS).unwrap();
    assert_eq!(
        result.messages(),
        ["Query has depth of 4, which exceeds max depth of 3"]
    );
    assert!(result.internal_representation.is_none());

    let relaxed = Validator::new(&schema).with_config(ValidatorConfig::new().with_max_depth(4));
    assert!(relaxed.validate_source(WITH_FRAGMENTS).unwrap().is_valid());
}
