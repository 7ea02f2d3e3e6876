//! Argument coercion.
//!
//! Literal arguments, variables and schema defaults are merged and checked
//! against the declared input types before a resolver sees them.

use crate::error::ResolverError;
use crate::resolver::ResolverArgs;
use boxql_schema::{FieldDef, InputFieldDef, Schema, TypeDef, TypeRef};
use boxql_validation::{IrValue, Variables};
use indexmap::IndexMap;
use serde_json::{Map, Value as Json};

/// Builds the resolver arguments for one field.
///
/// An argument bound to a variable the request did not provide counts as
/// absent, so the argument's default applies.
pub fn coerce_arguments(
    schema: &Schema,
    definition: &FieldDef,
    arguments: &IndexMap<String, IrValue>,
    variables: &Variables,
) -> Result<ResolverArgs, ResolverError> {
    let mut args = ResolverArgs::new();
    for (name, argument) in &definition.arguments {
        let provided = match arguments.get(name) {
            Some(IrValue::Variable(variable)) => variables.get(variable).cloned(),
            Some(value) => Some(value.resolve(variables)),
            None => None,
        };
        if let Some(value) = coerce_input(schema, argument, provided)
            .map_err(|message| ResolverError::ArgumentParseError(name.clone(), message))?
        {
            args.set(name.clone(), value);
        }
    }
    Ok(args)
}

/// Coerces one argument or input field; `None` means it stays absent.
fn coerce_input(
    schema: &Schema,
    input: &InputFieldDef,
    provided: Option<Json>,
) -> Result<Option<Json>, String> {
    match provided.or_else(|| input.default_value.clone()) {
        Some(value) => coerce_value(schema, &input.ty, value).map(Some),
        None if input.ty.is_non_null() => Err(format!("expected a value of type {}", input.ty)),
        None => Ok(None),
    }
}

/// Coerces `value` to `ty`. A single value given for a list becomes a
/// one-element list.
pub fn coerce_value(schema: &Schema, ty: &TypeRef, value: Json) -> Result<Json, String> {
    match ty {
        TypeRef::NonNull(inner) => {
            if value.is_null() {
                Err(format!("expected {ty}, found null"))
            } else {
                coerce_value(schema, inner, value)
            }
        }
        _ if value.is_null() => Ok(Json::Null),
        TypeRef::List(item) => match value {
            Json::Array(items) => items
                .into_iter()
                .map(|item_value| coerce_value(schema, item, item_value))
                .collect::<Result<Vec<_>, _>>()
                .map(Json::Array),
            single => Ok(Json::Array(vec![coerce_value(schema, item, single)?])),
        },
        TypeRef::Named(name) => coerce_named(schema, name, value),
    }
}

fn coerce_named(schema: &Schema, name: &str, value: Json) -> Result<Json, String> {
    match schema.get_type(name) {
        Some(TypeDef::Enum(def)) => match value.as_str() {
            Some(variant) if def.has_value(variant) => Ok(value),
            _ => Err(format!("expected {name}, found {value}")),
        },
        Some(TypeDef::InputObject(def)) => {
            let Json::Object(mut fields) = value else {
                return Err(format!("expected {name}, found {value}"));
            };
            if let Some(unknown) = fields.keys().find(|key| !def.fields.contains_key(*key)) {
                return Err(format!("field '{unknown}' is not defined by {name}"));
            }
            let mut coerced = Map::new();
            for (field_name, field) in &def.fields {
                let provided = fields.remove(field_name);
                if let Some(value) = coerce_input(schema, field, provided)
                    .map_err(|message| format!("{name}.{field_name}: {message}"))?
                {
                    coerced.insert(field_name.clone(), value);
                }
            }
            Ok(Json::Object(coerced))
        }
        Some(TypeDef::Scalar(_)) | None => coerce_scalar(name, value),
        Some(_) => Err(format!("{name} is not an input type")),
    }
}

fn coerce_scalar(name: &str, value: Json) -> Result<Json, String> {
    let ok = match name {
        "Int" => value
            .as_i64()
            .is_some_and(|n| i32::try_from(n).is_ok()),
        "Float" => value.is_number(),
        "String" => value.is_string(),
        "Boolean" => value.is_boolean(),
        "ID" => {
            if let Some(n) = value.as_i64() {
                return Ok(Json::String(n.to_string()));
            }
            value.is_string()
        }
        _ => true,
    };
    if ok {
        Ok(value)
    } else {
        Err(format!("expected {name}, found {value}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SDL: &str = r#"
        type Query {
            search(
                term: String!
                limit: Int = 10
                tags: [String]
                color: Color
                filter: Filter
            ): [String]
        }
        enum Color { RED GREEN }
        input Filter { minAge: Int = 18 name: String! }
    "#;

    fn coerce(arguments: &[(&str, IrValue)], variables: Json) -> Result<ResolverArgs, ResolverError> {
        let schema = Schema::from_sdl(SDL).unwrap();
        let definition = schema.get_field("Query", "search").unwrap();
        let arguments = arguments
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();
        let Json::Object(variables) = variables else {
            panic!("variables must be an object");
        };
        coerce_arguments(&schema, definition, &arguments, &variables)
    }

    #[test]
    fn test_defaults_and_variables() {
        let args = coerce(
            &[
                ("term", IrValue::Variable("term".into())),
                ("limit", IrValue::Variable("missing".into())),
            ],
            json!({"term": "rust"}),
        )
        .unwrap();
        assert_eq!(args.get("term"), Some(&json!("rust")));
        assert_eq!(args.get("limit"), Some(&json!(10)));
        assert_eq!(args.get("tags"), None);
    }

    #[test]
    fn test_single_value_becomes_list() {
        let args = coerce(
            &[
                ("term", IrValue::String("x".into())),
                ("tags", IrValue::String("new".into())),
            ],
            json!({}),
        )
        .unwrap();
        assert_eq!(args.get("tags"), Some(&json!(["new"])));
    }

    #[test]
    fn test_input_objects_and_enums() {
        let args = coerce(
            &[
                ("term", IrValue::String("x".into())),
                ("color", IrValue::Enum("RED".into())),
                (
                    "filter",
                    IrValue::Object(IndexMap::from([(
                        "name".to_string(),
                        IrValue::String("rex".into()),
                    )])),
                ),
            ],
            json!({}),
        )
        .unwrap();
        assert_eq!(args.get("color"), Some(&json!("RED")));
        assert_eq!(args.get("filter"), Some(&json!({"minAge": 18, "name": "rex"})));
    }

    #[test]
    fn test_invalid_arguments() {
        assert_eq!(
            coerce(&[], json!({})),
            Err(ResolverError::ArgumentParseError(
                "term".into(),
                "expected a value of type String!".into()
            ))
        );
        assert!(coerce(
            &[
                ("term", IrValue::String("x".into())),
                ("color", IrValue::Enum("BLUE".into())),
            ],
            json!({}),
        )
        .is_err());
        assert!(coerce(
            &[("term", IrValue::String("x".into())), ("limit", IrValue::Int(1 << 40))],
            json!({}),
        )
        .is_err());
    }
}
