//! Printing a schema as SDL.
//!
//! Definitions are emitted sorted by name, built-in scalars and directives
//! are omitted, and the `schema { ... }` block only appears when a root type
//! has an unconventional name.

use crate::error::SchemaError;
use crate::schema::*;
use boxql_syntax::printer::{format_float, write_string};
use indexmap::IndexMap;
use serde_json::Value as Json;
use std::fmt::Write;

/// Prints `schema` as SDL.
///
/// Fails only when an argument default cannot be expressed as a literal of
/// its declared type, which means the schema itself was built incorrectly.
pub fn print_schema(schema: &Schema) -> Result<String, SchemaError> {
    let printer = SchemaPrinter { schema };
    let mut blocks = Vec::new();

    if !schema.respects_root_name_conventions() {
        blocks.push(printer.schema_block());
    }

    let mut directives: Vec<_> = schema.directives.values().filter(|d| !d.is_built_in()).collect();
    directives.sort_by(|a, b| a.name.cmp(&b.name));
    for directive in directives {
        blocks.push(printer.directive(directive)?);
    }

    let mut types: Vec<_> = schema
        .types
        .values()
        .filter(|ty| !BUILT_IN_SCALARS.contains(&ty.name()))
        .collect();
    types.sort_by(|a, b| a.name().cmp(b.name()));
    for ty in types {
        blocks.push(printer.type_definition(ty)?);
    }

    let mut out = blocks.join("\n\n");
    out.push('\n');
    Ok(out)
}

struct SchemaPrinter<'s> {
    schema: &'s Schema,
}

impl SchemaPrinter<'_> {
    fn schema_block(&self) -> String {
        let mut out = String::from("schema {\n");
        for (label, name) in [
            ("query", &self.schema.query_type),
            ("mutation", &self.schema.mutation_type),
            ("subscription", &self.schema.subscription_type),
        ] {
            if let Some(name) = name {
                let _ = writeln!(out, "  {label}: {name}");
            }
        }
        out.push('}');
        out
    }

    fn type_definition(&self, ty: &TypeDef) -> Result<String, SchemaError> {
        let mut out = String::new();
        description(&mut out, ty.description(), "");

        match ty {
            TypeDef::Scalar(scalar) => {
                let _ = write!(out, "scalar {}", scalar.name);
            }
            TypeDef::Object(obj) => {
                let _ = write!(out, "type {}", obj.name);
                implements(&mut out, &obj.implements);
                self.fields(&mut out, &obj.fields)?;
            }
            TypeDef::Interface(iface) => {
                let _ = write!(out, "interface {}", iface.name);
                implements(&mut out, &iface.implements);
                self.fields(&mut out, &iface.fields)?;
            }
            TypeDef::Union(union) => {
                let mut members: Vec<_> = union.members.iter().map(String::as_str).collect();
                members.sort_unstable();
                let _ = write!(out, "union {} = {}", union.name, members.join(" | "));
            }
            TypeDef::Enum(enum_def) => {
                let _ = writeln!(out, "enum {} {{", enum_def.name);
                let mut values: Vec<_> = enum_def.values.iter().collect();
                values.sort_by(|a, b| a.name.cmp(&b.name));
                for value in values {
                    description(&mut out, value.description.as_deref(), "  ");
                    out.push_str("  ");
                    out.push_str(&value.name);
                    deprecated(&mut out, value.deprecation_reason.as_deref());
                    out.push('\n');
                }
                out.push('}');
            }
            TypeDef::InputObject(input) => {
                let _ = writeln!(out, "input {} {{", input.name);
                for field in sorted_values(&input.fields) {
                    description(&mut out, field.description.as_deref(), "  ");
                    out.push_str("  ");
                    self.input_value(&mut out, field)?;
                    out.push('\n');
                }
                out.push('}');
            }
        }

        Ok(out)
    }

    fn fields(&self, out: &mut String, fields: &IndexMap<String, FieldDef>) -> Result<(), SchemaError> {
        out.push_str(" {\n");
        for field in sorted_values(fields) {
            description(out, field.description.as_deref(), "  ");
            out.push_str("  ");
            out.push_str(&field.name);
            self.arguments(out, &field.arguments)?;
            let _ = write!(out, ": {}", field.ty);
            deprecated(out, field.deprecation_reason.as_deref());
            out.push('\n');
        }
        out.push('}');
        Ok(())
    }

    fn arguments(&self, out: &mut String, args: &IndexMap<String, InputFieldDef>) -> Result<(), SchemaError> {
        if args.is_empty() {
            return Ok(());
        }
        out.push('(');
        for (i, arg) in sorted_values(args).into_iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            self.input_value(out, arg)?;
        }
        out.push(')');
        Ok(())
    }

    fn input_value(&self, out: &mut String, value: &InputFieldDef) -> Result<(), SchemaError> {
        let _ = write!(out, "{}: {}", value.name, value.ty);
        if let Some(default) = &value.default_value {
            out.push_str(" = ");
            self.default_value(out, default, &value.ty)?;
        }
        Ok(())
    }

    fn directive(&self, directive: &DirectiveDefinition) -> Result<String, SchemaError> {
        let mut out = String::new();
        description(&mut out, directive.description.as_deref(), "");
        let _ = write!(out, "directive @{}", directive.name);
        self.arguments(&mut out, &directive.arguments)?;
        if directive.repeatable {
            out.push_str(" repeatable");
        }
        let locations: Vec<_> = directive.locations.iter().map(|l| l.as_str()).collect();
        let _ = write!(out, " on {}", locations.join(" | "));
        Ok(out)
    }

    /// Writes `value` as a literal of type `ty`.
    fn default_value(&self, out: &mut String, value: &Json, ty: &TypeRef) -> Result<(), SchemaError> {
        if value.is_null() {
            out.push_str("null");
            return Ok(());
        }

        let unexpected = || SchemaError::UnexpectedDefaultValue {
            ty: ty.to_string(),
            value: value.clone(),
        };

        match ty {
            TypeRef::NonNull(inner) => self.default_value(out, value, inner),
            TypeRef::List(inner) => match value {
                Json::Array(items) => {
                    out.push('[');
                    for (i, item) in items.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        self.default_value(out, item, inner)?;
                    }
                    out.push(']');
                    Ok(())
                }
                single => self.default_value(out, single, inner),
            },
            TypeRef::Named(name) => match self.schema.get_type(name) {
                Some(TypeDef::Scalar(_)) => scalar_literal(out, name, value).ok_or_else(unexpected),
                Some(TypeDef::Enum(enum_def)) => match value {
                    Json::String(s) if enum_def.has_value(s) => {
                        out.push_str(s);
                        Ok(())
                    }
                    _ => Err(unexpected()),
                },
                Some(TypeDef::InputObject(input)) => {
                    let Json::Object(fields) = value else {
                        return Err(unexpected());
                    };
                    out.push('{');
                    for (i, (key, field_value)) in fields.iter().enumerate() {
                        let field = input.fields.get(key).ok_or_else(unexpected)?;
                        if i > 0 {
                            out.push_str(", ");
                        }
                        let _ = write!(out, "{key}: ");
                        self.default_value(out, field_value, &field.ty)?;
                    }
                    out.push('}');
                    Ok(())
                }
                _ => Err(unexpected()),
            },
        }
    }
}

/// Writes a scalar literal, checking built-in scalars for the right shape.
fn scalar_literal(out: &mut String, scalar: &str, value: &Json) -> Option<()> {
    match (scalar, value) {
        ("Int", Json::Number(n)) if n.is_i64() => out.push_str(&n.to_string()),
        ("Float", Json::Number(n)) => out.push_str(&format_float(n.as_f64()?)),
        ("String" | "ID", Json::String(s)) => write_string(out, s),
        ("ID", Json::Number(n)) if n.is_i64() => out.push_str(&n.to_string()),
        ("Boolean", Json::Bool(b)) => out.push_str(if *b { "true" } else { "false" }),
        ("Int" | "Float" | "String" | "ID" | "Boolean", _) => return None,
        (_, custom) => json_literal(out, custom),
    }
    Some(())
}

/// Writes arbitrary JSON as a GraphQL literal (custom scalars).
fn json_literal(out: &mut String, value: &Json) {
    match value {
        Json::Null => out.push_str("null"),
        Json::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Json::Number(n) => out.push_str(&n.to_string()),
        Json::String(s) => write_string(out, s),
        Json::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                json_literal(out, item);
            }
            out.push(']');
        }
        Json::Object(fields) => {
            out.push('{');
            for (i, (key, item)) in fields.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "{key}: ");
                json_literal(out, item);
            }
            out.push('}');
        }
    }
}

fn sorted_values<V>(map: &IndexMap<String, V>) -> Vec<&V> {
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort_by(|(a, _), (b, _)| a.cmp(b));
    entries.into_iter().map(|(_, v)| v).collect()
}

fn implements(out: &mut String, interfaces: &[String]) {
    if interfaces.is_empty() {
        return;
    }
    let mut sorted: Vec<_> = interfaces.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    let _ = write!(out, " implements {}", sorted.join(" & "));
}

fn description(out: &mut String, description: Option<&str>, indent: &str) {
    let Some(text) = description else {
        return;
    };
    if text.contains('\n') {
        let _ = writeln!(out, "{indent}\"\"\"");
        for line in text.lines() {
            let _ = writeln!(out, "{indent}{line}");
        }
        let _ = writeln!(out, "{indent}\"\"\"");
    } else {
        out.push_str(indent);
        write_string(out, text);
        out.push('\n');
    }
}

fn deprecated(out: &mut String, reason: Option<&str>) {
    if let Some(reason) = reason {
        out.push_str(" @deprecated(reason: ");
        write_string(out, reason);
        out.push(')');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_print_sorted_sdl() {
        let schema = Schema::from_sdl(
            r#"
            type Query {
              search(term: String!, limit: Int = 10, order: Order = DESC): [Result]
              "The viewer"
              me: User
            }
            union Result = User | Post
            type User { name: String }
            type Post { title: String @deprecated(reason: "gone") }
            enum Order { DESC ASC }
            input Filter { order: Order = ASC, tags: [String] = "solo" }
            "#,
        )
        .unwrap();

        insta::assert_snapshot!(print_schema(&schema).unwrap().trim_end(), @r#"
        input Filter {
          order: Order = ASC
          tags: [String] = "solo"
        }

        enum Order {
          ASC
          DESC
        }

        type Post {
          title: String @deprecated(reason: "gone")
        }

        type Query {
          "The viewer"
          me: User
          search(limit: Int = 10, order: Order = DESC, term: String!): [Result]
        }

        union Result = Post | User

        type User {
          name: String
        }
        "#);
    }

    #[test]
    fn test_print_schema_block_for_unconventional_roots() {
        let schema = Schema::from_sdl("schema { query: Root } type Root { ok: Boolean }").unwrap();
        insta::assert_snapshot!(print_schema(&schema).unwrap().trim_end(), @r"
        schema {
          query: Root
        }

        type Root {
          ok: Boolean
        }
        ");
    }

    #[test]
    fn test_unexpected_default_value_is_fatal() {
        let schema = SchemaBuilder::new()
            .add_type(TypeDef::Enum(EnumDef {
                name: "Color".into(),
                description: None,
                values: vec![EnumValueDef {
                    name: "RED".into(),
                    description: None,
                    deprecation_reason: None,
                }],
            }))
            .add_type(TypeDef::Object(ObjectDef::new("Query").field(
                FieldDef::new("paint", TypeRef::named("Boolean")).argument(
                    InputFieldDef::new("color", TypeRef::named("Color"))
                        .with_default(serde_json::json!(7)),
                ),
            )))
            .build();

        let err = print_schema(&schema).unwrap_err();
        assert!(matches!(err, SchemaError::UnexpectedDefaultValue { ref ty, .. } if ty == "Color"));
    }
}
