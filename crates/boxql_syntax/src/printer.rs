//! GraphQL literal printing.
//!
//! Values print in the compact single-line form used in error messages and
//! argument canonicalisation: `$var`, `1`, `"s"`, `[1, 2]`, `{a: 1}`.

use crate::ast::{Type, Value};
use boxql_core::Interner;
use std::fmt::Write;

/// Prints a value literal.
#[must_use]
pub fn print_value(value: &Value, interner: &Interner) -> String {
    let mut out = String::new();
    write_value(&mut out, value, interner);
    out
}

/// Prints a type reference: `[User!]!`.
#[must_use]
pub fn print_type(ty: &Type, interner: &Interner) -> String {
    let mut out = String::new();
    write_type(&mut out, ty, interner);
    out
}

fn write_value(out: &mut String, value: &Value, interner: &Interner) {
    match value {
        Value::Variable(name) => {
            out.push('$');
            out.push_str(&interner.get(name.value));
        }
        Value::Int(n, _) => {
            let _ = write!(out, "{n}");
        }
        Value::Float(n, _) => out.push_str(&format_float(*n)),
        Value::String(s, _) => write_string(out, s),
        Value::Boolean(b, _) => out.push_str(if *b { "true" } else { "false" }),
        Value::Null(_) => out.push_str("null"),
        Value::Enum(name) => out.push_str(&interner.get(name.value)),
        Value::List(items, _) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(out, item, interner);
            }
            out.push(']');
        }
        Value::Object(fields, _) => {
            out.push('{');
            for (i, (name, value)) in fields.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&interner.get(name.value));
                out.push_str(": ");
                write_value(out, value, interner);
            }
            out.push('}');
        }
    }
}

fn write_type(out: &mut String, ty: &Type, interner: &Interner) {
    match ty {
        Type::Named(named) => out.push_str(&interner.get(named.name)),
        Type::List(inner, _) => {
            out.push('[');
            write_type(out, inner, interner);
            out.push(']');
        }
        Type::NonNull(inner, _) => {
            write_type(out, inner, interner);
            out.push('!');
        }
    }
}

/// Prints a float so it always reads back as a float literal.
#[must_use]
pub fn format_float(n: f64) -> String {
    let text = n.to_string();
    if text.contains(['.', 'e', 'E']) || !n.is_finite() {
        text
    } else {
        format!("{text}.0")
    }
}

/// Writes a double-quoted string literal with GraphQL escapes.
pub fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Definition, Selection};
    use crate::parse;

    fn first_argument(source: &str) -> String {
        let interner = Interner::new();
        let result = parse(source, &interner);
        let Some(Definition::Operation(op)) = result.document.definitions.first() else {
            panic!("expected operation");
        };
        let Selection::Field(field) = &op.selection_set.selections[0] else {
            panic!("expected field");
        };
        print_value(&field.arguments[0].value, &interner)
    }

    #[test]
    fn test_print_scalars() {
        insta::assert_snapshot!(first_argument("{ f(x: 1) }"), @"1");
        insta::assert_snapshot!(first_argument("{ f(x: -2.5) }"), @"-2.5");
        insta::assert_snapshot!(first_argument("{ f(x: 3e2) }"), @"300.0");
        insta::assert_snapshot!(first_argument(r#"{ f(x: "a\"b") }"#), @r#""a\"b""#);
        insta::assert_snapshot!(first_argument("{ f(x: RED) }"), @"RED");
        insta::assert_snapshot!(first_argument("{ f(x: null) }"), @"null");
    }

    #[test]
    fn test_print_variables_and_composites() {
        insta::assert_snapshot!(first_argument("{ f(x: $id) }"), @"$id");
        insta::assert_snapshot!(
            first_argument("{ f(x: [1, 2, {a: true, b: [$v]}]) }"),
            @"[1, 2, {a: true, b: [$v]}]"
        );
    }

    #[test]
    fn test_print_type() {
        let interner = Interner::new();
        let result = parse("query($ids: [ID!]!) { f }", &interner);
        let Some(Definition::Operation(op)) = result.document.definitions.first() else {
            panic!("expected operation");
        };
        insta::assert_snapshot!(print_type(&op.variables[0].ty, &interner), @"[ID!]!");
    }
}
