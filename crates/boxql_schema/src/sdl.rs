//! Building a schema from SDL source.

use crate::error::SchemaError;
use crate::schema::*;
use boxql_core::Interner;
use boxql_syntax::ast::{self, Definition, TypeDefinition};
use boxql_syntax::OperationType;
use indexmap::IndexMap;

impl Schema {
    /// Builds a schema from SDL.
    ///
    /// Without a `schema { ... }` block the root types default to the
    /// conventionally named `Query`, `Mutation` and `Subscription` objects.
    pub fn from_sdl(source: &str) -> Result<Schema, SchemaError> {
        let interner = Interner::new();
        let result = boxql_syntax::parse(source, &interner);
        if result.diagnostics.has_errors() {
            return Err(SchemaError::Syntax(result.diagnostics.into_vec()));
        }

        let lower = Lowering { interner: &interner };
        let mut builder = SchemaBuilder::new();
        let mut roots: Vec<(OperationType, String)> = Vec::new();

        for definition in &result.document.definitions {
            match definition {
                Definition::Schema(schema) => {
                    for op in &schema.operations {
                        roots.push((op.operation, lower.name(op.type_name)));
                    }
                }
                Definition::Type(ty) => {
                    let type_def = lower.type_definition(ty);
                    if builder.has_type(type_def.name())
                        && !BUILT_IN_SCALARS.contains(&type_def.name())
                    {
                        return Err(SchemaError::DuplicateType(type_def.name().to_string()));
                    }
                    builder = builder.add_type(type_def);
                }
                Definition::Directive(directive) => {
                    builder = builder.add_directive(lower.directive_definition(directive));
                }
                Definition::Operation(_) | Definition::Fragment(_) => {
                    return Err(SchemaError::ExecutableDefinition);
                }
            }
        }

        for (operation, name) in roots {
            builder = match operation {
                OperationType::Query => builder.query_type(name),
                OperationType::Mutation => builder.mutation_type(name),
                OperationType::Subscription => builder.subscription_type(name),
            };
        }

        let schema = builder.build();
        check_references(&schema)?;

        tracing::debug!(
            types = schema.types.len(),
            directives = schema.directives.len(),
            "built schema from SDL"
        );
        Ok(schema)
    }
}

struct Lowering<'i> {
    interner: &'i Interner,
}

impl Lowering<'_> {
    fn name(&self, name: ast::Name) -> String {
        self.interner.get(name.value)
    }

    fn description(description: Option<&ast::Description<'_>>) -> Option<String> {
        description.map(|d| d.value.to_string())
    }

    fn type_definition(&self, ty: &TypeDefinition<'_>) -> TypeDef {
        match ty {
            TypeDefinition::Object(def) => TypeDef::Object(ObjectDef {
                name: self.name(def.name),
                description: Self::description(def.description.as_ref()),
                fields: self.fields(&def.fields),
                implements: def.implements.iter().map(|n| self.name(*n)).collect(),
            }),
            TypeDefinition::Interface(def) => TypeDef::Interface(InterfaceDef {
                name: self.name(def.name),
                description: Self::description(def.description.as_ref()),
                fields: self.fields(&def.fields),
                implements: def.implements.iter().map(|n| self.name(*n)).collect(),
            }),
            TypeDefinition::Union(def) => TypeDef::Union(UnionDef {
                name: self.name(def.name),
                description: Self::description(def.description.as_ref()),
                members: def.members.iter().map(|n| self.name(*n)).collect(),
            }),
            TypeDefinition::Enum(def) => TypeDef::Enum(EnumDef {
                name: self.name(def.name),
                description: Self::description(def.description.as_ref()),
                values: def
                    .values
                    .iter()
                    .map(|v| EnumValueDef {
                        name: self.name(v.name),
                        description: Self::description(v.description.as_ref()),
                        deprecation_reason: self.deprecation(&v.directives),
                    })
                    .collect(),
            }),
            TypeDefinition::Input(def) => TypeDef::InputObject(InputObjectDef {
                name: self.name(def.name),
                description: Self::description(def.description.as_ref()),
                fields: self.input_values(&def.fields),
            }),
            TypeDefinition::Scalar(def) => TypeDef::Scalar(ScalarDef {
                name: self.name(def.name),
                description: Self::description(def.description.as_ref()),
            }),
        }
    }

    fn fields(&self, fields: &[ast::FieldDefinition<'_>]) -> IndexMap<String, FieldDef> {
        fields
            .iter()
            .map(|field| {
                let name = self.name(field.name);
                let def = FieldDef {
                    name: name.clone(),
                    description: Self::description(field.description.as_ref()),
                    ty: self.type_ref(&field.ty),
                    arguments: self.input_values(&field.arguments),
                    deprecation_reason: self.deprecation(&field.directives),
                };
                (name, def)
            })
            .collect()
    }

    fn input_values(&self, values: &[ast::InputValueDefinition<'_>]) -> IndexMap<String, InputFieldDef> {
        values
            .iter()
            .map(|value| {
                let name = self.name(value.name);
                let def = InputFieldDef {
                    name: name.clone(),
                    description: Self::description(value.description.as_ref()),
                    ty: self.type_ref(&value.ty),
                    default_value: value.default_value.as_ref().map(|v| self.const_value(v)),
                };
                (name, def)
            })
            .collect()
    }

    fn directive_definition(&self, def: &ast::DirectiveDefinitionNode<'_>) -> DirectiveDefinition {
        DirectiveDefinition {
            name: self.name(def.name),
            description: Self::description(def.description.as_ref()),
            arguments: self.input_values(&def.arguments),
            locations: def.locations.clone(),
            repeatable: def.repeatable,
        }
    }

    fn deprecation(&self, directives: &[ast::Directive]) -> Option<String> {
        let directive = directives
            .iter()
            .find(|d| self.interner.get(d.name.value) == "deprecated")?;
        let reason = directive
            .arguments
            .iter()
            .find(|arg| self.interner.get(arg.name.value) == "reason")
            .and_then(|arg| match &arg.value {
                ast::Value::String(s, _) => Some(s.clone()),
                _ => None,
            });
        Some(reason.unwrap_or_else(|| "No longer supported".to_string()))
    }

    fn type_ref(&self, ty: &ast::Type) -> TypeRef {
        match ty {
            ast::Type::Named(named) => TypeRef::Named(self.interner.get(named.name)),
            ast::Type::List(inner, _) => TypeRef::list(self.type_ref(inner)),
            ast::Type::NonNull(inner, _) => TypeRef::non_null(self.type_ref(inner)),
        }
    }

    /// Converts a constant literal into JSON.
    fn const_value(&self, value: &ast::Value) -> serde_json::Value {
        use serde_json::Value as Json;
        match value {
            ast::Value::Int(n, _) => Json::from(*n),
            ast::Value::Float(n, _) => Json::from(*n),
            ast::Value::String(s, _) => Json::from(s.as_str()),
            ast::Value::Boolean(b, _) => Json::from(*b),
            ast::Value::Null(_) | ast::Value::Variable(_) => Json::Null,
            ast::Value::Enum(name) => Json::from(self.name(*name)),
            ast::Value::List(items, _) => {
                Json::Array(items.iter().map(|item| self.const_value(item)).collect())
            }
            ast::Value::Object(fields, _) => Json::Object(
                fields
                    .iter()
                    .map(|(name, value)| (self.name(*name), self.const_value(value)))
                    .collect(),
            ),
        }
    }
}

/// Verifies every named type reference resolves and roots are objects.
fn check_references(schema: &Schema) -> Result<(), SchemaError> {
    let require = |name: &str, referenced_by: &str| {
        if schema.get_type(name).is_some() {
            Ok(())
        } else {
            Err(SchemaError::UnknownType {
                name: name.to_string(),
                referenced_by: referenced_by.to_string(),
            })
        }
    };

    for (type_name, ty) in schema.types() {
        match ty {
            TypeDef::Object(ObjectDef {
                fields, implements, ..
            })
            | TypeDef::Interface(InterfaceDef {
                fields, implements, ..
            }) => {
                for interface in implements {
                    require(interface, type_name)?;
                }
                for field in fields.values() {
                    let owner = format!("{type_name}.{}", field.name);
                    require(field.ty.inner_name(), &owner)?;
                    for arg in field.arguments.values() {
                        require(arg.ty.inner_name(), &owner)?;
                    }
                }
            }
            TypeDef::Union(union) => {
                for member in &union.members {
                    require(member, type_name)?;
                }
            }
            TypeDef::InputObject(input) => {
                for field in input.fields.values() {
                    require(field.ty.inner_name(), type_name)?;
                }
            }
            TypeDef::Scalar(_) | TypeDef::Enum(_) => {}
        }
    }

    for (operation, name) in [
        ("query", &schema.query_type),
        ("mutation", &schema.mutation_type),
        ("subscription", &schema.subscription_type),
    ] {
        if let Some(name) = name {
            if !matches!(schema.get_type(name), Some(TypeDef::Object(_))) {
                return Err(SchemaError::InvalidRootType {
                    name: name.clone(),
                    operation,
                });
            }
        }
    }

    Ok(())
}
