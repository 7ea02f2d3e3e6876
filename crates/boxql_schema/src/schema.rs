//! Schema definition for boxql.
//!
//! The schema is the read-only lookup the validator and executor consume:
//! `get_type`, `get_field`, `possible_types` and the root operation types.

use boxql_syntax::{DirectiveLocation, OperationType};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Names of the built-in scalars.
pub const BUILT_IN_SCALARS: [&str; 5] = ["Int", "Float", "String", "Boolean", "ID"];

/// Names of the built-in directives.
pub const BUILT_IN_DIRECTIVES: [&str; 3] = ["skip", "include", "deprecated"];

/// The meta field available on every composite type.
pub const TYPENAME_FIELD: &str = "__typename";

/// A GraphQL schema.
#[derive(Debug, Clone)]
pub struct Schema {
    pub query_type: Option<String>,
    pub mutation_type: Option<String>,
    pub subscription_type: Option<String>,
    pub types: IndexMap<String, TypeDef>,
    pub directives: IndexMap<String, DirectiveDefinition>,
    possible_types: HashMap<String, Vec<String>>,
    typename_field: FieldDef,
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            query_type: None,
            mutation_type: None,
            subscription_type: None,
            types: IndexMap::new(),
            directives: IndexMap::new(),
            possible_types: HashMap::new(),
            typename_field: FieldDef::new(TYPENAME_FIELD, TypeRef::non_null(TypeRef::named("String"))),
        }
    }
}

impl Schema {
    /// Creates a new empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets a type by name.
    pub fn get_type(&self, name: &str) -> Option<&TypeDef> {
        self.types.get(name)
    }

    /// Gets a field of an object or interface type.
    ///
    /// `__typename` resolves on every composite type, unions included.
    pub fn get_field(&self, type_name: &str, field_name: &str) -> Option<&FieldDef> {
        let ty = self.get_type(type_name)?;
        if field_name == TYPENAME_FIELD && ty.is_composite() {
            return Some(&self.typename_field);
        }
        ty.fields()?.get(field_name)
    }

    /// Gets a directive definition by name.
    pub fn get_directive(&self, name: &str) -> Option<&DirectiveDefinition> {
        self.directives.get(name)
    }

    /// Returns the concrete object types a value of `name` can be.
    ///
    /// Objects resolve to themselves, interfaces to their implementors and
    /// unions to their members. Non-composite and unknown names yield nothing.
    pub fn possible_types(&self, name: &str) -> &[String] {
        self.possible_types.get(name).map_or(&[], Vec::as_slice)
    }

    /// Returns true if `object` is one of the possible types of `abstract_type`.
    pub fn is_possible_type(&self, abstract_type: &str, object: &str) -> bool {
        self.possible_types(abstract_type).iter().any(|t| t == object)
    }

    /// Returns the name of the root type for an operation kind.
    pub fn root_type_name(&self, operation: OperationType) -> Option<&str> {
        match operation {
            OperationType::Query => self.query_type.as_deref(),
            OperationType::Mutation => self.mutation_type.as_deref(),
            OperationType::Subscription => self.subscription_type.as_deref(),
        }
    }

    /// Returns the root object type for an operation kind.
    pub fn root_type(&self, operation: OperationType) -> Option<&ObjectDef> {
        match self.get_type(self.root_type_name(operation)?)? {
            TypeDef::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Returns true if every root type uses its conventional name.
    pub fn respects_root_name_conventions(&self) -> bool {
        [
            (&self.query_type, "Query"),
            (&self.mutation_type, "Mutation"),
            (&self.subscription_type, "Subscription"),
        ]
        .iter()
        .all(|(actual, conventional)| actual.as_deref().map_or(true, |name| name == *conventional))
    }

    /// Returns all types.
    pub fn types(&self) -> impl Iterator<Item = (&String, &TypeDef)> {
        self.types.iter()
    }

    fn index_possible_types(&mut self) {
        let mut possible: HashMap<String, Vec<String>> = HashMap::new();
        for (name, ty) in &self.types {
            match ty {
                TypeDef::Object(obj) => {
                    possible.entry(name.clone()).or_default().push(name.clone());
                    for interface in &obj.implements {
                        possible.entry(interface.clone()).or_default().push(name.clone());
                    }
                }
                TypeDef::Union(union) => {
                    let members = union
                        .members
                        .iter()
                        .filter(|m| matches!(self.types.get(*m), Some(TypeDef::Object(_))))
                        .cloned()
                        .collect();
                    possible.insert(name.clone(), members);
                }
                TypeDef::Interface(_) => {
                    possible.entry(name.clone()).or_default();
                }
                _ => {}
            }
        }
        self.possible_types = possible;
    }
}

/// A type definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TypeDef {
    Scalar(ScalarDef),
    Object(ObjectDef),
    Interface(InterfaceDef),
    Union(UnionDef),
    Enum(EnumDef),
    InputObject(InputObjectDef),
}

impl TypeDef {
    /// The type's name.
    pub fn name(&self) -> &str {
        match self {
            Self::Scalar(s) => &s.name,
            Self::Object(o) => &o.name,
            Self::Interface(i) => &i.name,
            Self::Union(u) => &u.name,
            Self::Enum(e) => &e.name,
            Self::InputObject(i) => &i.name,
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Scalar(s) => s.description.as_deref(),
            Self::Object(o) => o.description.as_deref(),
            Self::Interface(i) => i.description.as_deref(),
            Self::Union(u) => u.description.as_deref(),
            Self::Enum(e) => e.description.as_deref(),
            Self::InputObject(i) => i.description.as_deref(),
        }
    }

    /// Output fields of objects and interfaces.
    pub fn fields(&self) -> Option<&IndexMap<String, FieldDef>> {
        match self {
            Self::Object(o) => Some(&o.fields),
            Self::Interface(i) => Some(&i.fields),
            _ => None,
        }
    }

    /// Objects, interfaces and unions.
    pub fn is_composite(&self) -> bool {
        matches!(self, Self::Object(_) | Self::Interface(_) | Self::Union(_))
    }

    /// Interfaces and unions.
    pub fn is_abstract(&self) -> bool {
        matches!(self, Self::Interface(_) | Self::Union(_))
    }

    /// Scalars and enums.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Scalar(_) | Self::Enum(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object(_))
    }

    /// Scalars, enums and input objects.
    pub fn is_input(&self) -> bool {
        matches!(self, Self::Scalar(_) | Self::Enum(_) | Self::InputObject(_))
    }
}

/// Scalar type definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalarDef {
    pub name: String,
    pub description: Option<String>,
}

impl ScalarDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }
}

/// Object type definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectDef {
    pub name: String,
    pub description: Option<String>,
    pub fields: IndexMap<String, FieldDef>,
    pub implements: Vec<String>,
}

impl ObjectDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields: IndexMap::new(),
            implements: Vec::new(),
        }
    }

    /// Adds a field.
    #[must_use]
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    /// Declares an implemented interface.
    #[must_use]
    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.implements.push(interface.into());
        self
    }
}

/// Interface type definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceDef {
    pub name: String,
    pub description: Option<String>,
    pub fields: IndexMap<String, FieldDef>,
    pub implements: Vec<String>,
}

impl InterfaceDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields: IndexMap::new(),
            implements: Vec::new(),
        }
    }

    #[must_use]
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }
}

/// Union type definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnionDef {
    pub name: String,
    pub description: Option<String>,
    pub members: Vec<String>,
}

impl UnionDef {
    pub fn new<I, S>(name: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            description: None,
            members: members.into_iter().map(Into::into).collect(),
        }
    }
}

/// Enum type definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumDef {
    pub name: String,
    pub description: Option<String>,
    pub values: Vec<EnumValueDef>,
}

impl EnumDef {
    /// Returns true if `value` is one of the enum's values.
    pub fn has_value(&self, value: &str) -> bool {
        self.values.iter().any(|v| v.name == value)
    }
}

/// Enum value definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumValueDef {
    pub name: String,
    pub description: Option<String>,
    pub deprecation_reason: Option<String>,
}

/// Input object type definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputObjectDef {
    pub name: String,
    pub description: Option<String>,
    pub fields: IndexMap<String, InputFieldDef>,
}

/// Field definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub description: Option<String>,
    pub ty: TypeRef,
    pub arguments: IndexMap<String, InputFieldDef>,
    pub deprecation_reason: Option<String>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            description: None,
            ty,
            arguments: IndexMap::new(),
            deprecation_reason: None,
        }
    }

    /// Adds an argument.
    #[must_use]
    pub fn argument(mut self, argument: InputFieldDef) -> Self {
        self.arguments.insert(argument.name.clone(), argument);
        self
    }
}

/// Input field definition, used for arguments and input object fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputFieldDef {
    pub name: String,
    pub description: Option<String>,
    pub ty: TypeRef,
    pub default_value: Option<serde_json::Value>,
}

impl InputFieldDef {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            description: None,
            ty,
            default_value: None,
        }
    }

    #[must_use]
    pub fn with_default(mut self, value: serde_json::Value) -> Self {
        self.default_value = Some(value);
        self
    }
}

/// Type reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeRef {
    Named(String),
    List(Box<TypeRef>),
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn list(inner: TypeRef) -> Self {
        Self::List(Box::new(inner))
    }

    pub fn non_null(inner: TypeRef) -> Self {
        Self::NonNull(Box::new(inner))
    }

    /// The innermost named type.
    pub fn inner_name(&self) -> &str {
        match self {
            Self::Named(name) => name,
            Self::List(inner) | Self::NonNull(inner) => inner.inner_name(),
        }
    }

    pub fn is_non_null(&self) -> bool {
        matches!(self, Self::NonNull(_))
    }

    /// Strips a non-null wrapper, if any.
    pub fn nullable(&self) -> &TypeRef {
        match self {
            Self::NonNull(inner) => inner,
            other => other,
        }
    }

    /// Returns the item type if this is a (possibly non-null) list.
    pub fn list_item(&self) -> Option<&TypeRef> {
        match self.nullable() {
            Self::List(inner) => Some(inner),
            _ => None,
        }
    }
}

impl std::fmt::Display for TypeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::List(inner) => write!(f, "[{inner}]"),
            Self::NonNull(inner) => write!(f, "{inner}!"),
        }
    }
}

/// Directive definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectiveDefinition {
    pub name: String,
    pub description: Option<String>,
    pub arguments: IndexMap<String, InputFieldDef>,
    pub locations: Vec<DirectiveLocation>,
    pub repeatable: bool,
}

impl DirectiveDefinition {
    pub fn is_built_in(&self) -> bool {
        BUILT_IN_DIRECTIVES.contains(&self.name.as_str())
    }
}

/// Schema builder.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    /// Creates a new schema builder with the built-in scalars and directives.
    pub fn new() -> Self {
        let mut builder = Self::default();
        for name in BUILT_IN_SCALARS {
            builder.schema.types.insert(
                name.to_string(),
                TypeDef::Scalar(ScalarDef {
                    name: name.to_string(),
                    description: Some(format!("Built-in {name} scalar")),
                }),
            );
        }

        let condition = |name: &str, description: &str| DirectiveDefinition {
            name: name.to_string(),
            description: Some(description.to_string()),
            arguments: IndexMap::from([(
                "if".to_string(),
                InputFieldDef::new("if", TypeRef::non_null(TypeRef::named("Boolean"))),
            )]),
            locations: vec![
                DirectiveLocation::Field,
                DirectiveLocation::FragmentSpread,
                DirectiveLocation::InlineFragment,
            ],
            repeatable: false,
        };
        builder = builder
            .add_directive(condition("skip", "Skipped when true."))
            .add_directive(condition("include", "Included when true."))
            .add_directive(DirectiveDefinition {
                name: "deprecated".to_string(),
                description: Some("Marks an element as no longer supported.".to_string()),
                arguments: IndexMap::from([(
                    "reason".to_string(),
                    InputFieldDef::new("reason", TypeRef::named("String"))
                        .with_default(serde_json::Value::from("No longer supported")),
                )]),
                locations: vec![
                    DirectiveLocation::FieldDefinition,
                    DirectiveLocation::EnumValue,
                ],
                repeatable: false,
            });
        builder
    }

    /// Sets the query type.
    pub fn query_type(mut self, name: impl Into<String>) -> Self {
        self.schema.query_type = Some(name.into());
        self
    }

    /// Sets the mutation type.
    pub fn mutation_type(mut self, name: impl Into<String>) -> Self {
        self.schema.mutation_type = Some(name.into());
        self
    }

    /// Sets the subscription type.
    pub fn subscription_type(mut self, name: impl Into<String>) -> Self {
        self.schema.subscription_type = Some(name.into());
        self
    }

    /// Adds a type.
    pub fn add_type(mut self, type_def: TypeDef) -> Self {
        self.schema.types.insert(type_def.name().to_string(), type_def);
        self
    }

    /// Returns true if a type with this name was added.
    pub fn has_type(&self, name: &str) -> bool {
        self.schema.types.contains_key(name)
    }

    /// Adds a directive definition.
    pub fn add_directive(mut self, directive: DirectiveDefinition) -> Self {
        self.schema
            .directives
            .insert(directive.name.clone(), directive);
        self
    }

    /// Builds the schema.
    ///
    /// Root types left unset default to `Query`, `Mutation` and
    /// `Subscription` when object types with those names exist.
    pub fn build(mut self) -> Schema {
        let conventional = |schema: &Schema, name: &str| {
            matches!(schema.types.get(name), Some(TypeDef::Object(_))).then(|| name.to_string())
        };
        if self.schema.query_type.is_none() {
            self.schema.query_type = conventional(&self.schema, "Query");
        }
        if self.schema.mutation_type.is_none() {
            self.schema.mutation_type = conventional(&self.schema, "Mutation");
        }
        if self.schema.subscription_type.is_none() {
            self.schema.subscription_type = conventional(&self.schema, "Subscription");
        }

        self.schema.index_possible_types();
        self.schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pets() -> Schema {
        SchemaBuilder::new()
            .add_type(TypeDef::Interface(
                InterfaceDef::new("Pet").field(FieldDef::new("name", TypeRef::named("String"))),
            ))
            .add_type(TypeDef::Object(
                ObjectDef::new("Dog")
                    .implements("Pet")
                    .field(FieldDef::new("name", TypeRef::named("String")))
                    .field(FieldDef::new("barks", TypeRef::named("Boolean"))),
            ))
            .add_type(TypeDef::Object(
                ObjectDef::new("Cat")
                    .implements("Pet")
                    .field(FieldDef::new("name", TypeRef::named("String"))),
            ))
            .add_type(TypeDef::Union(UnionDef::new("CatOrDog", ["Cat", "Dog"])))
            .add_type(TypeDef::Object(ObjectDef::new("Query").field(FieldDef::new(
                "pet",
                TypeRef::named("Pet"),
            ))))
            .build()
    }

    #[test]
    fn test_conventional_root_types() {
        let schema = pets();
        assert_eq!(schema.root_type_name(OperationType::Query), Some("Query"));
        assert!(schema.root_type(OperationType::Mutation).is_none());
        assert!(schema.respects_root_name_conventions());
    }

    #[test]
    fn test_possible_types() {
        let schema = pets();
        assert_eq!(schema.possible_types("Pet"), ["Dog", "Cat"]);
        assert_eq!(schema.possible_types("CatOrDog"), ["Cat", "Dog"]);
        assert_eq!(schema.possible_types("Dog"), ["Dog"]);
        assert!(schema.possible_types("String").is_empty());
        assert!(schema.is_possible_type("Pet", "Cat"));
    }

    #[test]
    fn test_get_field_and_typename() {
        let schema = pets();
        assert!(schema.get_field("Dog", "barks").is_some());
        assert!(schema.get_field("Cat", "barks").is_none());
        assert!(schema.get_field("Pet", "name").is_some());
        assert!(schema.get_field("CatOrDog", "name").is_none());

        let typename = schema.get_field("CatOrDog", "__typename").unwrap();
        assert_eq!(typename.ty.to_string(), "String!");
        assert!(schema.get_field("String", "__typename").is_none());
    }

    #[test]
    fn test_type_ref_display() {
        let ty = TypeRef::non_null(TypeRef::list(TypeRef::non_null(TypeRef::named("ID"))));
        assert_eq!(ty.to_string(), "[ID!]!");
        assert_eq!(ty.inner_name(), "ID");
        assert!(ty.list_item().is_some());
    }
}
