//! Abstract Syntax Tree types for GraphQL documents.
//!
//! Executable nodes (operations, fragments, selections, values) own their
//! data; only SDL descriptions borrow from the source text.

use crate::token::DirectiveLocation;
use boxql_core::{Span, Text};

/// A complete document.
#[derive(Debug, Clone)]
pub struct Document<'a> {
    pub definitions: Vec<Definition<'a>>,
    pub span: Span,
}

impl<'a> Document<'a> {
    /// Iterates over operation definitions in document order.
    pub fn operations(&self) -> impl Iterator<Item = &OperationDefinition> {
        self.definitions.iter().filter_map(|def| match def {
            Definition::Operation(op) => Some(op),
            _ => None,
        })
    }

    /// Iterates over fragment definitions in document order.
    pub fn fragments(&self) -> impl Iterator<Item = &FragmentDefinition> {
        self.definitions.iter().filter_map(|def| match def {
            Definition::Fragment(frag) => Some(frag),
            _ => None,
        })
    }

    /// Iterates over type-system definitions in document order.
    pub fn types(&self) -> impl Iterator<Item = &TypeDefinition<'a>> {
        self.definitions.iter().filter_map(|def| match def {
            Definition::Type(ty) => Some(ty),
            _ => None,
        })
    }

    /// Returns true if the document contains no executable definitions.
    #[must_use]
    pub fn is_type_system_only(&self) -> bool {
        self.operations().next().is_none() && self.fragments().next().is_none()
    }
}

/// A top-level definition.
#[derive(Debug, Clone)]
pub enum Definition<'a> {
    Schema(SchemaDefinition),
    Type(TypeDefinition<'a>),
    Directive(DirectiveDefinitionNode<'a>),
    Operation(OperationDefinition),
    Fragment(FragmentDefinition),
}

/// Schema definition.
#[derive(Debug, Clone)]
pub struct SchemaDefinition {
    pub directives: Vec<Directive>,
    pub operations: Vec<OperationTypeDefinition>,
    pub span: Span,
}

/// Operation type in schema (query/mutation/subscription).
#[derive(Debug, Clone)]
pub struct OperationTypeDefinition {
    pub operation: OperationType,
    pub type_name: Name,
    pub span: Span,
}

/// Type of operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum OperationType {
    Query,
    Mutation,
    Subscription,
}

impl OperationType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
            Self::Subscription => "subscription",
        }
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type definitions.
#[derive(Debug, Clone)]
pub enum TypeDefinition<'a> {
    Object(ObjectTypeDefinition<'a>),
    Interface(InterfaceTypeDefinition<'a>),
    Union(UnionTypeDefinition<'a>),
    Enum(EnumTypeDefinition<'a>),
    Input(InputObjectTypeDefinition<'a>),
    Scalar(ScalarTypeDefinition<'a>),
}

impl<'a> TypeDefinition<'a> {
    /// The defined type's name.
    #[must_use]
    pub fn name(&self) -> Name {
        match self {
            Self::Object(def) => def.name,
            Self::Interface(def) => def.name,
            Self::Union(def) => def.name,
            Self::Enum(def) => def.name,
            Self::Input(def) => def.name,
            Self::Scalar(def) => def.name,
        }
    }
}

/// Object type definition.
#[derive(Debug, Clone)]
pub struct ObjectTypeDefinition<'a> {
    pub description: Option<Description<'a>>,
    pub name: Name,
    pub implements: Vec<Name>,
    pub directives: Vec<Directive>,
    pub fields: Vec<FieldDefinition<'a>>,
    pub span: Span,
}

/// Interface type definition.
#[derive(Debug, Clone)]
pub struct InterfaceTypeDefinition<'a> {
    pub description: Option<Description<'a>>,
    pub name: Name,
    pub implements: Vec<Name>,
    pub directives: Vec<Directive>,
    pub fields: Vec<FieldDefinition<'a>>,
    pub span: Span,
}

/// Union type definition.
#[derive(Debug, Clone)]
pub struct UnionTypeDefinition<'a> {
    pub description: Option<Description<'a>>,
    pub name: Name,
    pub directives: Vec<Directive>,
    pub members: Vec<Name>,
    pub span: Span,
}

/// Enum type definition.
#[derive(Debug, Clone)]
pub struct EnumTypeDefinition<'a> {
    pub description: Option<Description<'a>>,
    pub name: Name,
    pub directives: Vec<Directive>,
    pub values: Vec<EnumValueDefinition<'a>>,
    pub span: Span,
}

/// Enum value definition.
#[derive(Debug, Clone)]
pub struct EnumValueDefinition<'a> {
    pub description: Option<Description<'a>>,
    pub name: Name,
    pub directives: Vec<Directive>,
    pub span: Span,
}

/// Input object type definition.
#[derive(Debug, Clone)]
pub struct InputObjectTypeDefinition<'a> {
    pub description: Option<Description<'a>>,
    pub name: Name,
    pub directives: Vec<Directive>,
    pub fields: Vec<InputValueDefinition<'a>>,
    pub span: Span,
}

/// Scalar type definition.
#[derive(Debug, Clone)]
pub struct ScalarTypeDefinition<'a> {
    pub description: Option<Description<'a>>,
    pub name: Name,
    pub directives: Vec<Directive>,
    pub span: Span,
}

/// Field definition.
#[derive(Debug, Clone)]
pub struct FieldDefinition<'a> {
    pub description: Option<Description<'a>>,
    pub name: Name,
    pub arguments: Vec<InputValueDefinition<'a>>,
    pub ty: Type,
    pub directives: Vec<Directive>,
    pub span: Span,
}

/// Input value definition (arguments, input fields).
#[derive(Debug, Clone)]
pub struct InputValueDefinition<'a> {
    pub description: Option<Description<'a>>,
    pub name: Name,
    pub ty: Type,
    pub default_value: Option<Value>,
    pub directives: Vec<Directive>,
    pub span: Span,
}

/// Type reference.
#[derive(Debug, Clone)]
pub enum Type {
    /// Named type: `User`
    Named(NamedType),
    /// List type: `[User]`
    List(Box<Type>, Span),
    /// Non-null type: `User!`
    NonNull(Box<Type>, Span),
}

impl Type {
    /// The innermost named type.
    #[must_use]
    pub fn named(&self) -> &NamedType {
        match self {
            Self::Named(named) => named,
            Self::List(inner, _) | Self::NonNull(inner, _) => inner.named(),
        }
    }

    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Self::Named(named) => named.span,
            Self::List(_, span) | Self::NonNull(_, span) => *span,
        }
    }
}

/// Named type.
#[derive(Debug, Clone)]
pub struct NamedType {
    pub name: Text,
    pub span: Span,
}

/// Directive definition.
#[derive(Debug, Clone)]
pub struct DirectiveDefinitionNode<'a> {
    pub description: Option<Description<'a>>,
    pub name: Name,
    pub arguments: Vec<InputValueDefinition<'a>>,
    pub repeatable: bool,
    pub locations: Vec<DirectiveLocation>,
    pub span: Span,
}

/// Directive usage.
#[derive(Debug, Clone)]
pub struct Directive {
    pub name: Name,
    pub arguments: Vec<Argument>,
    pub span: Span,
}

/// Argument.
#[derive(Debug, Clone)]
pub struct Argument {
    pub name: Name,
    pub value: Value,
    pub span: Span,
}

/// Operation definition.
#[derive(Debug, Clone)]
pub struct OperationDefinition {
    pub operation: OperationType,
    pub name: Option<Name>,
    pub variables: Vec<VariableDefinition>,
    pub directives: Vec<Directive>,
    pub selection_set: SelectionSet,
    pub span: Span,
}

/// Variable definition.
#[derive(Debug, Clone)]
pub struct VariableDefinition {
    pub name: Name,
    pub ty: Type,
    pub default_value: Option<Value>,
    pub directives: Vec<Directive>,
    pub span: Span,
}

/// Fragment definition.
#[derive(Debug, Clone)]
pub struct FragmentDefinition {
    pub name: Name,
    pub type_condition: Name,
    pub directives: Vec<Directive>,
    pub selection_set: SelectionSet,
    pub span: Span,
}

/// Identifier of a selection set, unique within one parsed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SelectionSetId(pub u32);

/// Selection set.
#[derive(Debug, Clone)]
pub struct SelectionSet {
    pub id: SelectionSetId,
    pub selections: Vec<Selection>,
    pub span: Span,
}

/// Selection.
#[derive(Debug, Clone)]
pub enum Selection {
    Field(FieldSelection),
    FragmentSpread(FragmentSpread),
    InlineFragment(InlineFragment),
}

impl Selection {
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Self::Field(field) => field.span,
            Self::FragmentSpread(spread) => spread.span,
            Self::InlineFragment(inline) => inline.span,
        }
    }

    #[must_use]
    pub fn directives(&self) -> &[Directive] {
        match self {
            Self::Field(field) => &field.directives,
            Self::FragmentSpread(spread) => &spread.directives,
            Self::InlineFragment(inline) => &inline.directives,
        }
    }
}

/// Field selection.
#[derive(Debug, Clone)]
pub struct FieldSelection {
    pub alias: Option<Name>,
    pub name: Name,
    pub arguments: Vec<Argument>,
    pub directives: Vec<Directive>,
    pub selection_set: Option<SelectionSet>,
    pub span: Span,
}

impl FieldSelection {
    /// The alias if present, else the field name.
    #[must_use]
    pub fn response_key(&self) -> Text {
        self.alias.unwrap_or(self.name).value
    }
}

/// Fragment spread.
#[derive(Debug, Clone)]
pub struct FragmentSpread {
    pub name: Name,
    pub directives: Vec<Directive>,
    pub span: Span,
}

/// Inline fragment.
#[derive(Debug, Clone)]
pub struct InlineFragment {
    pub type_condition: Option<Name>,
    pub directives: Vec<Directive>,
    pub selection_set: SelectionSet,
    pub span: Span,
}

/// Value.
#[derive(Debug, Clone)]
pub enum Value {
    Variable(Name),
    Int(i64, Span),
    Float(f64, Span),
    String(String, Span),
    Boolean(bool, Span),
    Null(Span),
    Enum(Name),
    List(Vec<Value>, Span),
    Object(Vec<(Name, Value)>, Span),
}

impl Value {
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Self::Variable(name) | Self::Enum(name) => name.span,
            Self::Int(_, span)
            | Self::Float(_, span)
            | Self::String(_, span)
            | Self::Boolean(_, span)
            | Self::Null(span)
            | Self::List(_, span)
            | Self::Object(_, span) => *span,
        }
    }

    /// Calls `f` with every variable referenced by this value.
    pub fn for_each_variable(&self, f: &mut impl FnMut(Name)) {
        match self {
            Self::Variable(name) => f(*name),
            Self::List(items, _) => items.iter().for_each(|item| item.for_each_variable(f)),
            Self::Object(fields, _) => fields.iter().for_each(|(_, v)| v.for_each_variable(f)),
            _ => {}
        }
    }
}

/// Name with span.
#[derive(Debug, Clone, Copy)]
pub struct Name {
    pub value: Text,
    pub span: Span,
}

impl Name {
    pub fn new(value: Text, span: Span) -> Self {
        Self { value, span }
    }
}

/// Description (documentation string).
#[derive(Debug, Clone)]
pub struct Description<'a> {
    pub value: &'a str,
    pub span: Span,
}

impl<'a> Description<'a> {
    pub fn new(value: &'a str, span: Span) -> Self {
        Self { value, span }
    }
}
