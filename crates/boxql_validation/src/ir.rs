//! Internal representation handed to the executor.
//!
//! Fragments and inline fragments are already resolved: every node lists its
//! children once per concrete object type its return type can take, merged by
//! response key.

use boxql_core::{SourceLocation, Span};
use boxql_schema::TypeRef;
use boxql_syntax::OperationType;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value as Json};

/// Variable values keyed by name, without the `$`.
pub type Variables = Map<String, Json>;

/// Children of a node, keyed by response key.
pub type IrChildren = IndexMap<String, IrNode>;

/// A rewritten document.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IrDocument {
    /// Operations keyed by name. The anonymous operation uses the empty key.
    pub operations: IndexMap<String, IrOperation>,
    pub fragments: IndexMap<String, IrFragment>,
}

impl IrDocument {
    /// Selects an operation by name.
    ///
    /// Without a name the document must contain exactly one operation.
    pub fn operation(&self, name: Option<&str>) -> Option<&IrOperation> {
        match name {
            Some(name) => self.operations.get(name),
            None if self.operations.len() == 1 => self.operations.values().next(),
            None => None,
        }
    }
}

/// A rewritten operation.
#[derive(Debug, Clone, Serialize)]
pub struct IrOperation {
    pub name: Option<String>,
    pub kind: OperationType,
    pub root_type: String,
    pub variables: Vec<IrVariable>,
    pub children: IrChildren,
    pub span: Span,
}

impl IrOperation {
    /// Default values of the declared variables.
    pub fn default_variables(&self) -> Variables {
        self.variables
            .iter()
            .filter_map(|v| Some((v.name.clone(), v.default_value.clone()?)))
            .collect()
    }

    /// Maximum field nesting depth for the given variables.
    ///
    /// Fields excluded by `@skip` or `@include` do not count.
    pub fn depth(&self, variables: &Variables) -> usize {
        children_depth(&self.children, variables)
    }
}

/// A declared operation variable.
#[derive(Debug, Clone, Serialize)]
pub struct IrVariable {
    pub name: String,
    pub ty: TypeRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Json>,
}

/// A rewritten fragment definition.
#[derive(Debug, Clone, Serialize)]
pub struct IrFragment {
    pub name: String,
    pub type_condition: String,
    pub typed_children: IndexMap<String, IrChildren>,
}

/// A field merged across all of its appearances.
#[derive(Debug, Clone, Serialize)]
pub struct IrNode {
    pub response_key: String,
    pub name: String,
    /// The concrete object type the field is resolved on.
    pub owner_type: String,
    pub return_type: TypeRef,
    pub arguments: IndexMap<String, IrValue>,
    pub spans: Vec<Span>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<SourceLocation>,
    /// One condition list per appearance.
    pub conditions: Vec<Vec<IrCondition>>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub typed_children: IndexMap<String, IrChildren>,
}

impl IrNode {
    /// True if any appearance passes all of its conditions.
    pub fn is_included(&self, variables: &Variables) -> bool {
        self.conditions
            .iter()
            .any(|conditions| conditions.iter().all(|c| c.passes(variables)))
    }

    /// Children selected when the value is of `object_type`.
    pub fn children_for(&self, object_type: &str) -> Option<&IrChildren> {
        self.typed_children.get(object_type)
    }

    pub fn depth(&self, variables: &Variables) -> usize {
        1 + self
            .typed_children
            .values()
            .map(|children| children_depth(children, variables))
            .max()
            .unwrap_or(0)
    }
}

fn children_depth(children: &IrChildren, variables: &Variables) -> usize {
    children
        .values()
        .filter(|node| node.is_included(variables))
        .map(|node| node.depth(variables))
        .max()
        .unwrap_or(0)
}

/// A `@skip` or `@include` condition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IrCondition {
    pub kind: ConditionKind,
    pub value: IrValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionKind {
    Skip,
    Include,
}

impl IrCondition {
    pub fn passes(&self, variables: &Variables) -> bool {
        let flag = matches!(self.value.resolve(variables), Json::Bool(true));
        match self.kind {
            ConditionKind::Skip => !flag,
            ConditionKind::Include => flag,
        }
    }
}

/// An argument value with variables left unresolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum IrValue {
    Variable(String),
    Int(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Null,
    Enum(String),
    List(Vec<IrValue>),
    Object(IndexMap<String, IrValue>),
}

impl IrValue {
    /// Converts to JSON, substituting variables. Missing variables become null.
    pub fn resolve(&self, variables: &Variables) -> Json {
        match self {
            Self::Variable(name) => variables.get(name).cloned().unwrap_or(Json::Null),
            Self::Int(n) => Json::from(*n),
            Self::Float(n) => Json::from(*n),
            Self::String(s) | Self::Enum(s) => Json::from(s.as_str()),
            Self::Boolean(b) => Json::Bool(*b),
            Self::Null => Json::Null,
            Self::List(items) => Json::Array(items.iter().map(|i| i.resolve(variables)).collect()),
            Self::Object(fields) => Json::Object(
                fields
                    .iter()
                    .map(|(name, value)| (name.clone(), value.resolve(variables)))
                    .collect(),
            ),
        }
    }

    /// Names of the variables referenced anywhere in this value.
    pub fn variables(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_variables(&mut names);
        names
    }

    fn collect_variables<'v>(&'v self, out: &mut Vec<&'v str>) {
        match self {
            Self::Variable(name) => out.push(name),
            Self::List(items) => items.iter().for_each(|i| i.collect_variables(out)),
            Self::Object(fields) => fields.values().for_each(|v| v.collect_variables(out)),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn leaf(key: &str, conditions: Vec<Vec<IrCondition>>) -> IrNode {
        IrNode {
            response_key: key.to_string(),
            name: key.to_string(),
            owner_type: "Query".to_string(),
            return_type: TypeRef::named("Int"),
            arguments: IndexMap::new(),
            spans: Vec::new(),
            locations: Vec::new(),
            conditions,
            typed_children: IndexMap::new(),
        }
    }

    fn include(variable: &str) -> IrCondition {
        IrCondition {
            kind: ConditionKind::Include,
            value: IrValue::Variable(variable.to_string()),
        }
    }

    #[test]
    fn test_node_included_when_any_appearance_passes() {
        let node = leaf(
            "a",
            vec![
                vec![include("on")],
                vec![IrCondition {
                    kind: ConditionKind::Skip,
                    value: IrValue::Boolean(true),
                }],
            ],
        );
        let mut vars = Variables::new();
        assert!(!node.is_included(&vars));
        vars.insert("on".to_string(), json!(true));
        assert!(node.is_included(&vars));
    }

    #[test]
    fn test_resolve_substitutes_variables() {
        let value = IrValue::Object(IndexMap::from([
            ("x".to_string(), IrValue::Variable("x".to_string())),
            ("tags".to_string(), IrValue::List(vec![IrValue::Enum("RED".to_string())])),
        ]));
        let vars: Variables = [("x".to_string(), json!(3))].into_iter().collect();
        assert_eq!(value.resolve(&vars), json!({"x": 3, "tags": ["RED"]}));
        assert_eq!(value.variables(), ["x"]);
    }
}
