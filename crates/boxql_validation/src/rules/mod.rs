//! Validation rules.
//!
//! Each rule is an independent [`Rule`] participant. [`RuleKind`] names them
//! so callers can pick a subset.

mod arguments_are_defined;
mod directives_are_defined;
mod fields_on_correct_type;
mod fields_will_merge;
mod fragment_types_exist;
mod fragments_are_defined;
mod fragments_are_finite;
mod fragments_are_used;
mod leaf_field_selections;
mod query_depth;
mod required_arguments_present;
mod variables_are_defined;

pub use arguments_are_defined::ArgumentsAreDefined;
pub use directives_are_defined::DirectivesAreDefined;
pub use fields_on_correct_type::FieldsOnCorrectType;
pub use fields_will_merge::FieldsWillMerge;
pub use fragment_types_exist::FragmentTypesExist;
pub use fragments_are_defined::FragmentsAreDefined;
pub use fragments_are_finite::FragmentsAreFinite;
pub use fragments_are_used::FragmentsAreUsed;
pub use leaf_field_selections::LeafFieldSelections;
pub use query_depth::QueryDepth;
pub use required_arguments_present::RequiredArgumentsPresent;
pub use variables_are_defined::VariablesAreDefined;

use crate::config::ValidatorConfig;
use crate::visitor::Rule;

/// The built-in rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    FieldsOnCorrectType,
    LeafFieldSelections,
    ArgumentsAreDefined,
    RequiredArgumentsPresent,
    DirectivesAreDefined,
    FragmentsAreDefined,
    FragmentTypesExist,
    FragmentsAreUsed,
    FragmentsAreFinite,
    VariablesAreDefined,
    FieldsWillMerge,
    QueryDepth,
}

/// Every built-in rule, in the order they run.
pub const ALL_RULES: &[RuleKind] = &[
    RuleKind::FieldsOnCorrectType,
    RuleKind::LeafFieldSelections,
    RuleKind::ArgumentsAreDefined,
    RuleKind::RequiredArgumentsPresent,
    RuleKind::DirectivesAreDefined,
    RuleKind::FragmentsAreDefined,
    RuleKind::FragmentTypesExist,
    RuleKind::FragmentsAreUsed,
    RuleKind::FragmentsAreFinite,
    RuleKind::VariablesAreDefined,
    RuleKind::FieldsWillMerge,
    RuleKind::QueryDepth,
];

impl RuleKind {
    /// Creates a fresh rule instance for one validation run.
    pub fn instantiate<'a>(self, config: &ValidatorConfig) -> Box<dyn Rule<'a> + 'a> {
        match self {
            Self::FieldsOnCorrectType => Box::new(FieldsOnCorrectType),
            Self::LeafFieldSelections => Box::new(LeafFieldSelections),
            Self::ArgumentsAreDefined => Box::new(ArgumentsAreDefined),
            Self::RequiredArgumentsPresent => Box::new(RequiredArgumentsPresent),
            Self::DirectivesAreDefined => Box::new(DirectivesAreDefined),
            Self::FragmentsAreDefined => Box::new(FragmentsAreDefined),
            Self::FragmentTypesExist => Box::new(FragmentTypesExist),
            Self::FragmentsAreUsed => Box::new(FragmentsAreUsed::default()),
            Self::FragmentsAreFinite => Box::new(FragmentsAreFinite),
            Self::VariablesAreDefined => Box::new(VariablesAreDefined),
            Self::FieldsWillMerge => Box::new(FieldsWillMerge::new()),
            Self::QueryDepth => Box::new(QueryDepth::new(config.max_depth)),
        }
    }
}
