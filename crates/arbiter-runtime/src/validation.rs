//! Static validation of scenario iterations
//!
//! Before an iteration is committed, its trigger condition and rule formulas
//! are checked against the function catalog and the organization's data
//! model:
//!
//! - every called function exists and receives an accepted number of children
//! - children whose type is known statically (constants, accessors, function
//!   results) match the declared parameter type
//! - payload accessors name fields of the trigger table, database accessors
//!   follow existing links and end on an existing field
//! - the trigger and every rule formula return a boolean
//! - both score thresholds are set, review not above reject
//!
//! All problems are collected; validation never stops at the first one.

use arbiter_core::ast::{FunctionCatalog, Node, ParamType};
use arbiter_core::{DataModel, ScenarioIteration, Table};
use thiserror::Error;

/// One problem found in an iteration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Trigger condition is missing")]
    MissingTrigger,

    #[error("Score thresholds are missing")]
    MissingThresholds,

    #[error("Review threshold {review} is above reject threshold {reject}")]
    InvertedThresholds { review: i32, reject: i32 },

    #[error("Trigger table '{0}' is not in the data model")]
    UnknownTriggerTable(String),

    #[error("{location}: unknown function {function}")]
    UnknownFunction { location: String, function: String },

    #[error("{location}: {function} expects {expected} arguments, got {actual}")]
    Arity {
        location: String,
        function: String,
        expected: String,
        actual: usize,
    },

    #[error("{location}: {function} argument {position} expects {expected}, got {actual}")]
    ArgumentType {
        location: String,
        function: String,
        position: usize,
        expected: String,
        actual: String,
    },

    #[error("{location}: {message}")]
    Accessor { location: String, message: String },

    #[error("{location}: formula must return bool, returns {actual}")]
    NotBoolean { location: String, actual: String },
}

/// Validator over a catalog and a data model
pub struct IterationValidator<'a> {
    catalog: &'a FunctionCatalog,
    data_model: &'a DataModel,
}

impl<'a> IterationValidator<'a> {
    pub fn new(catalog: &'a FunctionCatalog, data_model: &'a DataModel) -> Self {
        Self {
            catalog,
            data_model,
        }
    }

    /// Validate a whole iteration of a scenario triggered by `trigger_table`
    pub fn validate(
        &self,
        trigger_table: &str,
        iteration: &ScenarioIteration,
    ) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        match (
            iteration.score_review_threshold,
            iteration.score_reject_threshold,
        ) {
            (Some(review), Some(reject)) if review > reject => {
                errors.push(ValidationError::InvertedThresholds { review, reject })
            }
            (Some(_), Some(_)) => {}
            _ => errors.push(ValidationError::MissingThresholds),
        }

        let Some(table) = self.data_model.table(trigger_table) else {
            errors.push(ValidationError::UnknownTriggerTable(trigger_table.to_string()));
            return Err(errors);
        };

        match &iteration.trigger_condition {
            Some(trigger) => self.check_formula(table, trigger, "trigger", &mut errors),
            None => errors.push(ValidationError::MissingTrigger),
        }

        for rule in iteration.ordered_rules() {
            let location = format!("rule '{}'", rule.name);
            self.check_formula(table, &rule.formula, &location, &mut errors);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate one boolean formula
    pub fn validate_formula(
        &self,
        trigger_table: &str,
        formula: &Node,
    ) -> Result<(), Vec<ValidationError>> {
        let Some(table) = self.data_model.table(trigger_table) else {
            return Err(vec![ValidationError::UnknownTriggerTable(
                trigger_table.to_string(),
            )]);
        };
        let mut errors = Vec::new();
        self.check_formula(table, formula, "formula", &mut errors);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn check_formula(
        &self,
        table: &Table,
        formula: &Node,
        location: &str,
        errors: &mut Vec<ValidationError>,
    ) {
        let returns = self.check_node(table, formula, location, errors);
        let is_bool = match returns {
            Some(ty) => ParamType::Bool.is_compatible_with(ty),
            // Null constant or unresolvable accessor, already reported if broken
            None => !matches!(formula, Node::Constant { .. }),
        };
        if !is_bool {
            errors.push(ValidationError::NotBoolean {
                location: location.to_string(),
                actual: returns.map_or_else(|| "null".to_string(), |t| t.to_string()),
            });
        }
    }

    /// Check a subtree, returning its static type when known
    fn check_node(
        &self,
        table: &Table,
        node: &Node,
        location: &str,
        errors: &mut Vec<ValidationError>,
    ) -> Option<ParamType> {
        match node {
            Node::Constant { value } => ParamType::of_value(value),
            Node::PayloadAccessor { field } => match table.field(field) {
                Some(f) => Some(f.data_type.into()),
                None => {
                    errors.push(ValidationError::Accessor {
                        location: location.to_string(),
                        message: format!("unknown field '{}' on table '{}'", field, table.name),
                    });
                    None
                }
            },
            Node::DatabaseAccessor {
                table: start,
                field,
                path,
            } => self.check_accessor(table, start, path, field, location, errors),
            Node::FunctionCall { function, children } => {
                let child_types: Vec<Option<ParamType>> = children
                    .iter()
                    .map(|c| self.check_node(table, c, location, errors))
                    .collect();

                let Some(attrs) = self.catalog.get(*function) else {
                    errors.push(ValidationError::UnknownFunction {
                        location: location.to_string(),
                        function: function.to_string(),
                    });
                    return None;
                };

                if !attrs.arity.accepts(children.len()) {
                    errors.push(ValidationError::Arity {
                        location: location.to_string(),
                        function: function.to_string(),
                        expected: attrs.arity.to_string(),
                        actual: children.len(),
                    });
                }

                for (position, child_type) in child_types.into_iter().enumerate() {
                    let Some(actual) = child_type else { continue };
                    let expected = attrs.param_type(position);
                    if !expected.is_compatible_with(actual) {
                        errors.push(ValidationError::ArgumentType {
                            location: location.to_string(),
                            function: function.to_string(),
                            position,
                            expected: expected.to_string(),
                            actual: actual.to_string(),
                        });
                    }
                }

                Some(attrs.return_type)
            }
        }
    }

    fn check_accessor(
        &self,
        trigger_table: &Table,
        start: &str,
        path: &[String],
        field: &str,
        location: &str,
        errors: &mut Vec<ValidationError>,
    ) -> Option<ParamType> {
        let mut report = |message: String| {
            errors.push(ValidationError::Accessor {
                location: location.to_string(),
                message,
            })
        };

        if start != trigger_table.name {
            report(format!(
                "accessor starts at table '{}' instead of trigger table '{}'",
                start, trigger_table.name
            ));
            return None;
        }

        let mut current = trigger_table;
        for link_name in path {
            let Some(link) = current.link(link_name) else {
                report(format!("unknown link '{}' on table '{}'", link_name, current.name));
                return None;
            };
            let Some(next) = self.data_model.table(&link.linked_table) else {
                report(format!(
                    "link '{}' targets unknown table '{}'",
                    link_name, link.linked_table
                ));
                return None;
            };
            current = next;
        }

        match current.field(field) {
            Some(f) => Some(f.data_type.into()),
            None => {
                report(format!("unknown field '{}' on table '{}'", field, current.name));
                None
            }
        }
    }
}
