//! Context propagation for a single step's `Parameters`.
//!
//! Each injectable field can be addressed two ways: statically (`Payload`,
//! `Input`) or through a path expression (`Payload.$`, `Input.$`). The
//! current shape of the field is read into a [`FieldState`] and resolved
//! against a fixed decision table, so the outcome depends only on the
//! parameters object.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Merges the execution context object into the step input without
/// overwriting existing input fields.
pub const JSON_MERGE_EXPRESSION: &str = "States.JsonMerge($$, $, false)";

/// Selects only the three context objects a trace collector needs.
pub const CONTEXT_SELECTOR_EXPRESSION: &str = "$$['Execution', 'State', 'StateMachine']";

pub const PASS_THROUGH_EXPRESSION: &str = "$";

const PAYLOAD_MERGE_ENTRIES: &[(&str, &str)] = &[
    ("Execution.$", "$$.Execution"),
    ("State.$", "$$.State"),
    ("StateMachine.$", "$$.StateMachine"),
];

const INPUT_MERGE_ENTRIES: &[(&str, &str)] = &[("CONTEXT.$", JSON_MERGE_EXPRESSION)];

const PAYLOAD_RESERVED_KEYS: &[&str] = &["Execution", "State", "StateMachine"];

const INPUT_RESERVED_KEYS: &[&str] = &["CONTEXT", "Execution", "State", "StateMachine"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextField {
    Payload,
    Input,
}

impl ContextField {
    pub fn key(self) -> &'static str {
        match self {
            ContextField::Payload => "Payload",
            ContextField::Input => "Input",
        }
    }

    pub fn expression_key(self) -> &'static str {
        match self {
            ContextField::Payload => "Payload.$",
            ContextField::Input => "Input.$",
        }
    }

    pub fn default_expression(self) -> &'static str {
        match self {
            ContextField::Payload => CONTEXT_SELECTOR_EXPRESSION,
            ContextField::Input => JSON_MERGE_EXPRESSION,
        }
    }

    pub fn merge_entries(self) -> &'static [(&'static str, &'static str)] {
        match self {
            ContextField::Payload => PAYLOAD_MERGE_ENTRIES,
            ContextField::Input => INPUT_MERGE_ENTRIES,
        }
    }

    /// Keys whose presence (bare or with a `.$` suffix) means the object
    /// already carries context.
    pub fn reserved_keys(self) -> &'static [&'static str] {
        match self {
            ContextField::Payload => PAYLOAD_RESERVED_KEYS,
            ContextField::Input => INPUT_RESERVED_KEYS,
        }
    }

    fn is_reserved(self, key: &str) -> bool {
        let bare = key.strip_suffix(".$").unwrap_or(key);
        self.reserved_keys().contains(&bare)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldState<'a> {
    Absent,
    Object(&'a Map<String, Value>),
    NonObject(&'a Value),
    Expression(&'a Value),
}

impl<'a> FieldState<'a> {
    /// The static key takes precedence when both forms are present.
    pub fn read(parameters: &'a Map<String, Value>, field: ContextField) -> Self {
        if let Some(value) = parameters.get(field.key()) {
            return match value {
                Value::Object(object) => FieldState::Object(object),
                other => FieldState::NonObject(other),
            };
        }
        match parameters.get(field.expression_key()) {
            Some(expression) => FieldState::Expression(expression),
            None => FieldState::Absent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Injection {
    SetExpression { expression: &'static str },
    MergeIntoObject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NonObjectField,
    ContextAlreadyPresent,
    AlreadyInjected,
    CustomExpression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Inject(Injection),
    Leave { reason: SkipReason },
}

pub fn decide(state: FieldState<'_>, field: ContextField) -> Decision {
    match state {
        FieldState::Absent => Decision::Inject(Injection::SetExpression {
            expression: field.default_expression(),
        }),
        FieldState::NonObject(_) => Decision::Leave {
            reason: SkipReason::NonObjectField,
        },
        FieldState::Object(object) => {
            if object.keys().any(|key| field.is_reserved(key)) {
                Decision::Leave {
                    reason: SkipReason::ContextAlreadyPresent,
                }
            } else {
                Decision::Inject(Injection::MergeIntoObject)
            }
        }
        FieldState::Expression(expression) => match expression.as_str() {
            Some(JSON_MERGE_EXPRESSION) | Some(CONTEXT_SELECTOR_EXPRESSION) => Decision::Leave {
                reason: SkipReason::AlreadyInjected,
            },
            Some(PASS_THROUGH_EXPRESSION) => Decision::Inject(Injection::SetExpression {
                expression: JSON_MERGE_EXPRESSION,
            }),
            _ => Decision::Leave {
                reason: SkipReason::CustomExpression,
            },
        },
    }
}

pub fn decide_for(parameters: &Map<String, Value>, field: ContextField) -> Decision {
    decide(FieldState::read(parameters, field), field)
}

/// Applies a decision taken for `parameters`. Existing keys keep their
/// position; new keys are appended.
pub fn apply(parameters: &mut Map<String, Value>, field: ContextField, injection: Injection) {
    match injection {
        Injection::SetExpression { expression } => {
            parameters.insert(
                field.expression_key().to_string(),
                Value::String(expression.to_string()),
            );
        }
        Injection::MergeIntoObject => {
            if let Some(Value::Object(object)) = parameters.get_mut(field.key()) {
                for (key, expression) in field.merge_entries() {
                    object.insert((*key).to_string(), Value::String((*expression).to_string()));
                }
            }
        }
    }
}

pub fn inject_context(parameters: &mut Map<String, Value>, field: ContextField) -> Decision {
    let decision = decide_for(parameters, field);
    if let Decision::Inject(injection) = decision {
        apply(parameters, field, injection);
    }
    decision
}

#[cfg(test)]
#[path = "inject_test.rs"]
mod tests;
