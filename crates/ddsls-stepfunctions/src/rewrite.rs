//! Rewrites a state machine definition so Lambda and nested state machine
//! invocations carry the Step Functions context object.
//!
//! The definition reaches us serialized, either as a bare JSON string or as
//! the first argument of an `Fn::Sub` macro. Both entry points parse it,
//! hand the tree to [`rewrite_parsed_definition`], and serialize it back
//! into the slot it came from. Untouched steps keep their key order and
//! values.

use crate::classify::{classify_step, StepKind};
use crate::inject::{inject_context, ContextField, Decision, Injection, SkipReason};
use crate::log_sink::LogSink;
use ddsls_core::FieldPath;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const SUBSTITUTION_MACRO_KEY: &str = "Fn::Sub";

#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    #[error("definition of state machine `{workflow}` is not a valid JSON object: {source}")]
    Malformed {
        workflow: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("definition of state machine `{workflow}` could not be serialized: {source}")]
    Serialize {
        workflow: String,
        #[source]
        source: serde_json::Error,
    },
}

impl DefinitionError {
    pub fn workflow(&self) -> &str {
        match self {
            DefinitionError::Malformed { workflow, .. } | DefinitionError::Serialize { workflow, .. } => {
                workflow
            }
        }
    }
}

/// A parsed state machine definition. Only `States` is interpreted; every
/// other key is carried through as-is.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowDefinition {
    document: Map<String, Value>,
}

impl WorkflowDefinition {
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.document)
    }

    pub fn states(&self) -> Option<&Map<String, Value>> {
        self.document.get("States").and_then(Value::as_object)
    }

    pub fn step(&self, name: &str) -> Option<&Value> {
        self.states().and_then(|states| states.get(name))
    }

}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StepOutcome {
    Injected {
        field: ContextField,
        injection: Injection,
    },
    Left {
        field: ContextField,
        reason: SkipReason,
    },
    ParametersNotObject {
        field: ContextField,
    },
}

impl StepOutcome {
    pub fn is_injected(&self) -> bool {
        matches!(self, StepOutcome::Injected { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepRewrite {
    pub step: String,
    pub path: FieldPath,
    pub kind: StepKind,
    pub outcome: StepOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RewrittenDefinition {
    pub definition: WorkflowDefinition,
    pub steps: Vec<StepRewrite>,
}

impl RewrittenDefinition {
    pub fn changed(&self) -> bool {
        self.steps.iter().any(|step| step.outcome.is_injected())
    }
}

/// Walks every step, including steps nested in `Parallel` branches and
/// `Map` processors, and injects context where it is safe to.
pub fn rewrite_parsed_definition(mut definition: WorkflowDefinition) -> RewrittenDefinition {
    let mut steps = Vec::new();
    if let Some(Value::Object(states)) = definition.document.get_mut("States") {
        rewrite_states(states, FieldPath::root().key("States"), &mut steps);
    }
    RewrittenDefinition { definition, steps }
}

fn rewrite_states(states: &mut Map<String, Value>, path: FieldPath, out: &mut Vec<StepRewrite>) {
    for (name, step) in states.iter_mut() {
        let Some(step) = step.as_object_mut() else {
            continue;
        };
        let step_path = path.clone().key(name.as_str());
        let kind = classify_step(step.get("Resource").and_then(Value::as_str));
        let field = match kind {
            StepKind::LambdaInvokeApi | StepKind::LegacyLambdaArn => Some(ContextField::Payload),
            StepKind::StartExecution => Some(ContextField::Input),
            StepKind::Other => None,
        };
        if let Some(field) = field {
            out.push(StepRewrite {
                step: name.clone(),
                path: step_path.clone(),
                kind,
                outcome: rewrite_step(step, field),
            });
        }
        rewrite_nested_states(step, &step_path, out);
    }
}

fn rewrite_step(step: &mut Map<String, Value>, field: ContextField) -> StepOutcome {
    let Some(Value::Object(parameters)) = step.get_mut("Parameters") else {
        return StepOutcome::ParametersNotObject { field };
    };
    match inject_context(parameters, field) {
        Decision::Inject(injection) => StepOutcome::Injected { field, injection },
        Decision::Leave { reason } => StepOutcome::Left { field, reason },
    }
}

fn rewrite_nested_states(step: &mut Map<String, Value>, path: &FieldPath, out: &mut Vec<StepRewrite>) {
    let step_type = step.get("Type").and_then(Value::as_str);
    let (is_parallel, is_map) = (step_type == Some("Parallel"), step_type == Some("Map"));

    if is_parallel {
        if let Some(Value::Array(branches)) = step.get_mut("Branches") {
            for (index, branch) in branches.iter_mut().enumerate() {
                if let Some(Value::Object(states)) = branch.get_mut("States") {
                    let branch_path = path.clone().key("Branches").index(index).key("States");
                    rewrite_states(states, branch_path, out);
                }
            }
        }
    }
    if is_map {
        for processor in ["ItemProcessor", "Iterator"] {
            if let Some(Value::Object(states)) = step.get_mut(processor).and_then(|value| value.get_mut("States")) {
                rewrite_states(states, path.clone().key(processor).key("States"), out);
            }
        }
    }
}

/// Rewrites a macro-wrapped definition (`{"Fn::Sub": [definition, vars]}`)
/// in place. Any other shape, including an empty argument list, is left
/// alone.
pub fn rewrite_definition(
    wrapped: &mut Value,
    sink: &dyn LogSink,
    workflow_name: &str,
) -> Result<(), DefinitionError> {
    let Some(slot) = macro_definition_slot(wrapped) else {
        return Ok(());
    };
    let Some(text) = slot.as_str() else {
        return Ok(());
    };
    let rewritten = rewrite_definition_string(text, sink, workflow_name)?;
    *slot = Value::String(rewritten);
    Ok(())
}

pub fn parse_and_rewrite(definition: &str, workflow_name: &str) -> Result<RewrittenDefinition, DefinitionError> {
    let parsed = WorkflowDefinition::parse(definition).map_err(|source| DefinitionError::Malformed {
        workflow: workflow_name.to_string(),
        source,
    })?;
    Ok(rewrite_parsed_definition(parsed))
}

pub fn rewrite_definition_string(
    definition: &str,
    sink: &dyn LogSink,
    workflow_name: &str,
) -> Result<String, DefinitionError> {
    let rewritten = parse_and_rewrite(definition, workflow_name)?;
    log_rewrite(sink, workflow_name, &rewritten);
    rewritten
        .definition
        .to_json()
        .map_err(|source| DefinitionError::Serialize {
            workflow: workflow_name.to_string(),
            source,
        })
}

pub fn rewrite_definition_value(
    definition: &mut Value,
    sink: &dyn LogSink,
    workflow_name: &str,
) -> Result<(), DefinitionError> {
    match definition {
        Value::String(text) => {
            let rewritten = rewrite_definition_string(text, sink, workflow_name)?;
            *definition = Value::String(rewritten);
            Ok(())
        }
        other => rewrite_definition(other, sink, workflow_name),
    }
}

fn macro_definition_slot(wrapped: &mut Value) -> Option<&mut Value> {
    let arguments = wrapped
        .as_object_mut()?
        .get_mut(SUBSTITUTION_MACRO_KEY)?
        .as_array_mut()?;
    arguments.first_mut().filter(|first| first.is_string())
}

pub fn log_rewrite(sink: &dyn LogSink, workflow_name: &str, rewritten: &RewrittenDefinition) {
    for step in &rewritten.steps {
        log_step(sink, workflow_name, step);
    }
}

fn log_step(sink: &dyn LogSink, workflow: &str, rewrite: &StepRewrite) {
    let step = rewrite.step.as_str();
    match &rewrite.outcome {
        StepOutcome::Injected { field, injection } => {
            let target = match injection {
                Injection::SetExpression { .. } => field.expression_key(),
                Injection::MergeIntoObject => field.key(),
            };
            sink.info(&format!(
                "Merged Step Functions context object into Parameters.{target} in step: {step} of state machine: {workflow}."
            ));
        }
        StepOutcome::Left { field, reason } => match reason {
            SkipReason::AlreadyInjected | SkipReason::ContextAlreadyPresent => sink.info(&format!(
                "Parameters.{} already carries Step Functions context in step: {step} of state machine: {workflow}.",
                field.key()
            )),
            SkipReason::NonObjectField => sink.warn(&format!(
                "[Warn] Parameters.{} is not a JSON object. Merging traces failed for step: {step} of state machine: {workflow}.",
                field.key()
            )),
            SkipReason::CustomExpression => sink.warn(&format!(
                "[Warn] Parameters.{} has been set. Merging traces failed for step: {step} of state machine: {workflow}.",
                field.expression_key()
            )),
        },
        StepOutcome::ParametersNotObject { .. } => sink.warn(&format!(
            "[Warn] Parameters field is not a JSON object. Merging traces failed for step: {step} of state machine: {workflow}. \
Your Step Functions trace will not be merged with downstream traces."
        )),
    }
}

#[cfg(test)]
#[path = "rewrite_test.rs"]
mod tests;
