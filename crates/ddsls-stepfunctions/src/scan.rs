use crate::log_sink::LogSink;
use crate::rewrite::{rewrite_definition_value, DefinitionError};
use serde_json::{Map, Value};

pub const STATE_MACHINE_RESOURCE_TYPE: &str = "AWS::StepFunctions::StateMachine";

/// Rewrites the definition of every state machine in a template's
/// `Resources` map, in map order. Stops at the first malformed definition;
/// resources already visited keep their rewritten definitions.
pub fn scan_and_rewrite(resources: &mut Map<String, Value>, sink: &dyn LogSink) -> Result<(), DefinitionError> {
    scan_and_rewrite_with(resources, |definition, name| {
        rewrite_definition_value(definition, sink, name)
    })
}

/// Same walk as [`scan_and_rewrite`] with a caller-supplied rewrite for
/// each `Properties.DefinitionString`.
pub fn scan_and_rewrite_with<F>(resources: &mut Map<String, Value>, mut rewrite: F) -> Result<(), DefinitionError>
where
    F: FnMut(&mut Value, &str) -> Result<(), DefinitionError>,
{
    for (name, resource) in resources.iter_mut() {
        if let Some(definition) = state_machine_definition(resource) {
            rewrite(definition, name.as_str())?;
        }
    }
    Ok(())
}

fn state_machine_definition(resource: &mut Value) -> Option<&mut Value> {
    if !is_state_machine(resource) {
        return None;
    }
    resource.get_mut("Properties")?.get_mut("DefinitionString")
}

pub fn is_state_machine(resource: &Value) -> bool {
    resource.get("Type").and_then(Value::as_str) == Some(STATE_MACHINE_RESOURCE_TYPE)
}

#[cfg(test)]
#[path = "scan_test.rs"]
mod tests;
