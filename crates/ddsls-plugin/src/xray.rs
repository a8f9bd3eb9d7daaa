use crate::document::object_path;
use serde_json::Value;

/// Turns on X-Ray tracing for API Gateway and Lambda. An explicit user
/// setting for either key is kept.
pub fn enable_tracing(service: &mut Value) -> bool {
    let Some(tracing) = object_path(service, &["provider", "tracing"]) else {
        return false;
    };
    let mut changed = false;
    for key in ["apiGateway", "lambda"] {
        if tracing.get(key).map_or(true, Value::is_null) {
            tracing.insert(key.to_string(), Value::Bool(true));
            changed = true;
        }
    }
    changed
}

#[cfg(test)]
#[path = "xray_test.rs"]
mod tests;
