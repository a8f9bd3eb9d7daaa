use crate::document::ServiceContext;
use serde_json::{json, Value};

pub const OUTPUT_PREFIX: &str = "DatadogMonitor";

/// Adds a `DatadogMonitor<Function>` output linking each function to its
/// page in the Datadog app, in the region the functions are deployed to.
/// Templates without an `Outputs` map are left alone. Returns the output
/// keys written.
pub fn add_output_links(
    template: &mut Value,
    service: &Value,
    region: &str,
    site: &str,
    account_id: &str,
) -> Vec<String> {
    let context = ServiceContext::from_service(service);
    let Some(outputs) = template.get_mut("Outputs").and_then(Value::as_object_mut) else {
        return Vec::new();
    };
    let Some(functions) = service.get("functions").and_then(Value::as_object) else {
        return Vec::new();
    };

    let mut written = Vec::new();
    for (function_key, function) in functions {
        let function_name = function
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| context.default_function_name(function_key));
        let key = output_key(function_key);
        outputs.insert(
            key.clone(),
            json!({
                "Description": format!("See {function_key} in Datadog"),
                "Value": format!(
                    "https://app.{site}/functions/{function_name}:{region}:{account_id}:aws?source=sls-plugin"
                )
            }),
        );
        written.push(key);
    }
    written
}

pub fn output_key(function_key: &str) -> String {
    format!("{OUTPUT_PREFIX}{function_key}")
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect()
}

#[cfg(test)]
#[path = "outputs_test.rs"]
mod tests;
