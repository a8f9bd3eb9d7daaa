use crate::document::{functions_mut, object_entry};
use crate::layers::{FunctionInfo, RuntimeType};
use ddsls_stepfunctions::LogSink;
use serde_json::Value;

pub const DATADOG_HANDLER_ENV_VAR: &str = "DD_LAMBDA_HANDLER";
pub const PYTHON_HANDLER: &str = "datadog_lambda.handler.handler";
pub const JS_HANDLER_LAYER_PREFIX: &str = "/opt/nodejs/";
pub const JS_HANDLER: &str = "node_modules/datadog-lambda-js/handler.handler";

/// Handler that wraps the user's code for `runtime_type`. Node wrappers
/// live under the layer mount when layers are attached.
pub fn wrapper_handler(runtime_type: RuntimeType, add_layers: bool) -> Option<String> {
    match runtime_type {
        RuntimeType::Node if add_layers => Some(format!("{JS_HANDLER_LAYER_PREFIX}{JS_HANDLER}")),
        RuntimeType::Node => Some(JS_HANDLER.to_string()),
        RuntimeType::Python => Some(PYTHON_HANDLER.to_string()),
        RuntimeType::Unsupported => None,
    }
}

/// Points each supported, non-excluded function at the wrapper and records
/// the original handler in `environment.DD_LAMBDA_HANDLER`. Functions
/// already wrapped are skipped. Returns the redirected function keys.
pub fn redirect_handlers(
    service: &mut Value,
    handlers: &[FunctionInfo],
    add_layers: bool,
    exclude: &[String],
    sink: &dyn LogSink,
) -> Vec<String> {
    let Some(functions) = functions_mut(service) else {
        return Vec::new();
    };

    let mut redirected = Vec::new();
    for info in handlers {
        if exclude.iter().any(|name| name == &info.name) {
            continue;
        }
        let Some(wrapper) = wrapper_handler(info.runtime_type, add_layers) else {
            continue;
        };
        let Some(function) = functions.get_mut(&info.name).and_then(Value::as_object_mut) else {
            continue;
        };
        let Some(original) = function.get("handler").and_then(Value::as_str).map(str::to_string) else {
            continue;
        };
        if original == wrapper {
            continue;
        }
        let Some(environment) = object_entry(function, "environment") else {
            sink.warn(&format!(
                "[Warn] environment of function {} is not a mapping; handler left in place",
                info.name
            ));
            continue;
        };
        environment.insert(DATADOG_HANDLER_ENV_VAR.to_string(), Value::String(original));
        function.insert("handler".to_string(), Value::String(wrapper));
        redirected.push(info.name.clone());
    }
    redirected
}

#[cfg(test)]
#[path = "handlers_test.rs"]
mod tests;
