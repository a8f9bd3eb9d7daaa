use crate::document::{functions_mut, object_entry, ServiceContext};
use serde_json::{Map, Value};

pub const SERVICE_TAG: &str = "service";
pub const ENV_TAG: &str = "env";

/// Tags every function with `service` and `env` unless the tag is already
/// set on the provider or on the function. Returns the function keys that
/// gained at least one tag.
pub fn add_service_and_env_tags(service: &mut Value) -> Vec<String> {
    let context = ServiceContext::from_service(service);
    let provider_tags = service
        .get("provider")
        .and_then(|provider| provider.get("tags"))
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let mut defaults = Vec::new();
    if !provider_tags.contains_key(SERVICE_TAG) && !context.service.is_empty() {
        defaults.push((SERVICE_TAG, context.service.clone()));
    }
    if !provider_tags.contains_key(ENV_TAG) {
        defaults.push((ENV_TAG, context.stage.clone()));
    }
    if defaults.is_empty() {
        return Vec::new();
    }

    let Some(functions) = functions_mut(service) else {
        return Vec::new();
    };
    let mut tagged = Vec::new();
    for (key, function) in functions.iter_mut() {
        let Some(function) = function.as_object_mut() else {
            continue;
        };
        let Some(tags) = object_entry(function, "tags") else {
            continue;
        };
        if tag_missing_defaults(tags, &defaults) {
            tagged.push(key.clone());
        }
    }
    tagged
}

fn tag_missing_defaults(tags: &mut Map<String, Value>, defaults: &[(&str, String)]) -> bool {
    let mut changed = false;
    for (name, value) in defaults {
        if !tags.contains_key(*name) {
            tags.insert((*name).to_string(), Value::String(value.clone()));
            changed = true;
        }
    }
    changed
}

#[cfg(test)]
#[path = "tags_test.rs"]
mod tests;
