use serde_json::{Map, Value};

pub(crate) const DEFAULT_STAGE: &str = "dev";
pub(crate) const DEFAULT_REGION: &str = "us-east-1";

/// Returns the object stored under `key`, creating it when the key is
/// missing or null. `None` when the key holds something else.
pub(crate) fn object_entry<'a>(parent: &'a mut Map<String, Value>, key: &str) -> Option<&'a mut Map<String, Value>> {
    let entry = parent
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if entry.is_null() {
        *entry = Value::Object(Map::new());
    }
    entry.as_object_mut()
}

/// Walks `path` from `root`, creating missing objects on the way.
pub(crate) fn object_path<'a>(root: &'a mut Value, path: &[&str]) -> Option<&'a mut Map<String, Value>> {
    if root.is_null() {
        *root = Value::Object(Map::new());
    }
    let mut current = root.as_object_mut()?;
    for segment in path {
        current = object_entry(current, segment)?;
    }
    Some(current)
}

pub(crate) fn functions_mut(service: &mut Value) -> Option<&mut Map<String, Value>> {
    service.get_mut("functions").and_then(Value::as_object_mut)
}

/// Names the deployment is addressed by: service, stage and region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceContext {
    pub service: String,
    pub stage: String,
    pub region: String,
}

impl ServiceContext {
    pub fn from_service(service: &Value) -> Self {
        let name = match service.get("service") {
            Some(Value::String(name)) => name.clone(),
            Some(Value::Object(object)) => object
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            _ => String::new(),
        };
        let provider = service.get("provider");
        let provider_str = |key: &str, default: &str| {
            provider
                .and_then(|provider| provider.get(key))
                .and_then(Value::as_str)
                .unwrap_or(default)
                .to_string()
        };
        Self {
            service: name,
            stage: provider_str("stage", DEFAULT_STAGE),
            region: provider_str("region", DEFAULT_REGION),
        }
    }

    /// Name the framework gives a function that does not set one.
    pub fn default_function_name(&self, function_key: &str) -> String {
        format!("{}-{}-{}", self.service, self.stage, function_key)
    }
}

#[cfg(test)]
#[path = "document_test.rs"]
mod tests;
