use crate::document::functions_mut;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeType {
    Node,
    Python,
    Unsupported,
}

const RUNTIME_LOOKUP: &[(&str, RuntimeType)] = &[
    ("nodejs8.10", RuntimeType::Node),
    ("nodejs10.x", RuntimeType::Node),
    ("nodejs12.x", RuntimeType::Node),
    ("nodejs14.x", RuntimeType::Node),
    ("nodejs16.x", RuntimeType::Node),
    ("nodejs18.x", RuntimeType::Node),
    ("nodejs20.x", RuntimeType::Node),
    ("python2.7", RuntimeType::Python),
    ("python3.6", RuntimeType::Python),
    ("python3.7", RuntimeType::Python),
    ("python3.8", RuntimeType::Python),
    ("python3.9", RuntimeType::Python),
    ("python3.10", RuntimeType::Python),
    ("python3.11", RuntimeType::Python),
    ("python3.12", RuntimeType::Python),
];

pub fn runtime_type(runtime: Option<&str>) -> RuntimeType {
    runtime
        .and_then(|runtime| RUNTIME_LOOKUP.iter().find(|(name, _)| *name == runtime))
        .map(|(_, runtime_type)| *runtime_type)
        .unwrap_or(RuntimeType::Unsupported)
}

/// A function of the service document together with its resolved runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionInfo {
    pub name: String,
    pub runtime: Option<String>,
    pub runtime_type: RuntimeType,
}

impl FunctionInfo {
    pub fn is_supported(&self) -> bool {
        self.runtime_type != RuntimeType::Unsupported
    }
}

/// Lists the service's functions in document order. A function's own
/// `runtime` overrides `default_runtime`.
pub fn find_handlers(service: &Value, default_runtime: Option<&str>) -> Vec<FunctionInfo> {
    let Some(functions) = service.get("functions").and_then(Value::as_object) else {
        return Vec::new();
    };
    functions
        .iter()
        .map(|(name, function)| {
            let runtime = function
                .get("runtime")
                .and_then(Value::as_str)
                .or(default_runtime)
                .map(str::to_string);
            FunctionInfo {
                name: name.clone(),
                runtime_type: runtime_type(runtime.as_deref()),
                runtime,
            }
        })
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum LayerTableError {
    #[error("read layer table failed `{path}`: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("layer table parse failed: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Published layer ARNs, by region then runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerTable {
    #[serde(default)]
    pub regions: BTreeMap<String, BTreeMap<String, String>>,
}

impl LayerTable {
    pub fn from_json(text: &str) -> Result<Self, LayerTableError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, LayerTableError> {
        let text = fs::read_to_string(path).map_err(|source| LayerTableError::ReadFile {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(text.as_str())
    }

    pub fn layer_arn(&self, region: &str, runtime: &str) -> Option<&str> {
        self.regions.get(region)?.get(runtime).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachedLayer {
    pub function: String,
    pub arn: String,
}

/// Appends the runtime's layer to every supported function. A region
/// missing from the table leaves the service untouched; a layer already in
/// the function's list is not added twice.
pub fn apply_layers(
    service: &mut Value,
    region: &str,
    handlers: &[FunctionInfo],
    table: &LayerTable,
) -> Vec<AttachedLayer> {
    if !table.regions.contains_key(region) {
        return Vec::new();
    }
    let Some(functions) = functions_mut(service) else {
        return Vec::new();
    };

    let mut attached = Vec::new();
    for handler in handlers.iter().filter(|handler| handler.is_supported()) {
        let Some(arn) = handler
            .runtime
            .as_deref()
            .and_then(|runtime| table.layer_arn(region, runtime))
        else {
            continue;
        };
        let Some(function) = functions.get_mut(&handler.name).and_then(Value::as_object_mut) else {
            continue;
        };
        let layers = function
            .entry("layers")
            .or_insert_with(|| Value::Array(Vec::new()));
        if layers.is_null() {
            *layers = Value::Array(Vec::new());
        }
        let Some(layers) = layers.as_array_mut() else {
            continue;
        };
        if layers.iter().any(|layer| layer.as_str() == Some(arn)) {
            continue;
        }
        layers.push(Value::String(arn.to_string()));
        attached.push(AttachedLayer {
            function: handler.name.clone(),
            arn: arn.to_string(),
        });
    }
    attached
}

#[cfg(test)]
#[path = "layers_test.rs"]
mod tests;
