use crate::run::RunnerError;
use ddsls_plugin::parse_service_document;
use serde_json::Value;
use std::fs;
use std::path::Path;

pub fn read_text(path: &Path) -> Result<String, RunnerError> {
    fs::read_to_string(path).map_err(|source| RunnerError::ReadFile {
        path: path.display().to_string(),
        source,
    })
}

/// Reads a JSON or YAML mapping without placeholder expansion.
pub fn read_json_document(path: &Path) -> Result<Value, RunnerError> {
    let text = read_text(path)?;
    parse_service_document(text.as_str(), path.extension().and_then(|ext| ext.to_str())).map_err(|error| {
        RunnerError::DocumentParse {
            path: path.display().to_string(),
            reason: error.to_string(),
        }
    })
}

pub fn write_json_document(path: &Path, value: &Value) -> Result<(), RunnerError> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    fs::write(path, text).map_err(|source| RunnerError::WriteFile {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
#[path = "documents_test.rs"]
mod tests;
