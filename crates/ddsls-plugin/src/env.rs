use crate::config::Configuration;
use crate::document::object_path;
use serde_json::{Map, Value};

pub const API_KEY_ENV_VAR: &str = "DD_API_KEY";
pub const API_KEY_KMS_ENV_VAR: &str = "DD_KMS_API_KEY";
pub const SITE_ENV_VAR: &str = "DD_SITE";
pub const LOG_LEVEL_ENV_VAR: &str = "DD_LOG_LEVEL";
pub const LOG_FORWARDING_ENV_VAR: &str = "DD_FLUSH_TO_LOG";
pub const TRACE_ENABLED_ENV_VAR: &str = "DD_TRACE_ENABLED";
pub const LOGS_INJECTION_ENV_VAR: &str = "DD_LOGS_INJECTION";
pub const EXCLUDED_FUNCTIONS_ENV_VAR: &str = "DD_EXCLUDED_FUNCTIONS";

/// Writes the layer's settings into `provider.environment`. Keys the user
/// already set win. Returns the names of the keys that were added.
pub fn set_env_configuration(config: &Configuration, service: &mut Value) -> Vec<&'static str> {
    let Some(environment) = object_path(service, &["provider", "environment"]) else {
        return Vec::new();
    };

    let mut defaults: Vec<(&'static str, String)> = Vec::new();
    if let Some(api_key) = &config.api_key {
        defaults.push((API_KEY_ENV_VAR, api_key.clone()));
    }
    if let Some(api_kms_key) = &config.api_kms_key {
        defaults.push((API_KEY_KMS_ENV_VAR, api_kms_key.clone()));
    }
    defaults.push((SITE_ENV_VAR, config.site.clone()));
    defaults.push((LOG_LEVEL_ENV_VAR, config.log_level.clone()));
    defaults.push((LOG_FORWARDING_ENV_VAR, config.flush_metrics_to_logs.to_string()));
    defaults.push((TRACE_ENABLED_ENV_VAR, config.enable_dd_tracing.to_string()));
    defaults.push((LOGS_INJECTION_ENV_VAR, config.inject_log_context.to_string()));
    if !config.exclude.is_empty() {
        defaults.push((EXCLUDED_FUNCTIONS_ENV_VAR, config.exclude.join(",")));
    }

    defaults
        .into_iter()
        .filter(|(key, value)| set_if_absent(environment, key, value))
        .map(|(key, _)| key)
        .collect()
}

fn set_if_absent(environment: &mut Map<String, Value>, key: &str, value: &str) -> bool {
    if environment.get(key).is_some_and(|existing| !existing.is_null()) {
        return false;
    }
    environment.insert(key.to_string(), Value::String(value.to_string()));
    true
}

#[cfg(test)]
#[path = "env_test.rs"]
mod tests;
