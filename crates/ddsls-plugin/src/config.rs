use ddsls_core::{FieldPath, StructuredIssue};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

/// Section of the service document holding the plugin configuration.
pub const CONFIG_SECTION: [&str; 2] = ["custom", "datadog"];

pub const KNOWN_SITES: &[&str] = &[
    "datadoghq.com",
    "datadoghq.eu",
    "us3.datadoghq.com",
    "us5.datadoghq.com",
    "ap1.datadoghq.com",
    "ddog-gov.com",
];

pub const LOG_LEVELS: &[&str] = &["debug", "info", "warn", "error", "critical", "off"];

const FORWARDER_ARN_PATTERN: &str = r"^arn:aws[a-z-]*:lambda:[a-z0-9-]+:\d{12}:function:[A-Za-z0-9_-]+(:[A-Za-z0-9_$-]+)?$";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    /// Attach the prebuilt Lambda layers, or expect the user to bring them.
    #[serde(default = "default_true")]
    pub add_layers: bool,
    /// Only needed when metrics are sent without the log forwarder.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default, rename = "apiKMSKey")]
    pub api_kms_key: Option<String>,
    #[serde(default = "default_site")]
    pub site: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_true")]
    pub flush_metrics_to_logs: bool,
    #[serde(default)]
    pub enable_xray_tracing: bool,
    #[serde(default = "default_true", rename = "enableDDTracing")]
    pub enable_dd_tracing: bool,
    /// Log forwarder function ARN; log groups are subscribed to it when set.
    #[serde(default)]
    pub forwarder: Option<String>,
    #[serde(default = "default_true")]
    pub enable_tags: bool,
    #[serde(default = "default_true")]
    pub inject_log_context: bool,
    /// Functions whose handlers must not be redirected.
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub monitors: Vec<Value>,
    #[serde(default)]
    pub merge_step_function_and_lambda_traces: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            add_layers: true,
            api_key: None,
            api_kms_key: None,
            site: default_site(),
            log_level: default_log_level(),
            flush_metrics_to_logs: true,
            enable_xray_tracing: false,
            enable_dd_tracing: true,
            forwarder: None,
            enable_tags: true,
            inject_log_context: true,
            exclude: Vec::new(),
            monitors: Vec::new(),
            merge_step_function_and_lambda_traces: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_site() -> String {
    "datadoghq.com".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("read service document failed `{path}`: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("service document parse failed: {0}")]
    Parse(String),
    #[error("plugin configuration is invalid: {}", join_issues(.0))]
    Validation(Vec<StructuredIssue>),
}

fn join_issues(issues: &[StructuredIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl Configuration {
    /// Reads `custom.datadog`, falling back to defaults for every missing
    /// key and for a missing section.
    pub fn from_service(service: &Value) -> Result<Self, ConfigError> {
        let section = CONFIG_SECTION
            .iter()
            .try_fold(service, |value, key| value.get(key));
        match section {
            None | Some(Value::Null) => Ok(Self::default()),
            Some(section) => serde_json::from_value(section.clone())
                .map_err(|error| ConfigError::Parse(format!("custom.datadog: {error}"))),
        }
    }
}

/// Loads a service document from JSON or YAML, expanding `${env:NAME}`
/// placeholders first. Other `${...}` variables are left for the framework.
pub fn load_service_document(path: &Path) -> Result<Value, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.display().to_string(),
        source,
    })?;
    let expanded = expand_env_placeholders(raw.as_str()).map_err(ConfigError::Parse)?;
    parse_service_document(expanded.as_str(), path.extension().and_then(|ext| ext.to_str()))
}

pub fn parse_service_document(text: &str, extension: Option<&str>) -> Result<Value, ConfigError> {
    let value: Value = match extension {
        Some("json") => serde_json::from_str(text)
            .map_err(|error| ConfigError::Parse(format!("json decode error: {error}")))?,
        Some("yaml") | Some("yml") => serde_yaml::from_str(text)
            .map_err(|error| ConfigError::Parse(format!("yaml decode error: {error}")))?,
        _ => serde_yaml::from_str(text)
            .or_else(|_| serde_json::from_str(text))
            .map_err(|error| ConfigError::Parse(error.to_string()))?,
    };
    if !value.is_object() {
        return Err(ConfigError::Parse("service document must be a mapping".to_string()));
    }
    Ok(value)
}

pub(crate) fn expand_env_placeholders(input: &str) -> Result<String, String> {
    const OPEN: &str = "${env:";
    let mut out = String::with_capacity(input.len());
    let mut cursor = 0;
    while let Some(start_offset) = input[cursor..].find(OPEN) {
        let start = cursor + start_offset;
        out.push_str(&input[cursor..start]);
        let var_start = start + OPEN.len();
        let Some(end_offset) = input[var_start..].find('}') else {
            return Err("unterminated env placeholder `${env:...`".to_string());
        };
        let end = var_start + end_offset;
        let key = input[var_start..end].trim();
        if key.is_empty() {
            return Err("empty env placeholder `${env:}`".to_string());
        }
        let value = std::env::var(key)
            .map_err(|_| format!("missing env var for placeholder `${{env:{key}}}`"))?;
        out.push_str(value.as_str());
        cursor = end + 1;
    }
    out.push_str(&input[cursor..]);
    Ok(out)
}

pub fn validate_configuration(config: &Configuration) -> Vec<StructuredIssue> {
    let mut issues = Vec::new();

    if !KNOWN_SITES.contains(&config.site.as_str()) {
        issues.push(StructuredIssue::error(
            "config",
            config_path("site"),
            format!("unsupported site `{}` (expected one of {})", config.site, KNOWN_SITES.join(", ")),
            "config.site",
        ));
    }
    if !LOG_LEVELS.contains(&config.log_level.to_ascii_lowercase().as_str()) {
        issues.push(StructuredIssue::error(
            "config",
            config_path("logLevel"),
            format!("unknown log level `{}`", config.log_level),
            "config.log_level",
        ));
    }
    if let Some(forwarder) = &config.forwarder {
        if !forwarder.contains("${") && !forwarder_arn_regex().is_match(forwarder) {
            issues.push(StructuredIssue::error(
                "config",
                config_path("forwarder"),
                format!("forwarder `{forwarder}` is not a Lambda function ARN"),
                "config.forwarder_arn",
            ));
        }
    }
    if config.api_key.is_some() && config.api_kms_key.is_some() {
        issues.push(StructuredIssue::warning(
            "config",
            config_path("apiKMSKey"),
            "both apiKey and apiKMSKey are set; the layer prefers the KMS-encrypted key",
            "config.api_key_conflict",
        ));
    }
    if !config.flush_metrics_to_logs && config.api_key.is_none() && config.api_kms_key.is_none() {
        issues.push(StructuredIssue::warning(
            "config",
            config_path("flushMetricsToLogs"),
            "metrics are sent directly to the API but no apiKey or apiKMSKey is configured",
            "config.api_key_missing",
        ));
    }
    for (index, monitor) in config.monitors.iter().enumerate() {
        let single_key = monitor.as_object().is_some_and(|object| object.len() == 1);
        if !single_key {
            issues.push(StructuredIssue::error(
                "config",
                config_path("monitors").index(index),
                "monitor entries must be objects with exactly one monitor id key",
                "config.monitor_shape",
            ));
        }
    }

    StructuredIssue::sort_stable(&mut issues);
    issues
}

fn config_path(key: &str) -> FieldPath {
    FieldPath::from_keys(CONFIG_SECTION).key(key)
}

fn forwarder_arn_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(FORWARDER_ARN_PATTERN).expect("forwarder arn pattern must compile"))
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
