use crate::config::{validate_configuration, ConfigError, Configuration};
use crate::document::ServiceContext;
use crate::env::set_env_configuration;
use crate::forwarder::add_forwarder_subscriptions;
use crate::handlers::redirect_handlers;
use crate::layers::{apply_layers, find_handlers, AttachedLayer, FunctionInfo, LayerTable};
use crate::outputs::add_output_links;
use crate::tags::add_service_and_env_tags;
use crate::xray::enable_tracing;
use ddsls_core::StructuredIssue;
use ddsls_stepfunctions::{rewrite_definition_value, scan_and_rewrite_with, DefinitionError, LogSink};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Default)]
pub struct InstrumentOptions {
    /// Overrides `provider.region`.
    pub region: Option<String>,
    /// Output links are only written when the account is known.
    pub account_id: Option<String>,
    pub layers: Option<LayerTable>,
}

/// What one instrumentation pass changed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InstrumentReport {
    pub functions: Vec<FunctionInfo>,
    pub unsupported: Vec<String>,
    pub environment: Vec<String>,
    pub tagged: Vec<String>,
    pub layers: Vec<AttachedLayer>,
    pub redirected: Vec<String>,
    pub tracing_enabled: bool,
    pub subscriptions: Vec<String>,
    pub state_machines: Vec<String>,
    pub outputs: Vec<String>,
    pub issues: Vec<StructuredIssue>,
}

#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Definition(#[from] DefinitionError),
}

/// Instruments a service document and, when given, its compiled
/// deployment template. Configuration errors abort before anything is
/// modified; a malformed state machine definition aborts the template
/// pass with earlier state machines already rewritten.
pub fn instrument(
    service: &mut Value,
    template: Option<&mut Value>,
    options: &InstrumentOptions,
    sink: &dyn LogSink,
) -> Result<InstrumentReport, PluginError> {
    let config = Configuration::from_service(service)?;
    let issues = validate_configuration(&config);
    if issues.iter().any(StructuredIssue::is_error) {
        return Err(ConfigError::Validation(issues).into());
    }
    for issue in &issues {
        sink.warn(&format!("[Warn] {issue}"));
    }

    sink.info("Auto instrumenting functions with Datadog");
    let mut report = InstrumentReport {
        issues,
        ..InstrumentReport::default()
    };
    let context = ServiceContext::from_service(service);
    let region = options.region.clone().unwrap_or_else(|| context.region.clone());

    report.environment = set_env_configuration(&config, service)
        .into_iter()
        .map(str::to_string)
        .collect();
    if config.enable_tags {
        report.tagged = add_service_and_env_tags(service);
    }

    let default_runtime = service
        .get("provider")
        .and_then(|provider| provider.get("runtime"))
        .and_then(Value::as_str)
        .map(str::to_string);
    report.functions = find_handlers(service, default_runtime.as_deref());
    for function in report.functions.iter().filter(|function| !function.is_supported()) {
        match &function.runtime {
            Some(runtime) => sink.warn(&format!(
                "[Warn] Unable to add Lambda Layers to function {} with runtime {runtime}",
                function.name
            )),
            None => sink.warn(&format!("[Warn] Unable to determine runtime for function {}", function.name)),
        }
        report.unsupported.push(function.name.clone());
    }

    if config.add_layers {
        match &options.layers {
            Some(table) => {
                sink.info("Adding Lambda Layers to functions");
                report.layers = apply_layers(service, region.as_str(), &report.functions, table);
            }
            None => sink.warn("[Warn] No layer table supplied; Lambda Layers were not added"),
        }
    } else {
        sink.info("Skipping adding Lambda Layers, make sure you are packaging them yourself");
    }

    report.redirected = redirect_handlers(service, &report.functions, config.add_layers, &config.exclude, sink);
    if config.enable_xray_tracing {
        report.tracing_enabled = enable_tracing(service);
    }

    let Some(template) = template else {
        return Ok(report);
    };

    if let Some(resources) = template.get_mut("Resources").and_then(Value::as_object_mut) {
        if let Some(forwarder) = &config.forwarder {
            report.subscriptions = add_forwarder_subscriptions(resources, forwarder, sink);
        }
        if config.merge_step_function_and_lambda_traces {
            let state_machines = &mut report.state_machines;
            scan_and_rewrite_with(resources, |definition, name| {
                rewrite_definition_value(definition, sink, name)?;
                state_machines.push(name.to_string());
                Ok(())
            })?;
        }
    }

    if let Some(account_id) = &options.account_id {
        report.outputs = add_output_links(template, service, region.as_str(), config.site.as_str(), account_id);
    }
    Ok(report)
}

#[cfg(test)]
#[path = "instrument_test.rs"]
mod tests;
