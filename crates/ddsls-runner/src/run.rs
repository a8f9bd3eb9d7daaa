use crate::cli::{InstrumentCommand, MonitorsCommand, OutputFormat, RewriteDefinitionCommand};
use crate::io::{read_json_document, read_text, write_json_document};
use ddsls_plugin::{
    build_monitor_requests, instrument, load_service_document, ConfigError, Configuration, InstrumentOptions,
    InstrumentReport, LayerTable, LayerTableError, MonitorError, PluginError,
};
use ddsls_stepfunctions::{log_rewrite, parse_and_rewrite, DefinitionError, TeeLogSink, TracingLogSink};
use serde_json::{json, Value};
use std::fs;

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("read file failed `{path}`: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("write file failed `{path}`: {source}")]
    WriteFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("document parse failed `{path}`: {reason}")]
    DocumentParse { path: String, reason: String },
    #[error("service document load failed: {0}")]
    Config(#[from] ConfigError),
    #[error("layer table load failed: {0}")]
    LayerTable(#[from] LayerTableError),
    #[error("instrumentation failed: {0}")]
    Plugin(#[from] PluginError),
    #[error(transparent)]
    Definition(#[from] DefinitionError),
    #[error("monitor configuration invalid: {0}")]
    Monitor(#[from] MonitorError),
    #[error("json encode failed: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn execute_instrument(command: &InstrumentCommand) -> Result<String, RunnerError> {
    let mut service = load_service_document(command.service.as_path())?;
    let mut template = command
        .template
        .as_deref()
        .map(read_json_document)
        .transpose()?;
    let layers = command
        .layers
        .as_deref()
        .map(LayerTable::from_path)
        .transpose()?;
    let options = InstrumentOptions {
        region: command.region.clone(),
        account_id: command.account_id.clone(),
        layers,
    };

    let sink = TeeLogSink::new(TracingLogSink);
    let report = instrument(&mut service, template.as_mut(), &options, &sink)?;

    let mut written = Vec::new();
    if let Some(out_dir) = &command.out_dir {
        fs::create_dir_all(out_dir).map_err(|source| RunnerError::WriteFile {
            path: out_dir.display().to_string(),
            source,
        })?;
        let service_path = out_dir.join("service.json");
        write_json_document(&service_path, &service)?;
        written.push(service_path.display().to_string());
        if let Some(template) = &template {
            let template_path = out_dir.join("template.json");
            write_json_document(&template_path, template)?;
            written.push(template_path.display().to_string());
        }
        tracing::debug!(files = written.len(), "wrote instrumented documents");
    }

    match command.format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&json!({
            "report": report,
            "log": sink.lines(),
            "written": written,
        }))?),
        OutputFormat::Text => Ok(render_instrument_text(&report, &written)),
    }
}

fn render_instrument_text(report: &InstrumentReport, written: &[String]) -> String {
    let mut lines = vec![format!(
        "functions: {} ({} unsupported)",
        report.functions.len(),
        report.unsupported.len()
    )];
    for layer in &report.layers {
        lines.push(format!("layer: {} <- {}", layer.function, layer.arn));
    }
    for function in &report.redirected {
        lines.push(format!("handler redirected: {function}"));
    }
    if report.tracing_enabled {
        lines.push("xray tracing: enabled".to_string());
    }
    for subscription in &report.subscriptions {
        lines.push(format!("subscription: {subscription}"));
    }
    for state_machine in &report.state_machines {
        lines.push(format!("state machine: {state_machine}"));
    }
    for output in &report.outputs {
        lines.push(format!("output: {output}"));
    }
    for issue in &report.issues {
        lines.push(issue.to_string());
    }
    for path in written {
        lines.push(format!("wrote: {path}"));
    }
    lines.join("\n")
}

pub fn execute_rewrite_definition(command: &RewriteDefinitionCommand) -> Result<String, RunnerError> {
    let text = read_text(command.definition.as_path())?;
    let workflow = command.name.as_str();
    let rewritten = parse_and_rewrite(text.as_str(), workflow)?;
    let sink = TeeLogSink::new(TracingLogSink);
    log_rewrite(&sink, workflow, &rewritten);

    match command.format {
        OutputFormat::Text => rewritten.definition.to_json().map_err(|source| {
            RunnerError::from(DefinitionError::Serialize {
                workflow: workflow.to_string(),
                source,
            })
        }),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&json!({
            "definition": rewritten.definition,
            "changed": rewritten.changed(),
            "steps": rewritten.steps,
            "log": sink.lines(),
        }))?),
    }
}

pub fn execute_monitors(command: &MonitorsCommand) -> Result<String, RunnerError> {
    let service = load_service_document(command.service.as_path())?;
    let config = Configuration::from_service(&service)?;
    let requests = build_monitor_requests(&config.monitors, command.stack_id.as_str())?;
    let bodies: Vec<Value> = requests
        .into_iter()
        .map(|request| json!({"id": request.id, "body": request.body}))
        .collect();
    Ok(serde_json::to_string_pretty(&bodies)?)
}

#[cfg(test)]
#[path = "run_test.rs"]
mod tests;
