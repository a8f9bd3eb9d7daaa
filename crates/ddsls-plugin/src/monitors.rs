use serde::Serialize;
use serde_json::{Map, Number, Value};

pub const DEFAULT_MONITOR_TYPE: &str = "metric alert";
pub const MONITOR_ID_TAG_PREFIX: &str = "serverless_monitor_id:";
pub const STACK_ID_TAG_PREFIX: &str = "aws_cloudformation_stack-id:";
pub const RECOMMENDED_MONITOR_TAG: &str = "serverless_monitor_type:single_function";

/// Monitor the plugin knows how to configure from an id alone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecommendedMonitor {
    pub id: &'static str,
    pub name: &'static str,
    pub query: &'static str,
    pub threshold: f64,
    pub message: &'static str,
}

pub const RECOMMENDED_MONITORS: &[RecommendedMonitor] = &[
    RecommendedMonitor {
        id: "high_error_rate",
        name: "High Error Rate",
        query: "avg(last_15m):sum:aws.lambda.errors{*} by {functionname,region,aws_account}.as_count() / sum:aws.lambda.invocations{*} by {functionname,region,aws_account}.as_count() >= 0.1",
        threshold: 0.1,
        message: "More than 10% of the function's invocations were errors in the selected time range.",
    },
    RecommendedMonitor {
        id: "timeout",
        name: "Timeout",
        query: "avg(last_15m):sum:aws.lambda.duration.maximum{*} by {aws_account,functionname,region}.as_count() / (sum:aws.lambda.timeout{*} by {aws_account,functionname,region}.as_count() * 1000) >= 1",
        threshold: 1.0,
        message: "At least one invocation in the selected time range timed out.",
    },
    RecommendedMonitor {
        id: "out_of_memory",
        name: "Out of Memory",
        query: "avg(last_15m):sum:aws.lambda.enhanced.max_memory_used{*} by {aws_account,functionname,region}.as_count() / sum:aws.lambda.memorysize{*} by {aws_account,functionname,region}.as_count() >= 1",
        threshold: 1.0,
        message: "At least one invocation in the selected time range ran out of memory.",
    },
    RecommendedMonitor {
        id: "high_iterator_age",
        name: "High Iterator Age",
        query: "avg(last_15m):min:aws.lambda.iterator_age.maximum{*} by {aws_account,region,functionname} >= 86400",
        threshold: 86400.0,
        message: "The function's iterator was older than 24 hours.",
    },
    RecommendedMonitor {
        id: "high_cold_start_rate",
        name: "High Cold Start Rate",
        query: "avg(last_15m):sum:aws.lambda.enhanced.invocations{cold_start:true} by {aws_account,functionname,region}.as_count() / sum:aws.lambda.enhanced.invocations{*} by {aws_account,functionname,region}.as_count() >= 0.2",
        threshold: 0.2,
        message: "More than 20% of the function's invocations were cold starts in the selected time range.",
    },
    RecommendedMonitor {
        id: "high_throttles",
        name: "High Throttles",
        query: "avg(last_15m):sum:aws.lambda.throttles{*} by {aws_account,region,functionname}.as_count() / sum:aws.lambda.invocations{*} by {aws_account,region,functionname}.as_count() >= 0.2",
        threshold: 0.2,
        message: "More than 20% of invocation requests were throttled in the selected time range.",
    },
];

pub fn recommended_monitor(id: &str) -> Option<&'static RecommendedMonitor> {
    RECOMMENDED_MONITORS.iter().find(|monitor| monitor.id == id)
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MonitorError {
    #[error("monitor entry must be an object with exactly one monitor id key")]
    InvalidEntry,
    #[error("monitor `{id}` parameters must be an object")]
    InvalidParams { id: String },
    #[error("monitor `{id}` threshold must be a number, a numeric string, or {{critical: number}}")]
    InvalidThreshold { id: String },
}

/// Request body for one configured monitor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorRequest {
    pub id: String,
    pub body: Value,
}

/// Builds the API request body for a single-key `{ <id>: { ...params } }`
/// monitor entry.
pub fn build_monitor_params(entry: &Value, stack_id: &str) -> Result<MonitorRequest, MonitorError> {
    let (id, params) = match entry.as_object() {
        Some(object) if object.len() == 1 => object.iter().next().ok_or(MonitorError::InvalidEntry)?,
        _ => return Err(MonitorError::InvalidEntry),
    };
    let mut body = match params {
        Value::Null => Map::new(),
        Value::Object(params) => params.clone(),
        _ => return Err(MonitorError::InvalidParams { id: id.clone() }),
    };

    let mut tags = match body.remove("tags") {
        Some(Value::Array(tags)) => tags,
        _ => Vec::new(),
    };
    tags.push(Value::String(format!("{MONITOR_ID_TAG_PREFIX}{id}")));
    tags.push(Value::String(format!("{STACK_ID_TAG_PREFIX}{stack_id}")));
    if !body.get("options").is_some_and(Value::is_object) {
        body.insert("options".to_string(), Value::Object(Map::new()));
    }
    if body.get("type").map_or(true, Value::is_null) {
        body.insert("type".to_string(), Value::String(DEFAULT_MONITOR_TYPE.to_string()));
    }

    if let Some(recommended) = recommended_monitor(id) {
        tags.push(Value::String(RECOMMENDED_MONITOR_TAG.to_string()));
        apply_recommended(&mut body, recommended, id)?;
    }
    body.insert("tags".to_string(), Value::Array(tags));

    Ok(MonitorRequest {
        id: id.clone(),
        body: Value::Object(body),
    })
}

fn apply_recommended(body: &mut Map<String, Value>, recommended: &RecommendedMonitor, id: &str) -> Result<(), MonitorError> {
    for (key, default) in [("name", recommended.name), ("message", recommended.message)] {
        if body.get(key).and_then(Value::as_str).map_or(true, str::is_empty) {
            body.insert(key.to_string(), Value::String(default.to_string()));
        }
    }

    let threshold = match body.remove("threshold") {
        None | Some(Value::Null) => recommended.threshold,
        Some(value) => parse_threshold(&value).ok_or_else(|| MonitorError::InvalidThreshold { id: id.to_string() })?,
    };
    let operand = format_threshold(threshold);
    body.insert("query".to_string(), Value::String(replace_query_threshold(recommended.query, &operand)));

    let critical = Number::from_f64(threshold)
        .map(Value::Number)
        .ok_or_else(|| MonitorError::InvalidThreshold { id: id.to_string() })?;
    if let Some(options) = body.get_mut("options").and_then(Value::as_object_mut) {
        let thresholds = options
            .entry("thresholds".to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !thresholds.is_object() {
            *thresholds = Value::Object(Map::new());
        }
        if let Some(thresholds) = thresholds.as_object_mut() {
            thresholds.insert("critical".to_string(), critical);
        }
    }
    Ok(())
}

fn parse_threshold(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        Value::Object(object) => object.get("critical").and_then(parse_threshold),
        _ => None,
    }
    .filter(|threshold| threshold.is_finite())
}

fn format_threshold(threshold: f64) -> String {
    if threshold.fract() == 0.0 && threshold.abs() < 1e15 {
        format!("{}", threshold as i64)
    } else {
        threshold.to_string()
    }
}

/// Replaces the operand after the query's last comparison operator. A
/// query without an operator gets one appended.
pub fn replace_query_threshold(query: &str, threshold: &str) -> String {
    match query.rfind(['=', '<', '>']) {
        Some(position) => format!("{} {threshold}", &query[..=position]),
        None => format!("{query} >= {threshold}"),
    }
}

pub fn build_monitor_requests(monitors: &[Value], stack_id: &str) -> Result<Vec<MonitorRequest>, MonitorError> {
    monitors
        .iter()
        .map(|entry| build_monitor_params(entry, stack_id))
        .collect()
}

#[cfg(test)]
#[path = "monitors_test.rs"]
mod tests;
