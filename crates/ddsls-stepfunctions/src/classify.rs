use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Optimized Lambda service integration (`Parameters.Payload` addressing).
pub const LAMBDA_INVOKE_RESOURCE: &str = "arn:aws:states:::lambda:invoke";

/// Nested state machine integration; `.sync`, `.sync:2` and
/// `.waitForTaskToken` variants share this prefix.
pub const START_EXECUTION_RESOURCE_PREFIX: &str = "arn:aws:states:::states:startExecution";

/// Legacy integration: the step's `Resource` is the function ARN itself.
const LEGACY_LAMBDA_ARN_PATTERN: &str = r"^arn:aws[a-z-]*:lambda:.+:function:[^:\s]+(:[^:\s]+)?$";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    LambdaInvokeApi,
    LegacyLambdaArn,
    StartExecution,
    Other,
}

impl StepKind {
    pub fn is_lambda_invocation(self) -> bool {
        matches!(self, StepKind::LambdaInvokeApi | StepKind::LegacyLambdaArn)
    }
}

fn legacy_lambda_arn() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(LEGACY_LAMBDA_ARN_PATTERN).expect("legacy lambda arn pattern must compile"))
}

pub fn classify_step(resource: Option<&str>) -> StepKind {
    let Some(resource) = resource else {
        return StepKind::Other;
    };
    if is_default_lambda_api_step(Some(resource)) {
        StepKind::LambdaInvokeApi
    } else if legacy_lambda_arn().is_match(resource) {
        StepKind::LegacyLambdaArn
    } else if is_step_function_invocation(Some(resource)) {
        StepKind::StartExecution
    } else {
        StepKind::Other
    }
}

/// True when the step invokes a Lambda function, through either the generic
/// invoke API or a bare function ARN.
pub fn is_invocation_step(resource: Option<&str>) -> bool {
    classify_step(resource).is_lambda_invocation()
}

/// True only for the generic invoke API, never for the legacy ARN form.
pub fn is_default_lambda_api_step(resource: Option<&str>) -> bool {
    resource == Some(LAMBDA_INVOKE_RESOURCE)
}

pub fn is_step_function_invocation(resource: Option<&str>) -> bool {
    resource.is_some_and(|resource| resource.starts_with(START_EXECUTION_RESOURCE_PREFIX))
}

#[cfg(test)]
#[path = "classify_test.rs"]
mod tests;
