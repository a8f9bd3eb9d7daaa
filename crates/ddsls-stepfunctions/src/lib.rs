//! Step Functions trace merging.
//!
//! Injects the Step Functions context object into the invocation
//! parameters of Lambda and nested state machine steps so traces of the
//! state machine and of the functions it calls can be linked.

pub mod classify;
pub mod inject;
pub mod log_sink;
pub mod rewrite;
pub mod scan;

pub use classify::{
    classify_step, is_default_lambda_api_step, is_invocation_step, is_step_function_invocation, StepKind,
    LAMBDA_INVOKE_RESOURCE, START_EXECUTION_RESOURCE_PREFIX,
};
pub use inject::{
    decide, decide_for, inject_context, ContextField, Decision, FieldState, Injection, SkipReason,
    CONTEXT_SELECTOR_EXPRESSION, JSON_MERGE_EXPRESSION, PASS_THROUGH_EXPRESSION,
};
pub use log_sink::{LogLevel, LogLine, LogSink, MemoryLogSink, TeeLogSink, TracingLogSink};
pub use rewrite::{
    log_rewrite, parse_and_rewrite, rewrite_definition, rewrite_definition_string, rewrite_definition_value,
    rewrite_parsed_definition, DefinitionError, RewrittenDefinition, StepOutcome, StepRewrite, WorkflowDefinition, SUBSTITUTION_MACRO_KEY,
};
pub use scan::{is_state_machine, scan_and_rewrite, scan_and_rewrite_with, STATE_MACHINE_RESOURCE_TYPE};
