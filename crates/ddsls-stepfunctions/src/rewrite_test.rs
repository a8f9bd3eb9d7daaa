use super::{
    parse_and_rewrite, rewrite_definition, rewrite_definition_string, rewrite_definition_value, rewrite_parsed_definition,
    DefinitionError, StepOutcome, WorkflowDefinition,
};
use crate::inject::{ContextField, Injection, SkipReason, JSON_MERGE_EXPRESSION};
use crate::log_sink::{LogLevel, MemoryLogSink};
use crate::StepKind;
use serde_json::{json, Value};

const MACHINE: &str = "fake-state-machine-name";

fn wrapped(definition: &Value) -> Value {
    json!({"Fn::Sub": [definition.to_string(), {}]})
}

fn unwrap_definition(wrapped: &Value) -> Value {
    let text = wrapped["Fn::Sub"][0].as_str().expect("definition slot must hold a string");
    serde_json::from_str(text).expect("rewritten definition must be JSON")
}

fn lambda_step(parameters: Value) -> Value {
    json!({
        "Comment": "fake comment",
        "StartAt": "InvokeLambda",
        "States": {
            "InvokeLambda": {
                "Type": "Task",
                "Parameters": parameters,
                "Resource": "arn:aws:states:::lambda:invoke",
                "End": true
            }
        }
    })
}

#[test]
fn lambda_step_without_payload_gets_context_selector() {
    let mut definition = wrapped(&lambda_step(json!({"FunctionName": "fake-function-name"})));
    let sink = MemoryLogSink::new();

    rewrite_definition(&mut definition, &sink, MACHINE).expect("rewrite must succeed");

    let after = unwrap_definition(&definition);
    assert_eq!(
        after["States"]["InvokeLambda"]["Parameters"]["Payload.$"],
        "$$['Execution', 'State', 'StateMachine']"
    );
    let info = sink.messages(LogLevel::Info);
    assert_eq!(info.len(), 1);
    assert!(info[0].contains("InvokeLambda"));
    assert!(info[0].contains(MACHINE));
}

#[test]
fn lambda_step_with_default_payload_is_merged() {
    let mut definition = wrapped(&lambda_step(json!({"FunctionName": "fake-function-name", "Payload.$": "$"})));

    rewrite_definition(&mut definition, &MemoryLogSink::new(), MACHINE).expect("rewrite must succeed");

    let after = unwrap_definition(&definition);
    assert_eq!(
        after["States"]["InvokeLambda"]["Parameters"]["Payload.$"],
        "States.JsonMerge($$, $, false)"
    );
}

#[test]
fn customized_payload_expression_is_preserved_with_warning() {
    let mut definition = wrapped(&lambda_step(json!({
        "FunctionName": "fake-function-name",
        "Payload.$": "something-customized"
    })));
    let sink = MemoryLogSink::new();

    rewrite_definition(&mut definition, &sink, MACHINE).expect("rewrite must succeed");

    let after = unwrap_definition(&definition);
    assert_eq!(
        after["States"]["InvokeLambda"]["Parameters"]["Payload.$"],
        "something-customized"
    );
    let warnings = sink.messages(LogLevel::Warn);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("Parameters.Payload.$ has been set"));
}

#[test]
fn partial_payload_object_is_merged() {
    let mut definition = wrapped(&lambda_step(json!({"FunctionName": "f", "Payload": {"CustomerId": 42}})));

    rewrite_definition(&mut definition, &MemoryLogSink::new(), MACHINE).expect("rewrite must succeed");

    let after = unwrap_definition(&definition);
    assert_eq!(
        after["States"]["InvokeLambda"]["Parameters"]["Payload"],
        json!({
            "CustomerId": 42,
            "Execution.$": "$$.Execution",
            "State.$": "$$.State",
            "StateMachine.$": "$$.StateMachine"
        })
    );
}

#[test]
fn non_invocation_steps_are_byte_identical() {
    let original = r#"{"Comment":"fake comment","StartAt":"InvokeDynamodb","States":{"InvokeDynamodb":{"Type":"Task","Parameters":{"someKey":"someValue"},"Resource":"arn:aws:states:::dynamodb:updateItem","End":true}}}"#;
    let mut definition = json!({"Fn::Sub": [original, {}]});
    let sink = MemoryLogSink::new();

    rewrite_definition(&mut definition, &sink, MACHINE).expect("rewrite must succeed");

    assert_eq!(definition["Fn::Sub"][0], original);
    assert!(sink.lines().is_empty());
}

#[test]
fn empty_macro_argument_list_is_a_no_op() {
    let mut definition = json!({"Fn::Sub": []});

    rewrite_definition(&mut definition, &MemoryLogSink::new(), MACHINE).expect("must not fail");

    assert_eq!(definition, json!({"Fn::Sub": []}));
}

#[test]
fn unexpected_wrapper_shapes_are_no_ops() {
    for shape in [
        json!({"Fn::Sub": "not-a-list"}),
        json!({"Fn::Sub": [{"not": "a string"}, {}]}),
        json!({"Fn::Join": ["", ["a", "b"]]}),
        json!(["Fn::Sub"]),
        json!(12),
    ] {
        let mut definition = shape.clone();
        rewrite_definition(&mut definition, &MemoryLogSink::new(), MACHINE).expect("must not fail");
        assert_eq!(definition, shape);
    }
}

#[test]
fn substitution_map_is_untouched() {
    let vars = json!({"HelloArn": {"Fn::GetAtt": ["Hello", "Arn"]}});
    let mut definition = json!({
        "Fn::Sub": [lambda_step(json!({"FunctionName": "${HelloArn}"})).to_string(), vars.clone()]
    });

    rewrite_definition(&mut definition, &MemoryLogSink::new(), MACHINE).expect("rewrite must succeed");

    assert_eq!(definition["Fn::Sub"][1], vars);
    let after = unwrap_definition(&definition);
    assert_eq!(after["States"]["InvokeLambda"]["Parameters"]["FunctionName"], "${HelloArn}");
}

#[test]
fn malformed_definition_propagates() {
    let mut definition = json!({"Fn::Sub": ["{not json", {}]});

    let error = rewrite_definition(&mut definition, &MemoryLogSink::new(), MACHINE).expect_err("must fail");

    assert!(matches!(error, DefinitionError::Malformed { .. }));
    assert_eq!(error.workflow(), MACHINE);
    assert_eq!(definition["Fn::Sub"][0], "{not json");
}

#[test]
fn definition_that_is_not_an_object_is_malformed() {
    let error = rewrite_definition_string("[1, 2]", &MemoryLogSink::new(), MACHINE).expect_err("must fail");
    assert!(matches!(error, DefinitionError::Malformed { .. }));
}

#[test]
fn definition_without_states_round_trips() {
    let rewritten = rewrite_definition_string(r#"{"Comment":"empty","StartAt":"A"}"#, &MemoryLogSink::new(), MACHINE)
        .expect("must succeed");
    assert_eq!(rewritten, r#"{"Comment":"empty","StartAt":"A"}"#);
}

#[test]
fn bare_string_entry_point_returns_new_definition() {
    let original = r#"{"Comment":"Some comment","StartAt":"agocsTest1","States":{"agocsTest1":{"Type":"Task","Resource":"arn:aws:states:::states:startExecution.sync:2","Parameters":{"StateMachineArn":"arn:aws:states:::states:startExecution.sync:2","Input":{"foo":"bar"}},"End":true}}}"#;

    let rewritten = rewrite_definition_string(original, &MemoryLogSink::new(), MACHINE).expect("must succeed");

    let after: Value = serde_json::from_str(&rewritten).expect("must be JSON");
    assert_eq!(
        after["States"]["agocsTest1"]["Parameters"]["Input"],
        json!({"foo": "bar", "CONTEXT.$": "States.JsonMerge($$, $, false)"})
    );
}

#[test]
fn nested_workflow_with_empty_input_gets_context() {
    let definition = json!({
        "StartAt": "Child",
        "States": {
            "Child": {
                "Type": "Task",
                "Resource": "arn:aws:states:::states:startExecution",
                "Parameters": {"StateMachineArn": "arn:aws:states:us-east-1:123456789012:stateMachine:child", "Input": {}},
                "End": true
            }
        }
    });
    let mut value = Value::String(definition.to_string());

    rewrite_definition_value(&mut value, &MemoryLogSink::new(), MACHINE).expect("must succeed");

    let after: Value = serde_json::from_str(value.as_str().expect("still a string")).expect("must be JSON");
    assert_eq!(after["States"]["Child"]["Parameters"]["Input"]["CONTEXT.$"], JSON_MERGE_EXPRESSION);
}

#[test]
fn steps_without_object_parameters_are_skipped_with_warning() {
    let definition = json!({
        "StartAt": "Legacy",
        "States": {
            "Legacy": {
                "Type": "Task",
                "Resource": "arn:aws:lambda:us-east-1:123456789012:function:hello",
                "End": true
            },
            "Stringly": {
                "Type": "Task",
                "Resource": "arn:aws:states:::lambda:invoke",
                "Parameters": "oops",
                "End": true
            }
        }
    });
    let sink = MemoryLogSink::new();

    let rewritten = rewrite_definition_string(&definition.to_string(), &sink, MACHINE).expect("must succeed");

    assert_eq!(rewritten, definition.to_string());
    let warnings = sink.messages(LogLevel::Warn);
    assert_eq!(warnings.len(), 2);
    assert!(warnings.iter().all(|line| line.contains("Parameters field is not a JSON object")));
}

#[test]
fn parsed_rewrite_reports_each_candidate_step() {
    let definition: WorkflowDefinition = serde_json::from_value(json!({
        "StartAt": "A",
        "States": {
            "A": {"Type": "Task", "Resource": "arn:aws:states:::lambda:invoke", "Parameters": {"FunctionName": "a"}, "Next": "B"},
            "B": {"Type": "Task", "Resource": "arn:aws:states:::dynamodb:putItem", "Parameters": {}, "Next": "C"},
            "C": {"Type": "Task", "Resource": "arn:aws:states:::lambda:invoke", "Parameters": {"Payload": 3}, "End": true}
        }
    }))
    .expect("fixture must deserialize");

    let rewritten = rewrite_parsed_definition(definition);

    assert!(rewritten.changed());
    assert_eq!(rewritten.steps.len(), 2);
    assert_eq!(rewritten.steps[0].step, "A");
    assert_eq!(rewritten.steps[0].kind, StepKind::LambdaInvokeApi);
    assert!(matches!(
        rewritten.steps[0].outcome,
        StepOutcome::Injected {
            field: ContextField::Payload,
            injection: Injection::SetExpression { .. }
        }
    ));
    assert_eq!(
        rewritten.steps[1].outcome,
        StepOutcome::Left {
            field: ContextField::Payload,
            reason: SkipReason::NonObjectField
        }
    );
    assert_eq!(rewritten.steps[1].path.to_string(), "$.States.C");
}

#[test]
fn nested_parallel_and_map_states_are_walked() {
    let definition: WorkflowDefinition = serde_json::from_value(json!({
        "StartAt": "Fan",
        "States": {
            "Fan": {
                "Type": "Parallel",
                "Branches": [
                    {"StartAt": "Left", "States": {"Left": {"Type": "Task", "Resource": "arn:aws:states:::lambda:invoke", "Parameters": {"FunctionName": "l"}, "End": true}}}
                ],
                "Next": "Each"
            },
            "Each": {
                "Type": "Map",
                "ItemProcessor": {"StartAt": "Item", "States": {"Item": {"Type": "Task", "Resource": "arn:aws:states:::lambda:invoke", "Parameters": {"FunctionName": "i"}, "End": true}}},
                "End": true
            }
        }
    }))
    .expect("fixture must deserialize");

    let rewritten = rewrite_parsed_definition(definition);

    let paths = rewritten
        .steps
        .iter()
        .map(|step| step.path.to_string())
        .collect::<Vec<_>>();
    assert_eq!(
        paths,
        [
            "$.States.Fan.Branches[0].States.Left",
            "$.States.Each.ItemProcessor.States.Item"
        ]
    );
    let fan = rewritten.definition.step("Fan").expect("Fan must exist");
    assert_eq!(
        fan["Branches"][0]["States"]["Left"]["Parameters"]["Payload.$"],
        "$$['Execution', 'State', 'StateMachine']"
    );
}

#[test]
fn rewriting_twice_equals_rewriting_once() {
    let definition = json!({
        "StartAt": "A",
        "States": {
            "A": {"Type": "Task", "Resource": "arn:aws:states:::lambda:invoke", "Parameters": {"FunctionName": "a"}, "Next": "B"},
            "B": {"Type": "Task", "Resource": "arn:aws:states:::lambda:invoke", "Parameters": {"Payload": {"x": 1}}, "Next": "C"},
            "C": {"Type": "Task", "Resource": "arn:aws:states:::lambda:invoke", "Parameters": {"Payload.$": "$"}, "Next": "D"},
            "D": {"Type": "Task", "Resource": "arn:aws:states:::states:startExecution.sync:2", "Parameters": {"StateMachineArn": "x"}, "Next": "E"},
            "E": {"Type": "Task", "Resource": "arn:aws:states:::states:startExecution", "Parameters": {"Input": {"a": 1}}, "End": true}
        }
    });
    let sink = MemoryLogSink::new();
    let mut value = wrapped(&definition);

    rewrite_definition(&mut value, &sink, MACHINE).expect("first pass");
    let once = value.clone();
    rewrite_definition(&mut value, &sink, MACHINE).expect("second pass");

    assert_eq!(value, once);
}

fn nested_workflow_step(parameters: Value) -> Value {
    json!({
        "StartAt": "StartChild",
        "States": {
            "StartChild": {
                "Type": "Task",
                "Resource": "arn:aws:states:::states:startExecution.sync:2",
                "Parameters": parameters,
                "End": true
            }
        }
    })
}

#[test]
fn nested_workflow_with_scalar_input_is_left_with_warning() {
    let mut definition = wrapped(&nested_workflow_step(json!({"StateMachineArn": "arn", "Input": "raw"})));
    let sink = MemoryLogSink::new();

    rewrite_definition(&mut definition, &sink, MACHINE).expect("rewrite must succeed");

    let after = unwrap_definition(&definition);
    assert_eq!(after["States"]["StartChild"]["Parameters"], json!({"StateMachineArn": "arn", "Input": "raw"}));
    let warnings = sink.messages(LogLevel::Warn);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("Parameters.Input is not a JSON object"));
    assert!(warnings[0].contains("StartChild"));
}

#[test]
fn nested_workflow_with_custom_input_expression_is_left_with_warning() {
    let mut definition = wrapped(&nested_workflow_step(json!({"StateMachineArn": "arn", "Input.$": "$.custom"})));
    let sink = MemoryLogSink::new();

    rewrite_definition(&mut definition, &sink, MACHINE).expect("rewrite must succeed");

    let after = unwrap_definition(&definition);
    assert_eq!(after["States"]["StartChild"]["Parameters"]["Input.$"], "$.custom");
    let warnings = sink.messages(LogLevel::Warn);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("Parameters.Input.$ has been set"));
}

#[test]
fn parse_and_rewrite_reports_steps_without_logging() {
    let text = lambda_step(json!({"FunctionName": "f"})).to_string();

    let rewritten = parse_and_rewrite(text.as_str(), MACHINE).expect("rewrite must succeed");

    assert!(rewritten.changed());
    assert_eq!(rewritten.steps.len(), 1);
    assert_eq!(rewritten.steps[0].step, "InvokeLambda");
}

#[test]
fn parse_and_rewrite_names_the_workflow_on_malformed_input() {
    let error = parse_and_rewrite("{\"States\":", MACHINE).expect_err("malformed input must fail");

    assert!(matches!(error, DefinitionError::Malformed { ref workflow, .. } if workflow == MACHINE));
}
