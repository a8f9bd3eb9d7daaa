use super::{instrument, InstrumentOptions, PluginError};
use crate::config::ConfigError;
use crate::layers::LayerTable;
use ddsls_stepfunctions::{DefinitionError, LogLevel, MemoryLogSink, JSON_MERGE_EXPRESSION};
use serde_json::{json, Value};

const FORWARDER: &str = "arn:aws:lambda:us-east-1:123456789012:function:datadog-forwarder";

fn service(datadog: Value) -> Value {
    json!({
        "service": "orders",
        "provider": {"name": "aws", "runtime": "nodejs12.x", "region": "us-east-1", "stage": "dev"},
        "custom": {"datadog": datadog},
        "functions": {
            "create": {"handler": "src/create.handler"},
            "report": {"handler": "report.main", "runtime": "go1.x"}
        }
    })
}

fn layer_table() -> LayerTable {
    LayerTable::from_json(r#"{"regions": {"us-east-1": {"nodejs12.x": "arn:aws:lambda:us-east-1:464622532012:layer:Datadog-Node12-x:1"}}}"#)
        .expect("layer table must parse")
}

fn template() -> Value {
    json!({
        "Resources": {
            "CreateLogGroup": {"Type": "AWS::Logs::LogGroup"},
            "OrdersStateMachine": {
                "Type": "AWS::StepFunctions::StateMachine",
                "Properties": {"DefinitionString": {"Fn::Sub": [
                    "{\"StartAt\":\"Create\",\"States\":{\"Create\":{\"Type\":\"Task\",\"Resource\":\"arn:aws:states:::lambda:invoke\",\"Parameters\":{\"FunctionName\":\"create\"},\"End\":true}}}",
                    {}
                ]}}
            }
        },
        "Outputs": {}
    })
}

#[test]
fn service_only_pass_applies_every_service_step() {
    let mut service = service(json!({"enableXrayTracing": true}));
    let options = InstrumentOptions {
        layers: Some(layer_table()),
        ..InstrumentOptions::default()
    };
    let sink = MemoryLogSink::new();

    let report = instrument(&mut service, None, &options, &sink).expect("instrument must succeed");

    assert_eq!(report.unsupported, vec!["report".to_string()]);
    assert_eq!(report.layers.len(), 1);
    assert_eq!(report.redirected, vec!["create".to_string()]);
    assert!(report.tracing_enabled);
    assert_eq!(report.tagged.len(), 2);
    assert!(report.environment.contains(&"DD_SITE".to_string()));

    let create = &service["functions"]["create"];
    assert_eq!(create["handler"], json!("/opt/nodejs/node_modules/datadog-lambda-js/handler.handler"));
    assert_eq!(create["environment"]["DD_LAMBDA_HANDLER"], json!("src/create.handler"));
    assert_eq!(service["provider"]["tracing"], json!({"apiGateway": true, "lambda": true}));
    assert!(sink
        .messages(LogLevel::Warn)
        .iter()
        .any(|line| line.contains("report") && line.contains("go1.x")));
}

#[test]
fn template_pass_subscribes_merges_and_links() {
    let mut service = service(json!({
        "forwarder": FORWARDER,
        "mergeStepFunctionAndLambdaTraces": true,
        "addLayers": false
    }));
    let mut template = template();
    let options = InstrumentOptions {
        account_id: Some("123456789012".to_string()),
        ..InstrumentOptions::default()
    };

    let report = instrument(&mut service, Some(&mut template), &options, &MemoryLogSink::new())
        .expect("instrument must succeed");

    assert_eq!(report.subscriptions, vec!["CreateLogGroupSubscription".to_string()]);
    assert_eq!(report.state_machines, vec!["OrdersStateMachine".to_string()]);
    assert_eq!(report.outputs.len(), 2);

    let definition = template["Resources"]["OrdersStateMachine"]["Properties"]["DefinitionString"]["Fn::Sub"][0]
        .as_str()
        .expect("definition stays a string");
    let parsed: Value = serde_json::from_str(definition).expect("definition is json");
    assert_eq!(
        parsed["States"]["Create"]["Parameters"]["Payload.$"],
        json!("$$['Execution', 'State', 'StateMachine']")
    );
    assert_eq!(service["functions"]["create"]["handler"], json!("node_modules/datadog-lambda-js/handler.handler"));
}

#[test]
fn trace_merging_is_opt_in() {
    let mut service = service(json!({}));
    let mut template = template();
    let before = template["Resources"]["OrdersStateMachine"].clone();

    let report = instrument(&mut service, Some(&mut template), &InstrumentOptions::default(), &MemoryLogSink::new())
        .expect("instrument must succeed");

    assert!(report.state_machines.is_empty());
    assert!(report.subscriptions.is_empty());
    assert_eq!(template["Resources"]["OrdersStateMachine"], before);
    assert!(template["Outputs"].as_object().is_some_and(|outputs| outputs.is_empty()));
}

#[test]
fn invalid_configuration_aborts_before_changes() {
    let mut service = service(json!({"site": "example.com"}));
    let before = service.clone();

    let error = instrument(&mut service, None, &InstrumentOptions::default(), &MemoryLogSink::new())
        .expect_err("invalid site must fail");

    assert!(matches!(error, PluginError::Config(ConfigError::Validation(issues)) if issues.len() == 1));
    assert_eq!(service, before);
}

#[test]
fn malformed_definition_aborts_template_pass() {
    let mut service = service(json!({"mergeStepFunctionAndLambdaTraces": true}));
    let mut template = json!({"Resources": {
        "Broken": {
            "Type": "AWS::StepFunctions::StateMachine",
            "Properties": {"DefinitionString": "{not json"}
        }
    }});

    let error = instrument(&mut service, Some(&mut template), &InstrumentOptions::default(), &MemoryLogSink::new())
        .expect_err("malformed definition must fail");

    assert!(matches!(error, PluginError::Definition(DefinitionError::Malformed { ref workflow, .. }) if workflow == "Broken"));
}

#[test]
fn nested_workflow_steps_get_input_context() {
    let mut service = service(json!({"mergeStepFunctionAndLambdaTraces": true}));
    let mut template = json!({"Resources": {
        "Parent": {
            "Type": "AWS::StepFunctions::StateMachine",
            "Properties": {"DefinitionString": "{\"States\":{\"Child\":{\"Type\":\"Task\",\"Resource\":\"arn:aws:states:::states:startExecution.sync:2\",\"Parameters\":{\"StateMachineArn\":\"arn\"},\"End\":true}}}"}
        }
    }});

    instrument(&mut service, Some(&mut template), &InstrumentOptions::default(), &MemoryLogSink::new())
        .expect("instrument must succeed");

    let definition = template["Resources"]["Parent"]["Properties"]["DefinitionString"]
        .as_str()
        .expect("definition string");
    let parsed: Value = serde_json::from_str(definition).expect("definition is json");
    assert_eq!(parsed["States"]["Child"]["Parameters"]["Input.$"], json!(JSON_MERGE_EXPRESSION));
}

#[test]
fn region_override_applies_to_layers_and_output_links() {
    let mut service = json!({
        "service": "orders",
        "provider": {"name": "aws", "runtime": "nodejs12.x"},
        "functions": {"create": {"handler": "src/create.handler"}}
    });
    let mut template = json!({"Resources": {}, "Outputs": {}});
    let options = InstrumentOptions {
        region: Some("eu-west-1".to_string()),
        account_id: Some("123456789012".to_string()),
        layers: Some(
            LayerTable::from_json(
                r#"{"regions": {"eu-west-1": {"nodejs12.x": "arn:aws:lambda:eu-west-1:464622532012:layer:Datadog-Node12-x:1"}}}"#,
            )
            .expect("layer table must parse"),
        ),
    };

    let report = instrument(&mut service, Some(&mut template), &options, &MemoryLogSink::new())
        .expect("instrument must succeed");

    assert_eq!(report.layers.len(), 1);
    assert_eq!(report.layers[0].arn, "arn:aws:lambda:eu-west-1:464622532012:layer:Datadog-Node12-x:1");
    assert_eq!(
        template["Outputs"]["DatadogMonitorcreate"]["Value"],
        json!("https://app.datadoghq.com/functions/orders-dev-create:eu-west-1:123456789012:aws?source=sls-plugin")
    );
}
