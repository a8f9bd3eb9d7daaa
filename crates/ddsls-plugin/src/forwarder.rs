use ddsls_stepfunctions::LogSink;
use serde_json::{json, Map, Value};

pub const LOG_GROUP_RESOURCE_TYPE: &str = "AWS::Logs::LogGroup";
pub const SUBSCRIPTION_FILTER_RESOURCE_TYPE: &str = "AWS::Logs::SubscriptionFilter";

/// CloudWatch accepts at most this many subscription filters per log group.
pub const MAX_SUBSCRIPTIONS_PER_LOG_GROUP: usize = 2;

/// Subscribes every log group in `resources` to the forwarder. Log groups
/// already subscribed to `forwarder_arn`, or already at the filter limit,
/// are skipped. Returns the names of the subscription resources added.
pub fn add_forwarder_subscriptions(
    resources: &mut Map<String, Value>,
    forwarder_arn: &str,
    sink: &dyn LogSink,
) -> Vec<String> {
    let mut planned = Vec::new();
    for (name, resource) in resources.iter() {
        if resource_type(resource) != Some(LOG_GROUP_RESOURCE_TYPE) {
            continue;
        }
        let subscription_name = format!("{name}Subscription");
        if resources.contains_key(&subscription_name) {
            continue;
        }
        let existing: Vec<&Value> = subscriptions_of(resources, name).collect();
        if existing
            .iter()
            .any(|filter| filter.pointer("/Properties/DestinationArn").and_then(Value::as_str) == Some(forwarder_arn))
        {
            continue;
        }
        if existing.len() >= MAX_SUBSCRIPTIONS_PER_LOG_GROUP {
            sink.warn(&format!(
                "[Warn] Log group {name} already has {} subscription filters; not subscribing it to the forwarder.",
                existing.len()
            ));
            continue;
        }
        planned.push((name.clone(), subscription_name));
    }

    planned
        .into_iter()
        .map(|(log_group, subscription_name)| {
            resources.insert(
                subscription_name.clone(),
                json!({
                    "Type": SUBSCRIPTION_FILTER_RESOURCE_TYPE,
                    "Properties": {
                        "DestinationArn": forwarder_arn,
                        "FilterPattern": "",
                        "LogGroupName": {"Ref": log_group}
                    }
                }),
            );
            subscription_name
        })
        .collect()
}

fn resource_type(resource: &Value) -> Option<&str> {
    resource.get("Type").and_then(Value::as_str)
}

fn subscriptions_of<'a>(resources: &'a Map<String, Value>, log_group: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
    resources.values().filter(move |resource| {
        resource_type(resource) == Some(SUBSCRIPTION_FILTER_RESOURCE_TYPE)
            && resource.pointer("/Properties/LogGroupName/Ref").and_then(Value::as_str) == Some(log_group)
    })
}

#[cfg(test)]
#[path = "forwarder_test.rs"]
mod tests;
