use crate::field_path::FieldPath;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredIssue {
    pub kind: String,
    pub severity: IssueSeverity,
    /// Logical id of the function or template resource the issue is about.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    pub field_path: FieldPath,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related: Option<Value>,
}

impl StructuredIssue {
    pub fn error(
        kind: impl Into<String>,
        field_path: FieldPath,
        message: impl Into<String>,
        reference: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            severity: IssueSeverity::Error,
            resource: None,
            field_path,
            message: message.into(),
            reference: Some(reference.into()),
            related: None,
        }
    }

    pub fn warning(
        kind: impl Into<String>,
        field_path: FieldPath,
        message: impl Into<String>,
        reference: impl Into<String>,
    ) -> Self {
        Self {
            severity: IssueSeverity::Warning,
            ..Self::error(kind, field_path, message, reference)
        }
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == IssueSeverity::Error
    }

    pub fn sort_stable(issues: &mut [Self]) {
        issues.sort_by(|left, right| {
            (
                left.severity,
                &left.kind,
                &left.field_path,
                &left.message,
                &left.resource,
            )
                .cmp(&(
                    right.severity,
                    &right.kind,
                    &right.field_path,
                    &right.message,
                    &right.resource,
                ))
        });
    }
}

impl Display for StructuredIssue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let severity = match self.severity {
            IssueSeverity::Error => "error",
            IssueSeverity::Warning => "warning",
            IssueSeverity::Info => "info",
        };
        write!(f, "{severity}[{}] {}: {}", self.kind, self.field_path, self.message)?;
        if let Some(reference) = &self.reference {
            write!(f, " ({reference})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "issues_test.rs"]
mod tests;
