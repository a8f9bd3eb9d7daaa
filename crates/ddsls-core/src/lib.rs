//! Shared diagnostics for the instrumentation crates: locations inside
//! service documents and deployment templates, and the issues reported
//! against them.

pub mod field_path;
pub mod issues;

pub use field_path::{FieldPath, FieldPathParseError, FieldPathSegment};
pub use issues::{IssueSeverity, StructuredIssue};
