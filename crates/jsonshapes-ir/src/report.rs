//! Data-level reports returned by validation and merging.
//!
//! Neither report is an error type: a caller such as a form UI wants every
//! violation or conflict at once, so they are collected and returned as data.

use crate::Path;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// A single path-tagged disagreement between data and shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub path: Path,
    pub message: String,
    pub severity: Severity,
}

impl Violation {
    pub fn error(path: Path, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
            severity: Severity::Error,
        }
    }

    pub fn warning(path: Path, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
            severity: Severity::Warning,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{level} at {}: {}", self.path, self.message)
    }
}

/// Ordered violations. An empty result means the data is valid.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationResult {
    violations: Vec<Violation>,
}

impl ValidationResult {
    pub fn new(violations: Vec<Violation>) -> Self {
        Self { violations }
    }

    /// True when no violation has [`Severity::Error`].
    pub fn is_valid(&self) -> bool {
        self.violations
            .iter()
            .all(|v| v.severity != Severity::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn errors(&self) -> impl Iterator<Item = &Violation> {
        self.violations
            .iter()
            .filter(|v| v.severity == Severity::Error)
    }

    /// Violations located exactly at `path`.
    pub fn at(&self, path: &Path) -> Vec<&Violation> {
        self.violations.iter().filter(|v| &v.path == path).collect()
    }

    pub fn into_violations(self) -> Vec<Violation> {
        self.violations
    }
}

impl IntoIterator for ValidationResult {
    type Item = Violation;
    type IntoIter = std::vec::IntoIter<Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.violations.into_iter()
    }
}

/// Two values that could not be reconciled at `path`.
///
/// A side is `None` when the value was absent from that input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub path: Path,
    pub left: Option<Value>,
    pub right: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", content = "value", rename_all = "snake_case")]
pub enum MergeResult {
    Merged(Value),
    Conflicts(Vec<Conflict>),
}

impl MergeResult {
    pub fn is_merged(&self) -> bool {
        matches!(self, MergeResult::Merged(_))
    }

    pub fn merged(&self) -> Option<&Value> {
        match self {
            MergeResult::Merged(value) => Some(value),
            MergeResult::Conflicts(_) => None,
        }
    }

    pub fn conflicts(&self) -> &[Conflict] {
        match self {
            MergeResult::Merged(_) => &[],
            MergeResult::Conflicts(conflicts) => conflicts,
        }
    }
}
