//! Validation findings reported against contract records.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Origin of a validation finding.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViolationKind {
    /// The record text could not be decoded at all.
    Parse,
    /// A field was missing, mistyped, or carried an unknown enumeration value.
    Schema,
    /// A cross-field business rule failed.
    Business,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Parse => "parse",
            Self::Schema => "schema",
            Self::Business => "business",
        })
    }
}

/// A single `{path, message}` finding.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    kind: ViolationKind,
    path: String,
    message: String,
}

impl Violation {
    /// Creates a finding of the supplied kind.
    #[must_use]
    pub fn new(kind: ViolationKind, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a schema finding.
    #[must_use]
    pub fn schema(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ViolationKind::Schema, path, message)
    }

    /// Creates a business-rule finding.
    #[must_use]
    pub fn business(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ViolationKind::Business, path, message)
    }

    /// Creates a parse finding rooted at the whole record.
    #[must_use]
    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ViolationKind::Parse, "root", message)
    }

    /// Returns the finding kind.
    #[must_use]
    pub const fn kind(&self) -> ViolationKind {
        self.kind
    }

    /// Returns the dotted path of the offending field.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// How a configurable business rule reports a failure.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleSeverity {
    /// The rule is not evaluated.
    Off,
    /// Failures are logged and never block registration.
    #[default]
    Warning,
    /// Failures block registration.
    Error,
}
