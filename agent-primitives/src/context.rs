//! Per-invocation execution context.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ids::TraceId;

/// Caller-declared urgency of an invocation.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Background work.
    Low,
    /// Normal work.
    #[default]
    Medium,
    /// Urgent work.
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        })
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(Error::UnknownVariant {
                field: "priority",
                value: s.to_owned(),
            }),
        }
    }
}

/// Transient context created for one invocation and dropped once it resolves.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionContext {
    trace_id: TraceId,
    #[serde(default)]
    priority: Priority,
    #[serde(default)]
    context_window: Vec<String>,
}

impl ExecutionContext {
    /// Creates a context with a fresh trace id, medium priority, and no history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses the supplied trace id.
    #[must_use]
    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = trace_id;
        self
    }

    /// Sets the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the ordered prior text fragments.
    #[must_use]
    pub fn with_context_window(mut self, fragments: Vec<String>) -> Self {
        self.context_window = fragments;
        self
    }

    /// Returns the trace id.
    #[must_use]
    pub const fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    /// Returns the priority.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Returns the prior text fragments in order.
    #[must_use]
    pub fn context_window(&self) -> &[String] {
        &self.context_window
    }
}
