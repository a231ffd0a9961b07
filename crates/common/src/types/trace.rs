// Tracepad - Interactive Code Tracing Service
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Trace event model shared by both execution backends.
//!
//! A trace is an ordered sequence of [`TraceEvent`]s, collected either by the
//! in-process JavaScript evaluator or by the external Python tracer. Events
//! serialize with an `event` discriminator field so that both backends produce
//! the same wire shape for the step-through client.

use serde::{Deserialize, Serialize};
use std::ops::{Deref, DerefMut};

/// Map of variable names to their snapshotted values.
///
/// Insertion order is preserved for display purposes only; it carries no
/// execution semantics.
pub type Locals = serde_json::Map<String, serde_json::Value>;

/// A single observable event during the execution of user code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TraceEvent {
    /// A program point just before executing the statement at `line`.
    Step {
        /// 1-based line of the statement about to execute.
        line: u32,
        /// Shallow snapshot of the visible top-level variables.
        #[serde(default)]
        locals: Locals,
        /// Function names on the call stack, outermost first. Only the
        /// Python backend reports this today.
        #[serde(rename = "callStack", default, skip_serializing_if = "Option::is_none")]
        call_stack: Option<Vec<String>>,
    },
    /// The value an interesting sub-expression evaluated to.
    Expr {
        /// 1-based line the expression starts on.
        line: u32,
        /// Source text of the expression.
        expr: String,
        /// Rendered value of the expression.
        value: serde_json::Value,
    },
    /// A user-visible console write.
    Log {
        /// Space-joined rendering of the logged arguments.
        value: String,
    },
    /// A terminal execution failure observed from inside evaluation.
    Error {
        /// Human-readable failure message.
        message: String,
    },
}

impl TraceEvent {
    /// Creates a step event without call stack information.
    pub fn step(line: u32, locals: Locals) -> Self {
        Self::Step { line, locals, call_stack: None }
    }

    /// Creates a log event.
    pub fn log(value: impl Into<String>) -> Self {
        Self::Log { value: value.into() }
    }

    /// Creates an error event.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error { message: message.into() }
    }

    /// The source line this event is anchored to, if any.
    pub fn line(&self) -> Option<u32> {
        match self {
            Self::Step { line, .. } | Self::Expr { line, .. } => Some(*line),
            Self::Log { .. } | Self::Error { .. } => None,
        }
    }

    /// Call stack depth of this event. Events without a recorded call stack
    /// are treated as depth 0.
    pub fn stack_depth(&self) -> usize {
        match self {
            Self::Step { call_stack, .. } => call_stack.as_ref().map_or(0, Vec::len),
            _ => 0,
        }
    }
}

/// Outcome of an execution run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    /// The program ran to completion.
    #[default]
    Ok,
    /// The program failed at runtime (or the tracer reported a failure).
    Error,
}

/// An ordered, finite sequence of trace events plus run metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraceDocument {
    /// Events in execution order.
    pub events: Vec<TraceEvent>,
    /// Whether the run completed or failed.
    pub status: ExecutionStatus,
    /// Failure message when `status` is [`ExecutionStatus::Error`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Concatenated standard output. Only produced by the Python backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
}

impl TraceDocument {
    /// Creates a failed document carrying `message` and any events collected
    /// before the failure.
    pub fn failed(events: Vec<TraceEvent>, message: impl Into<String>) -> Self {
        Self {
            events,
            status: ExecutionStatus::Error,
            error: Some(message.into()),
            stdout: None,
        }
    }

    /// Whether the run failed.
    pub fn is_error(&self) -> bool {
        self.status == ExecutionStatus::Error
    }
}

impl Deref for TraceDocument {
    type Target = Vec<TraceEvent>;

    fn deref(&self) -> &Self::Target {
        &self.events
    }
}

impl DerefMut for TraceDocument {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_step_event_serializes_with_discriminator() {
        let mut locals = Locals::new();
        locals.insert("x".to_string(), json!(1));
        let event = TraceEvent::step(3, locals);

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "step");
        assert_eq!(value["line"], 3);
        assert_eq!(value["locals"]["x"], 1);
        assert!(value.get("callStack").is_none());
    }

    #[test]
    fn test_call_stack_field_name() {
        let event = TraceEvent::Step {
            line: 1,
            locals: Locals::new(),
            call_stack: Some(vec!["<module>".to_string(), "f".to_string()]),
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["callStack"], json!(["<module>", "f"]));
        assert_eq!(event.stack_depth(), 2);
    }

    #[test]
    fn test_tracer_step_deserializes() {
        let raw = json!({
            "event": "step",
            "line": 7,
            "locals": {"n": "3"},
            "callStack": ["<module>"]
        });

        let event: TraceEvent = serde_json::from_value(raw).unwrap();
        assert_eq!(event.line(), Some(7));
        assert_eq!(event.stack_depth(), 1);
    }

    #[test]
    fn test_expr_event_round_trip() {
        let raw = json!({
            "event": "expr",
            "line": 2,
            "expr": "a + b",
            "value": "5"
        });

        let event: TraceEvent = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(serde_json::to_value(&event).unwrap(), raw);
    }

    #[test]
    fn test_log_and_error_have_no_line() {
        assert_eq!(TraceEvent::log("hi").line(), None);
        assert_eq!(TraceEvent::error("boom").line(), None);
    }

    #[test]
    fn test_failed_document_keeps_partial_events() {
        let doc = TraceDocument::failed(vec![TraceEvent::log("before")], "boom");
        assert!(doc.is_error());
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.error.as_deref(), Some("boom"));
    }
}
