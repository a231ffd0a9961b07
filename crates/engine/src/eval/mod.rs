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

//! JavaScript evaluation with a wall-clock budget.
//!
//! The engine context is not `Send`, so each evaluation runs on a dedicated
//! worker thread while the request task waits on a channel with a timeout
//! margin. The event buffer is shared, which is what lets a timed-out
//! request return the partial trace. Inside the context the deadline is
//! enforced cooperatively by the `__trace` probe; the engine's loop
//! iteration limit backstops probe-free loops.

mod evaluator;
mod hooks;

use hooks::TraceSink;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tracepad_common::{ExecutionStatus, TraceDocument, TraceEvent};
use tracing::{debug, warn};

/// Extra time the request task waits beyond the in-context deadline before
/// declaring the worker wedged.
const WORKER_GRACE: Duration = Duration::from_millis(250);

/// Executes an instrumented program and collects its trace.
///
/// Never fails at this level: runtime errors (including the deadline
/// firing) are reported as an `Error` event plus `status = error`, with all
/// events collected up to that point preserved.
pub async fn evaluate(instrumented: &str, budget: Duration) -> TraceDocument {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = TraceSink::new(events.clone(), budget);

    let (tx, rx) = oneshot::channel();
    let program = instrumented.to_string();
    let worker_sink = sink.clone();
    let spawned = std::thread::Builder::new()
        .name("js-eval".to_string())
        .spawn(move || {
            let outcome = evaluator::execute(&program, &worker_sink);
            let _ = tx.send(outcome);
        });
    if let Err(e) = spawned {
        return TraceDocument::failed(Vec::new(), format!("failed to start evaluator: {e}"));
    }

    let outcome = match tokio::time::timeout(budget + WORKER_GRACE, rx).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(_)) => Err("evaluator terminated unexpectedly".to_string()),
        Err(_) => {
            // The worker is stuck in probe-free code; the loop iteration
            // limit will reap it eventually. Answer with what we have.
            warn!("evaluator exceeded its deadline without yielding");
            Err(format!("execution timed out after {} ms", budget.as_millis()))
        }
    };

    let collected = {
        let guard = events.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.clone()
    };

    match outcome {
        Ok(()) => {
            debug!(events = collected.len(), "evaluation finished");
            TraceDocument {
                events: collected,
                status: ExecutionStatus::Ok,
                error: None,
                stdout: None,
            }
        }
        Err(message) => {
            debug!(events = collected.len(), %message, "evaluation failed");
            let mut events = collected;
            events.push(TraceEvent::error(&message));
            TraceDocument {
                events,
                status: ExecutionStatus::Error,
                error: Some(message),
                stdout: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrumentation::instrument;
    use tracepad_common::Locals;

    async fn run(source: &str) -> TraceDocument {
        let instrumented = instrument(source).unwrap();
        evaluate(&instrumented, Duration::from_millis(1000)).await
    }

    fn step_lines(doc: &TraceDocument) -> Vec<u32> {
        doc.events
            .iter()
            .filter(|e| matches!(e, TraceEvent::Step { .. }))
            .filter_map(TraceEvent::line)
            .collect()
    }

    #[tokio::test]
    async fn test_straight_line_steps_in_source_order() {
        let doc = run("let x = 1;\nlet y = 2;\nconsole.log(x + y);").await;
        assert!(!doc.is_error());
        assert_eq!(step_lines(&doc), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_log_event_joins_and_renders_json() {
        let doc = run("console.log(\"a\", 1, {b: 2});").await;
        assert!(!doc.is_error());
        let logs: Vec<_> = doc
            .events
            .iter()
            .filter_map(|e| match e {
                TraceEvent::Log { value } => Some(value.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(logs, vec!["a 1 {\"b\":2}".to_string()]);
    }

    #[tokio::test]
    async fn test_locals_track_mirrored_declarations() {
        let doc = run("let x = 1;\nx = x + 1;\nconsole.log(x);").await;
        assert!(!doc.is_error());
        let last_locals: &Locals = doc
            .events
            .iter()
            .rev()
            .find_map(|e| match e {
                TraceEvent::Step { locals, .. } => Some(locals),
                _ => None,
            })
            .unwrap();
        // The step before line 3 sees the incremented value.
        assert_eq!(last_locals.get("x").and_then(serde_json::Value::as_f64), Some(2.0));
    }

    #[tokio::test]
    async fn test_thrown_error_is_reported_with_partial_events() {
        let doc = run("throw new Error(\"boom\");").await;
        assert!(doc.is_error());
        match doc.events.last().unwrap() {
            TraceEvent::Error { message } => assert!(message.contains("boom")),
            other => panic!("expected error event, got {other:?}"),
        }
        // The probe before the throw still ran.
        assert_eq!(step_lines(&doc), vec![1]);
    }

    #[tokio::test]
    async fn test_infinite_loop_hits_deadline() {
        let instrumented = instrument("while (true) { x = 1; }").unwrap();
        let doc = evaluate(&instrumented, Duration::from_millis(150)).await;
        assert!(doc.is_error());
        assert!(doc.error.as_deref().unwrap().contains("timed out"));
        // Partial events from before the deadline are preserved.
        assert!(!doc.events.is_empty());
    }

    #[tokio::test]
    async fn test_loop_counter_visible_in_snapshots() {
        let doc = run("let total = 0;\nfor (let i = 0; i < 3; i++) {\n  total += i;\n}\nconsole.log(total);").await;
        assert!(!doc.is_error());
        let final_step_locals = doc
            .events
            .iter()
            .rev()
            .find_map(|e| match e {
                TraceEvent::Step { locals, .. } => Some(locals),
                _ => None,
            })
            .unwrap();
        assert_eq!(
            final_step_locals.get("total").and_then(serde_json::Value::as_f64),
            Some(3.0)
        );
    }

    #[tokio::test]
    async fn test_undeclared_assignment_shows_up_in_locals() {
        let doc = run("y = 41;\ny = y + 1;\nconsole.log(y);").await;
        assert!(!doc.is_error());
        let last = doc
            .events
            .iter()
            .rev()
            .find_map(|e| match e {
                TraceEvent::Step { locals, .. } => Some(locals),
                _ => None,
            })
            .unwrap();
        assert_eq!(last.get("y").and_then(serde_json::Value::as_f64), Some(42.0));
    }
}
