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

//! Native hooks injected into the evaluation context.
//!
//! `__trace` records a step with a shallow snapshot of the visible top-level
//! state and doubles as the cooperative deadline check; `console.log`
//! records a log event. Both write into a [`TraceSink`] shared with the
//! request task, so partial traces survive a timeout.

use boa_engine::{
    js_string, object::JsObject, property::PropertyKey, Context, JsArgs, JsNativeError, JsResult,
    JsValue,
};
use boa_gc::{empty_trace, Finalize, Trace};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracepad_common::{Locals, TraceEvent};

/// Shared event buffer plus the wall-clock deadline for one evaluation.
#[derive(Clone)]
pub(crate) struct TraceSink {
    events: Arc<Mutex<Vec<TraceEvent>>>,
    deadline: Instant,
    budget: Duration,
    /// Global-object keys present before user code ran; the snapshot skips
    /// them so only user-created globals show up as locals.
    baseline: Arc<Mutex<HashSet<String>>>,
}

impl Finalize for TraceSink {}

// The sink holds no engine-managed values, so there is nothing to trace.
unsafe impl Trace for TraceSink {
    empty_trace!();
}

impl TraceSink {
    pub(crate) fn new(events: Arc<Mutex<Vec<TraceEvent>>>, budget: Duration) -> Self {
        Self {
            events,
            deadline: Instant::now() + budget,
            budget,
            baseline: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub(crate) fn push(&self, event: TraceEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }

    pub(crate) fn expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    pub(crate) fn budget_ms(&self) -> u128 {
        self.budget.as_millis()
    }

    pub(crate) fn set_baseline(&self, keys: HashSet<String>) {
        *self.baseline.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = keys;
    }

    fn in_baseline(&self, name: &str) -> bool {
        self.baseline
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(name)
    }
}

/// `__trace(line)`: records a step event with the current top-level state.
pub(crate) fn trace_step(
    _this: &JsValue,
    args: &[JsValue],
    sink: &TraceSink,
    context: &mut Context,
) -> JsResult<JsValue> {
    if sink.expired() {
        return Err(JsNativeError::error()
            .with_message(format!("execution timed out after {} ms", sink.budget_ms()))
            .into());
    }
    let line = args.get_or_undefined(0).to_u32(context)?;
    let locals = snapshot_locals(sink, context)?;
    sink.push(TraceEvent::step(line, locals));
    Ok(JsValue::undefined())
}

/// `console.log(...)`: scalars are string-coerced, everything else is
/// JSON-stringified, arguments are joined with single spaces.
pub(crate) fn console_log(
    _this: &JsValue,
    args: &[JsValue],
    sink: &TraceSink,
    context: &mut Context,
) -> JsResult<JsValue> {
    let mut parts = Vec::with_capacity(args.len());
    for arg in args {
        parts.push(render_argument(arg, context)?);
    }
    sink.push(TraceEvent::log(parts.join(" ")));
    Ok(JsValue::undefined())
}

fn render_argument(value: &JsValue, context: &mut Context) -> JsResult<String> {
    if value.is_object() {
        Ok(match value.to_json(context) {
            Ok(json) => json.to_string(),
            // Cyclic or otherwise unserializable values fall back to the
            // engine's display form.
            Err(_) => value.display().to_string(),
        })
    } else {
        Ok(value.to_string(context)?.to_std_string_escaped())
    }
}

/// Shallow snapshot of sandbox keys plus user-created globals.
fn snapshot_locals(sink: &TraceSink, context: &mut Context) -> JsResult<Locals> {
    let mut locals = Locals::new();
    let global = context.global_object();
    let sandbox = global.get(js_string!("sandbox"), context)?;
    if let Some(sandbox) = sandbox.as_object() {
        collect_own_entries(sandbox, None, &mut locals, context)?;
    }
    // Undeclared assignments in sloppy mode create global properties.
    collect_own_entries(&global, Some(sink), &mut locals, context)?;
    Ok(locals)
}

fn collect_own_entries(
    object: &JsObject,
    baseline: Option<&TraceSink>,
    out: &mut Locals,
    context: &mut Context,
) -> JsResult<()> {
    for key in object.own_property_keys(context)? {
        let PropertyKey::String(name) = &key else { continue };
        let name = name.to_std_string_escaped();
        if baseline.is_some_and(|sink| sink.in_baseline(&name)) {
            continue;
        }
        let value = object.get(key, context)?;
        out.insert(name, json_snapshot(&value, context));
    }
    Ok(())
}

/// Values are cloned per key; cyclic values are not expanded but rendered
/// as their display string.
fn json_snapshot(value: &JsValue, context: &mut Context) -> serde_json::Value {
    if value.is_undefined() {
        return serde_json::Value::Null;
    }
    value
        .to_json(context)
        .unwrap_or_else(|_| serde_json::Value::String(value.display().to_string()))
}
