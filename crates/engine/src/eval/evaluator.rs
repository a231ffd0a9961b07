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

//! Single-run execution of an instrumented program on a fresh engine
//! context.

use super::hooks::{self, TraceSink};
use boa_engine::{
    builtins::promise::PromiseState,
    js_string,
    object::{builtins::JsPromise, JsObject, ObjectInitializer},
    property::{Attribute, PropertyKey},
    Context, JsError, JsResult, NativeFunction, Source,
};
use std::collections::HashSet;

/// Backstop for loops with no probe in their body, so a wedged evaluation
/// thread cannot spin forever after the request has been answered.
const LOOP_ITERATION_LIMIT: u64 = 1 << 24;

/// Runs `instrumented` to completion, pushing events into the sink.
///
/// Returns the failure message on a runtime error; the deadline firing is a
/// runtime error like any other.
pub(crate) fn execute(instrumented: &str, sink: &TraceSink) -> Result<(), String> {
    let mut context = Context::default();
    context.runtime_limits_mut().set_loop_iteration_limit(LOOP_ITERATION_LIMIT);

    install_runtime(&mut context, sink).map_err(|e| e.to_string())?;

    let evaluated = context.eval(Source::from_bytes(instrumented));
    // Drain the microtask queue so the async wrapper settles.
    let _ = context.run_jobs();

    let value = match evaluated {
        Ok(value) => value,
        Err(error) => return Err(error_message(&error, &mut context)),
    };

    // The wrapper evaluates to a promise; a rejection is the user program
    // throwing.
    if let Some(object) = value.as_object() {
        if let Ok(promise) = JsPromise::from_object(object.clone()) {
            if let PromiseState::Rejected(reason) = promise.state() {
                return Err(error_message(&JsError::from_opaque(reason), &mut context));
            }
        }
    }

    Ok(())
}

/// Populates a fresh context with exactly the bindings the instrumented
/// program expects: `sandbox`, `console.log`, and `__trace`.
fn install_runtime(context: &mut Context, sink: &TraceSink) -> JsResult<()> {
    let sandbox = JsObject::with_object_proto(context.intrinsics());
    context.register_global_property(js_string!("sandbox"), sandbox, Attribute::all())?;

    let log_fn =
        NativeFunction::from_copy_closure_with_captures(hooks::console_log, sink.clone());
    let console = ObjectInitializer::new(context)
        .function(log_fn, js_string!("log"), 0)
        .build();
    context.register_global_property(js_string!("console"), console, Attribute::all())?;

    let trace_fn =
        NativeFunction::from_copy_closure_with_captures(hooks::trace_step, sink.clone());
    context.register_global_callable(js_string!("__trace"), 1, trace_fn)?;

    sink.set_baseline(global_keys(context)?);
    Ok(())
}

/// Own string-keyed properties of the global object, captured before user
/// code runs.
fn global_keys(context: &mut Context) -> JsResult<HashSet<String>> {
    let global = context.global_object();
    let mut keys = HashSet::new();
    for key in global.own_property_keys(context)? {
        if let PropertyKey::String(name) = key {
            keys.insert(name.to_std_string_escaped());
        }
    }
    Ok(keys)
}

/// Best-effort extraction of a `Kind: message` string from a thrown value.
fn error_message(error: &JsError, context: &mut Context) -> String {
    match error.try_native(context) {
        Ok(native) => native.to_string(),
        Err(_) => error.to_string(),
    }
}
