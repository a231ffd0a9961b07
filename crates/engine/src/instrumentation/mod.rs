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

//! JavaScript source instrumentation.
//!
//! Rewrites user source so that executing it reports a `Step` event before
//! every statement while preserving observable behavior. The result is
//! wrapped in an async IIFE whose body runs under `with (sandbox)`, which is
//! what lets the evaluator snapshot top-level state: declarations are
//! rewritten to `var` and mirrored onto the sandbox object, so every later
//! read or write of those names resolves through it.

mod ast;
mod lexer;
mod modification;
mod parser;
mod strategy;

use crate::EngineError;
use tracing::debug;

/// Opening of the evaluation wrapper. Kept on one line so the first line of
/// user code stays line 1.
pub const WRAPPER_PREFIX: &str = "(async () => { with (sandbox) { ";

/// Closing of the evaluation wrapper.
pub const WRAPPER_SUFFIX: &str = "\n} })();";

/// Rewrites `source` into an instrumented program for the evaluator.
///
/// Instrumenting already-instrumented output is the identity, so probes are
/// never stacked.
pub fn instrument(source: &str) -> Result<String, EngineError> {
    if is_instrumented(source) {
        debug!("source is already instrumented, skipping rewrite");
        return Ok(source.to_string());
    }

    let tokens = lexer::tokenize(source)
        .map_err(|e| EngineError::Instrumentation(e.to_string()))?;
    let program = parser::Parser::new(&tokens)
        .parse_program()
        .map_err(|e| EngineError::Instrumentation(e.to_string()))?;

    let mut mods = modification::SourceModifications::new();
    strategy::collect_declaration_rewrites(&tokens, &mut mods);
    strategy::collect_probe_modifications(&program, &mut mods);

    let rewritten = mods.apply(source);
    let wrapped = format!("{WRAPPER_PREFIX}{rewritten}{WRAPPER_SUFFIX}");
    validate(&wrapped)?;
    debug!(edits = mods.len(), "instrumented source");
    Ok(wrapped)
}

/// Whether `source` is already the output of [`instrument`].
pub fn is_instrumented(source: &str) -> bool {
    source.trim_start().starts_with(WRAPPER_PREFIX)
}

/// Full-fidelity parse of the rewritten program on a throwaway engine
/// context. The statement scanner is deliberately shallow, so this is what
/// turns malformed input into an instrumentation error with a real parser
/// message instead of a confusing runtime failure.
fn validate(program: &str) -> Result<(), EngineError> {
    let mut context = boa_engine::Context::default();
    boa_engine::Script::parse(boa_engine::Source::from_bytes(program), None, &mut context)
        .map(|_| ())
        .map_err(|e| EngineError::Instrumentation(e.to_string()))
}
