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

//! Typed engine failures.
//!
//! Only failures the HTTP layer needs to tell apart get a variant here.
//! User-code failures are not errors at this level; they travel inside
//! [`tracepad_common::TraceDocument`] as payload.

use thiserror::Error;

/// Failures produced by the engine itself, as opposed to by user code.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The user source could not be parsed and rewritten.
    #[error("{0}")]
    Instrumentation(String),

    /// An unexpected failure unrelated to the user's code, such as temp-file
    /// I/O. Surfaces as HTTP 500.
    #[error(transparent)]
    Internal(#[from] eyre::Report),
}
