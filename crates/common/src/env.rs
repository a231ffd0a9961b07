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

//! Environment variable name constants for Tracepad configuration.
//!
//! Single source of truth for the variable names the binary reads. All of
//! them have CLI flag equivalents; the flags take precedence.

/// Port the HTTP API listens on.
pub const TRACEPAD_PORT: &str = "TRACEPAD_PORT";

/// Interpreter binary used to run the Python tracer (default `python3`).
pub const TRACEPAD_PYTHON_BIN: &str = "TRACEPAD_PYTHON_BIN";

/// Path to the Python tracer script spawned for Python executions.
pub const TRACEPAD_TRACER_SCRIPT: &str = "TRACEPAD_TRACER_SCRIPT";

/// Directory for transient source files handed to the tracer subprocess.
pub const TRACEPAD_TEMP_DIR: &str = "TRACEPAD_TEMP_DIR";
