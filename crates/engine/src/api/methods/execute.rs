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

//! The `/execute` endpoint: one-shot run of user code under tracing.

use crate::api::server::AppState;
use crate::api::types::{ApiError, ExecuteRequest, ExecuteResponse};
use crate::{eval, instrumentation, tracer, EngineError};
use axum::{extract::State, Json};
use tracepad_common::TraceDocument;
use tracing::info;

pub async fn execute(
    State(state): State<AppState>,
    Json(request): Json<ExecuteRequest>,
) -> Result<Json<ExecuteResponse>, ApiError> {
    let (language, code) = require_language_and_code(request.language, request.code)?;

    match language.as_str() {
        "javascript" => {
            info!(bytes = code.len(), "executing javascript");
            let document = run_javascript(&state, &code).await?;
            Ok(Json(response_from(document, false)))
        }
        "python" => {
            info!(bytes = code.len(), "executing python");
            let document = tracer::run_python(&state.config, &code, &[]).await?;
            Ok(Json(response_from(document, true)))
        }
        _ => Err(ApiError::bad_request("Unsupported language")),
    }
}

pub(crate) fn require_language_and_code(
    language: Option<String>,
    code: Option<String>,
) -> Result<(String, String), ApiError> {
    match (language, code) {
        (Some(language), Some(code)) if !language.is_empty() && !code.is_empty() => {
            Ok((language, code))
        }
        _ => Err(ApiError::bad_request("Missing language or code")),
    }
}

/// Instrument + evaluate. Instrumentation failures are user-visible results,
/// not HTTP failures.
async fn run_javascript(state: &AppState, code: &str) -> Result<TraceDocument, ApiError> {
    let instrumented = match instrumentation::instrument(code) {
        Ok(instrumented) => instrumented,
        Err(EngineError::Instrumentation(message)) => {
            return Ok(TraceDocument::failed(Vec::new(), message));
        }
        Err(other) => return Err(other.into()),
    };
    Ok(eval::evaluate(&instrumented, state.config.eval_timeout).await)
}

fn response_from(document: TraceDocument, include_output: bool) -> ExecuteResponse {
    ExecuteResponse {
        error: document.is_error(),
        message: document.error.clone(),
        output: if include_output { Some(document.stdout.clone().unwrap_or_default()) } else { None },
        events: document.events,
    }
}
