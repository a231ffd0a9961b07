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

//! The `/debug/*` endpoints: session creation and command handling.

use crate::api::server::AppState;
use crate::api::types::{ApiError, DebugCommandRequest, DebugStartRequest, DebugStartResponse};
use crate::session::commands::{apply_command, CommandReply, DebugCommand};
use crate::tracer;
use axum::{extract::State, Json};
use tracepad_common::DebugSession;
use tracing::info;

/// `POST /debug/start`: run the tracer, keep its trace in a new session.
pub async fn debug_start(
    State(state): State<AppState>,
    Json(request): Json<DebugStartRequest>,
) -> Result<Json<DebugStartResponse>, ApiError> {
    let (language, code) =
        super::execute::require_language_and_code(request.language, request.code)?;
    if language != "python" {
        return Err(ApiError::bad_request("Unsupported language"));
    }

    let document = tracer::run_python(&state.config, &code, &request.breakpoints).await?;
    if document.is_error() {
        let message = document.error.unwrap_or_else(|| "execution failed".to_string());
        return Ok(Json(DebugStartResponse::Failed { error: true, message }));
    }

    let session = DebugSession::new(document.events, request.breakpoints);
    let session_id = state.sessions.create(session).await;
    info!(session = %session_id, "debug session started");
    Ok(Json(DebugStartResponse::Started { session_id }))
}

/// `POST /debug/command`: interpret one debugger command against a session.
pub async fn debug_command(
    State(state): State<AppState>,
    Json(request): Json<DebugCommandRequest>,
) -> Result<Json<CommandReply>, ApiError> {
    let session_id = request
        .session_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing sessionId"))?;
    let command = request
        .command
        .as_deref()
        .and_then(|raw| raw.parse::<DebugCommand>().ok())
        .ok_or_else(|| ApiError::bad_request("Unknown command"))?;

    let session = state
        .sessions
        .get(&session_id)
        .await
        .ok_or_else(|| ApiError::not_found("Unknown session"))?;

    // Commands against one session are serialized here; the store itself
    // stays available to other sessions meanwhile.
    let mut session = session.lock().await;
    let line = request.line.as_ref().and_then(serde_json::Value::as_u64).map(|l| l as u32);
    let reply = apply_command(&mut session, command, line);
    Ok(Json(reply))
}
