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

//! Request/response shapes and the error envelope of the HTTP API.
//!
//! Boundary failures (bad request, unknown session) serialize as
//! `{statusCode, message}`. Failures of the user's program are payload-level
//! and travel inside the 200 responses; see the handlers.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracepad_common::TraceEvent;

/// Body of `POST /execute`.
#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    pub language: Option<String>,
    pub code: Option<String>,
}

/// Response of `POST /execute`.
#[derive(Debug, Serialize)]
pub struct ExecuteResponse {
    pub events: Vec<TraceEvent>,
    pub error: bool,
    /// Captured standard output; Python runs only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Failure message when `error` is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Body of `POST /debug/start`.
#[derive(Debug, Deserialize)]
pub struct DebugStartRequest {
    pub language: Option<String>,
    pub code: Option<String>,
    #[serde(default)]
    pub breakpoints: Vec<u32>,
}

/// Response of `POST /debug/start`.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum DebugStartResponse {
    Started {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    /// The tracer reported a failure; still HTTP 200.
    Failed { error: bool, message: String },
}

/// Body of `POST /debug/command`.
#[derive(Debug, Deserialize)]
pub struct DebugCommandRequest {
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
    pub command: Option<String>,
    /// Line for `setBreakpoint`; non-numeric values are ignored.
    pub line: Option<serde_json::Value>,
}

/// Boundary failure rendered as `{statusCode, message}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message: message.into() }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self { status: StatusCode::NOT_FOUND, message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self { status: StatusCode::INTERNAL_SERVER_ERROR, message: message.into() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let body = json!({
            "statusCode": self.status.as_u16(),
            "message": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}

impl From<crate::EngineError> for ApiError {
    fn from(error: crate::EngineError) -> Self {
        match error {
            // Instrumentation failures are payload-level and handled before
            // this conversion; reaching here means a handler bug.
            crate::EngineError::Instrumentation(message) => Self::internal(message),
            crate::EngineError::Internal(report) => Self::internal(report.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_start_response_shapes() {
        let started = DebugStartResponse::Started { session_id: "abc".to_string() };
        assert_eq!(
            serde_json::to_value(&started).unwrap(),
            json!({"sessionId": "abc"})
        );

        let failed =
            DebugStartResponse::Failed { error: true, message: "timeout".to_string() };
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            json!({"error": true, "message": "timeout"})
        );
    }

    #[test]
    fn test_execute_response_omits_empty_fields() {
        let response = ExecuteResponse {
            events: Vec::new(),
            error: false,
            output: None,
            message: None,
        };
        let value = serde_json::to_value(&response).unwrap();
        assert!(value.get("output").is_none());
        assert!(value.get("message").is_none());
    }
}
