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

//! End-to-end tests against a live server and a scripted fake tracer.

#![cfg(unix)]

use reqwest::Client;
use serde_json::{json, Value};
use tracepad_engine::EngineConfig;
use tracepad_integration_tests::test_utils::{fake_tracer, spawn_server};

async fn post(client: &Client, url: &str, body: Value) -> (u16, Value) {
    let response = client.post(url).json(&body).send().await.unwrap();
    let status = response.status().as_u16();
    let body = response.json::<Value>().await.unwrap();
    (status, body)
}

fn step_lines(body: &Value) -> Vec<u64> {
    body["events"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|e| e["event"] == "step")
        .map(|e| e["line"].as_u64().unwrap())
        .collect()
}

/// A six-line Python trace, one step per line, all at module depth.
fn six_line_trace() -> String {
    let traces: Vec<Value> = (1..=6)
        .map(|line| {
            json!({
                "event": "step",
                "line": line,
                "locals": {"n": line.to_string()},
                "callStack": ["<module>"]
            })
        })
        .collect();
    json!({"status": "ok", "stdout": "", "traces": traces}).to_string()
}

#[tokio::test]
async fn test_execute_javascript_declaration_rewrite_flow() {
    let (addr, _server) = spawn_server(EngineConfig::default()).await;
    let client = Client::new();

    let code = "const msg = \"let inside string\"; // inline const\nlet x = 1;\nconsole.log(msg);";
    let (status, body) = post(
        &client,
        &format!("http://{addr}/execute"),
        json!({"language": "javascript", "code": code}),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["error"], false);
    assert_eq!(step_lines(&body), vec![1, 2, 3]);
    let logs: Vec<&str> = body["events"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|e| e["event"] == "log")
        .map(|e| e["value"].as_str().unwrap())
        .collect();
    assert_eq!(logs, vec!["let inside string"]);
}

#[tokio::test]
async fn test_execute_javascript_runtime_error_is_http_200() {
    let (addr, _server) = spawn_server(EngineConfig::default()).await;
    let client = Client::new();

    let (status, body) = post(
        &client,
        &format!("http://{addr}/execute"),
        json!({"language": "javascript", "code": "throw new Error(\"boom\");"}),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["error"], true);
    let last = body["events"].as_array().unwrap().last().unwrap();
    assert_eq!(last["event"], "error");
    assert!(last["message"].as_str().unwrap().contains("boom"));
}

#[tokio::test]
async fn test_execute_missing_fields_is_400() {
    let (addr, _server) = spawn_server(EngineConfig::default()).await;
    let client = Client::new();

    let (status, body) = post(
        &client,
        &format!("http://{addr}/execute"),
        json!({"language": "javascript"}),
    )
    .await;

    assert_eq!(status, 400);
    assert_eq!(body["statusCode"], 400);
    assert!(body["message"].as_str().unwrap().contains("Missing"));
}

#[tokio::test]
async fn test_execute_unsupported_language_is_400() {
    let (addr, _server) = spawn_server(EngineConfig::default()).await;
    let client = Client::new();

    let (status, body) = post(
        &client,
        &format!("http://{addr}/execute"),
        json!({"language": "cobol", "code": "DISPLAY 'HI'."}),
    )
    .await;

    assert_eq!(status, 400);
    assert_eq!(body["message"], "Unsupported language");
}

#[tokio::test]
async fn test_execute_python_happy_path() {
    let document = json!({
        "status": "ok",
        "stdout": "hello\n",
        "traces": [
            {"event": "step", "line": 1, "locals": {}, "callStack": ["<module>"]},
            {"event": "step", "line": 2, "locals": {}, "callStack": ["<module>", "greet"]},
        ]
    })
    .to_string();
    let (_dir, config) = fake_tracer(&document);
    let (addr, _server) = spawn_server(config).await;
    let client = Client::new();

    let (status, body) = post(
        &client,
        &format!("http://{addr}/execute"),
        json!({"language": "python", "code": "greet()"}),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["error"], false);
    assert!(body["output"].as_str().unwrap().contains("hello"));
    let events = body["events"].as_array().unwrap();
    assert_eq!(events.len(), 2);
    for event in events {
        assert!(event["callStack"].is_array());
    }
}

#[tokio::test]
async fn test_debug_continue_honors_breakpoints() {
    let (_dir, config) = fake_tracer(&six_line_trace());
    let (addr, _server) = spawn_server(config).await;
    let client = Client::new();

    let (status, body) = post(
        &client,
        &format!("http://{addr}/debug/start"),
        json!({"language": "python", "code": "pass", "breakpoints": [5]}),
    )
    .await;
    assert_eq!(status, 200);
    let session_id = body["sessionId"].as_str().unwrap().to_string();

    let (status, body) = post(
        &client,
        &format!("http://{addr}/debug/command"),
        json!({"sessionId": session_id, "command": "continue"}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["done"], false);
    assert_eq!(body["event"]["line"], 5);
}

#[tokio::test]
async fn test_debug_step_and_set_breakpoint_idempotence() {
    let (_dir, config) = fake_tracer(&six_line_trace());
    let (addr, _server) = spawn_server(config).await;
    let client = Client::new();

    let (_, body) = post(
        &client,
        &format!("http://{addr}/debug/start"),
        json!({"language": "python", "code": "pass"}),
    )
    .await;
    let session_id = body["sessionId"].as_str().unwrap().to_string();
    let command_url = format!("http://{addr}/debug/command");

    let (_, body) = post(
        &client,
        &command_url,
        json!({"sessionId": session_id, "command": "step"}),
    )
    .await;
    assert_eq!(body["event"]["line"], 1);
    assert_eq!(body["done"], false);

    let (_, first) = post(
        &client,
        &command_url,
        json!({"sessionId": session_id, "command": "setBreakpoint", "line": 7}),
    )
    .await;
    let (_, second) = post(
        &client,
        &command_url,
        json!({"sessionId": session_id, "command": "setBreakpoint", "line": 7}),
    )
    .await;
    assert_eq!(first["breakpoints"], json!([7]));
    assert_eq!(first, second);

    // A non-numeric line leaves the set unchanged.
    let (_, body) = post(
        &client,
        &command_url,
        json!({"sessionId": session_id, "command": "setBreakpoint", "line": "nope"}),
    )
    .await;
    assert_eq!(body["breakpoints"], json!([7]));
}

#[tokio::test]
async fn test_debug_unknown_session_and_command() {
    let (_dir, config) = fake_tracer(&six_line_trace());
    let (addr, _server) = spawn_server(config).await;
    let client = Client::new();
    let command_url = format!("http://{addr}/debug/command");

    let (status, body) = post(
        &client,
        &command_url,
        json!({"sessionId": "does-not-exist", "command": "step"}),
    )
    .await;
    assert_eq!(status, 404);
    assert_eq!(body["statusCode"], 404);

    let (_, start) = post(
        &client,
        &format!("http://{addr}/debug/start"),
        json!({"language": "python", "code": "pass"}),
    )
    .await;
    let session_id = start["sessionId"].as_str().unwrap();

    let (status, body) = post(
        &client,
        &command_url,
        json!({"sessionId": session_id, "command": "restart"}),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "Unknown command");
}

#[tokio::test]
async fn test_debug_start_tracer_failure_is_payload_level() {
    let document =
        json!({"status": "error", "stdout": "", "traces": [], "error": "IndentationError"})
            .to_string();
    let (_dir, config) = fake_tracer(&document);
    let (addr, _server) = spawn_server(config).await;
    let client = Client::new();

    let (status, body) = post(
        &client,
        &format!("http://{addr}/debug/start"),
        json!({"language": "python", "code": "  pass"}),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["error"], true);
    assert!(body["message"].as_str().unwrap().contains("IndentationError"));
    assert!(body.get("sessionId").is_none());
}

#[tokio::test]
async fn test_debug_start_rejects_javascript() {
    let (addr, _server) = spawn_server(EngineConfig::default()).await;
    let client = Client::new();

    let (status, _) = post(
        &client,
        &format!("http://{addr}/debug/start"),
        json!({"language": "javascript", "code": "let x = 1;"}),
    )
    .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_health_endpoint() {
    let (addr, _server) = spawn_server(EngineConfig::default()).await;
    let body = Client::new()
        .get(format!("http://{addr}/health"))
        .send()
        .await
        .unwrap()
        .json::<Value>()
        .await
        .unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "tracepad");
}
