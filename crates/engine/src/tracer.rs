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

//! Python execution through the external tracer subprocess.
//!
//! The tracer is an opaque collaborator: it receives a source file path (and
//! optionally a JSON breakpoint list) on argv and emits one JSON document on
//! stdout. Exit codes are not interpreted. Everything the subprocess reports,
//! including crashes and garbage output, is a payload-level result; only
//! local I/O failures bubble up as engine errors.

use crate::{EngineConfig, EngineError};
use eyre::Context as _;
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};
use tracepad_common::{ExecutionStatus, TraceDocument, TraceEvent};
use uuid::Uuid;

/// Wire shape of the tracer's stdout document.
#[derive(Debug, Deserialize)]
struct TracerOutput {
    status: String,
    #[serde(default)]
    traces: Vec<TraceEvent>,
    #[serde(default)]
    stdout: String,
    #[serde(default)]
    error: Option<String>,
}

/// Runs `source` under the tracer and returns its trace document.
///
/// The source is written to a fresh uniquely-named file under the configured
/// temp directory, which is removed on every exit path.
pub async fn run_python(
    config: &EngineConfig,
    source: &str,
    breakpoints: &[u32],
) -> Result<TraceDocument, EngineError> {
    tokio::fs::create_dir_all(&config.temp_dir)
        .await
        .wrap_err_with(|| format!("failed to create temp dir {}", config.temp_dir.display()))
        .map_err(EngineError::Internal)?;

    let source_path = config.temp_dir.join(format!("{}.py", Uuid::new_v4()));
    tokio::fs::write(&source_path, source)
        .await
        .wrap_err_with(|| format!("failed to write {}", source_path.display()))
        .map_err(EngineError::Internal)?;

    let document = spawn_tracer(config, &source_path, breakpoints).await;

    cleanup(&source_path).await;
    Ok(document)
}

async fn spawn_tracer(
    config: &EngineConfig,
    source_path: &Path,
    breakpoints: &[u32],
) -> TraceDocument {
    let mut command = Command::new(&config.python_bin);
    command
        .arg(&config.tracer_script)
        .arg(source_path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        // Dropping the wait future on timeout must reap the child.
        .kill_on_drop(true);
    if !breakpoints.is_empty() {
        command.arg(serde_json::to_string(breakpoints).unwrap_or_else(|_| "[]".to_string()));
    }

    debug!(
        tracer = %config.tracer_script.display(),
        source = %source_path.display(),
        "spawning tracer"
    );

    let child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            warn!("failed to spawn tracer: {e}");
            return TraceDocument::failed(Vec::new(), format!("failed to spawn tracer: {e}"));
        }
    };

    let output = match tokio::time::timeout(config.tracer_timeout, child.wait_with_output()).await
    {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return TraceDocument::failed(Vec::new(), format!("tracer failed: {e}"));
        }
        Err(_) => {
            warn!("tracer timed out after {:?}", config.tracer_timeout);
            return TraceDocument::failed(Vec::new(), "timeout");
        }
    };

    if !output.stderr.is_empty() {
        debug!(stderr = %String::from_utf8_lossy(&output.stderr), "tracer stderr");
    }

    parse_tracer_output(&output.stdout)
}

/// Parses the tracer's stdout; non-JSON output becomes an error document
/// carrying the raw text.
fn parse_tracer_output(stdout: &[u8]) -> TraceDocument {
    match serde_json::from_slice::<TracerOutput>(stdout) {
        Ok(parsed) => {
            let status = if parsed.status == "ok" {
                ExecutionStatus::Ok
            } else {
                ExecutionStatus::Error
            };
            TraceDocument {
                events: parsed.traces,
                status,
                error: parsed.error,
                stdout: Some(parsed.stdout),
            }
        }
        Err(e) => {
            let raw = String::from_utf8_lossy(stdout).into_owned();
            debug!("tracer produced non-JSON output: {e}");
            TraceDocument::failed(Vec::new(), raw)
        }
    }
}

async fn cleanup(source_path: &Path) {
    if let Err(e) = tokio::fs::remove_file(source_path).await {
        debug!("failed to remove {}: {e}", source_path.display());
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Writes an executable fake tracer script and returns a config whose
    /// `python_bin` is `/bin/sh`, mirroring the real argv contract
    /// `[bin, script, source, breakpoints?]`.
    fn fake_tracer(dir: &TempDir, body: &str) -> EngineConfig {
        let script = dir.path().join("fake_tracer.sh");
        std::fs::write(&script, format!("#!/bin/sh\n{body}\n")).unwrap();
        let mut perms = std::fs::metadata(&script).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&script, perms).unwrap();

        EngineConfig {
            python_bin: "/bin/sh".to_string(),
            tracer_script: script,
            temp_dir: dir.path().join("temp"),
            tracer_timeout: Duration::from_secs(5),
            ..EngineConfig::default()
        }
    }

    #[tokio::test]
    async fn test_happy_path_parses_trace_document() {
        let dir = TempDir::new().unwrap();
        let config = fake_tracer(
            &dir,
            r#"printf '%s' '{"status":"ok","stdout":"hello\n","traces":[{"event":"step","line":1,"locals":{},"callStack":["<module>"]}]}'"#,
        );

        let doc = run_python(&config, "print('hello')", &[]).await.unwrap();
        assert!(!doc.is_error());
        assert_eq!(doc.stdout.as_deref(), Some("hello\n"));
        assert_eq!(doc.events.len(), 1);
        assert_eq!(doc.events[0].stack_depth(), 1);
    }

    #[tokio::test]
    async fn test_error_status_is_payload_level() {
        let dir = TempDir::new().unwrap();
        let config = fake_tracer(
            &dir,
            r#"echo '{"status":"error","stdout":"","traces":[],"error":"NameError: x"}'"#,
        );

        let doc = run_python(&config, "x", &[]).await.unwrap();
        assert!(doc.is_error());
        assert_eq!(doc.error.as_deref(), Some("NameError: x"));
    }

    #[tokio::test]
    async fn test_garbage_stdout_becomes_error_with_raw_text() {
        let dir = TempDir::new().unwrap();
        let config = fake_tracer(&dir, "echo 'Traceback: something exploded'");

        let doc = run_python(&config, "pass", &[]).await.unwrap();
        assert!(doc.is_error());
        assert!(doc.error.as_deref().unwrap().contains("Traceback"));
    }

    #[tokio::test]
    async fn test_timeout_yields_timeout_document() {
        let dir = TempDir::new().unwrap();
        let mut config = fake_tracer(&dir, "sleep 5");
        config.tracer_timeout = Duration::from_millis(200);

        let doc = run_python(&config, "pass", &[]).await.unwrap();
        assert!(doc.is_error());
        assert_eq!(doc.error.as_deref(), Some("timeout"));
        assert!(doc.events.is_empty());
    }

    #[tokio::test]
    async fn test_breakpoints_passed_as_json_argument() {
        let dir = TempDir::new().unwrap();
        // Seen from the script, $1 is the source path and $2 the breakpoint
        // list; echo the list back through the error field.
        let config = fake_tracer(
            &dir,
            r#"printf '{"status":"error","stdout":"","traces":[],"error":"%s"}' "$2""#,
        );

        let doc = run_python(&config, "pass", &[3, 7]).await.unwrap();
        assert_eq!(doc.error.as_deref(), Some("[3,7]"));
    }

    #[tokio::test]
    async fn test_temp_file_is_cleaned_up() {
        let dir = TempDir::new().unwrap();
        let config = fake_tracer(&dir, r#"echo '{"status":"ok","stdout":"","traces":[]}'"#);

        run_python(&config, "pass", &[]).await.unwrap();

        let leftovers: Vec<_> = std::fs::read_dir(&config.temp_dir)
            .unwrap()
            .filter_map(Result::ok)
            .collect();
        assert!(leftovers.is_empty(), "temp source file should be removed");
    }
}
