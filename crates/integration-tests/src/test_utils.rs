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

//! Helpers to run a real API server against a scripted fake tracer.

use std::net::SocketAddr;
use tempfile::TempDir;
use tracepad_engine::{
    api::{ApiServer, ApiServerHandle},
    EngineConfig,
};

/// Starts the API server on an ephemeral port.
///
/// The handle must be kept alive for the duration of the test; dropping it
/// shuts the server down.
pub async fn spawn_server(config: EngineConfig) -> (SocketAddr, ApiServerHandle) {
    let handle = ApiServer::new(config)
        .start_on_port(0)
        .await
        .expect("failed to start test server");
    (handle.addr(), handle)
}

/// Creates a fake tracer that prints `document` to stdout regardless of
/// input, plus a config pointing the engine at it. The returned temp dir
/// owns the script and the engine temp directory.
#[cfg(unix)]
pub fn fake_tracer(document: &str) -> (TempDir, EngineConfig) {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().expect("failed to create temp dir");
    let script = dir.path().join("fake_tracer.sh");
    let body = format!("#!/bin/sh\ncat <<'TRACEPAD_EOF'\n{document}\nTRACEPAD_EOF\n");
    std::fs::write(&script, body).expect("failed to write fake tracer");
    let mut perms = std::fs::metadata(&script).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&script, perms).unwrap();

    let config = EngineConfig {
        python_bin: "/bin/sh".to_string(),
        tracer_script: script,
        temp_dir: dir.path().join("temp"),
        ..EngineConfig::default()
    };
    (dir, config)
}
