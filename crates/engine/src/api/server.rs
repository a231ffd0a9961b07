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

//! HTTP server wiring.

use super::methods;
use crate::session::SessionStore;
use crate::EngineConfig;
use axum::{
    response::Json as JsonResponse,
    routing::{get, post},
    Router,
};
use eyre::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

/// Handle to the running API server.
#[derive(Debug)]
pub struct ApiServerHandle {
    /// Address the server is listening on.
    pub addr: SocketAddr,
    /// Shutdown signal.
    shutdown_tx: oneshot::Sender<()>,
}

impl ApiServerHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Gracefully shut down the API server.
    pub fn shutdown(self) {
        if self.shutdown_tx.send(()).is_err() {
            warn!("API server already shut down");
        }
    }
}

/// Shared state behind every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<EngineConfig>,
    pub sessions: SessionStore,
}

/// The tracing service's HTTP server.
pub struct ApiServer {
    state: AppState,
}

impl ApiServer {
    pub fn new(config: EngineConfig) -> Self {
        let sessions = SessionStore::new(config.max_sessions);
        Self { state: AppState { config: Arc::new(config), sessions } }
    }

    /// Start the server on the configured port.
    pub async fn start(self) -> Result<ApiServerHandle> {
        let port = self.state.config.port;
        self.start_on_port(port).await
    }

    /// Start the server on a specific port (0 picks an ephemeral one).
    pub async fn start_on_port(self, port: u16) -> Result<ApiServerHandle> {
        let app = build_router(self.state);

        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let actual_addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
            {
                warn!("API server failed: {e}");
            }
        });

        info!("API server started on {}", actual_addr);
        Ok(ApiServerHandle { addr: actual_addr, shutdown_tx })
    }
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/execute", post(methods::execute))
        .route("/debug/start", post(methods::debug_start))
        .route("/debug/command", post(methods::debug_command))
        .route("/health", get(health_check))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> JsonResponse<serde_json::Value> {
    JsonResponse(serde_json::json!({
        "status": "healthy",
        "service": "tracepad",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AppState>();
    }
}
