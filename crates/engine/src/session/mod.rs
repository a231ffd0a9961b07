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

//! Process-wide registry of live debug sessions.
//!
//! Sessions are keyed by opaque 128-bit tokens. The registry itself is
//! guarded by a read-write lock; each session carries its own mutex so that
//! concurrent commands against one session are serialized without blocking
//! commands against others.

pub mod commands;

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracepad_common::DebugSession;
use tracing::{info, warn};
use uuid::Uuid;

/// Handle to one stored session.
pub type SharedSession = Arc<Mutex<DebugSession>>;

#[derive(Debug, Default)]
struct Inner {
    sessions: HashMap<String, SharedSession>,
    /// Insertion order, for eviction.
    order: VecDeque<String>,
}

/// Concurrency-safe session registry with a bounded capacity.
#[derive(Debug, Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<Inner>>,
    max_sessions: usize,
}

impl SessionStore {
    pub fn new(max_sessions: usize) -> Self {
        Self { inner: Arc::new(RwLock::new(Inner::default())), max_sessions: max_sessions.max(1) }
    }

    /// Stores `session` under a fresh unguessable ID and returns the ID.
    /// When the store is full the oldest session is evicted.
    pub async fn create(&self, session: DebugSession) -> String {
        let id = Uuid::new_v4().to_string();
        let mut inner = self.inner.write().await;
        while inner.order.len() >= self.max_sessions {
            if let Some(evicted) = inner.order.pop_front() {
                inner.sessions.remove(&evicted);
                warn!(session = %evicted, "evicted oldest debug session at capacity");
            }
        }
        inner.order.push_back(id.clone());
        inner.sessions.insert(id.clone(), Arc::new(Mutex::new(session)));
        info!(session = %id, live = inner.sessions.len(), "created debug session");
        id
    }

    /// Looks up a session; `None` surfaces as HTTP 404 at the boundary.
    pub async fn get(&self, id: &str) -> Option<SharedSession> {
        self.inner.read().await.sessions.get(id).cloned()
    }

    /// Removes a session, returning whether it existed.
    pub async fn destroy(&self, id: &str) -> bool {
        let mut inner = self.inner.write().await;
        inner.order.retain(|stored| stored != id);
        inner.sessions.remove(id).is_some()
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.inner.read().await.sessions.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
