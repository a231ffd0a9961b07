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

//! Interactive debug session state.

use crate::types::TraceEvent;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A precomputed trace being navigated interactively.
///
/// The event list is fixed at session start; commands only ever move the
/// cursor forward and edit the breakpoint set. `pointer` is `None` before the
/// first navigation command ("before the start" in debugger terms).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugSession {
    /// Events of the trace, in execution order. Immutable after start.
    pub events: Vec<TraceEvent>,
    /// Index of the most recently yielded event, if any.
    pub pointer: Option<usize>,
    /// Lines with active breakpoints.
    pub breakpoints: BTreeSet<u32>,
}

impl DebugSession {
    /// Creates a session positioned before the first event.
    pub fn new(events: Vec<TraceEvent>, breakpoints: impl IntoIterator<Item = u32>) -> Self {
        Self { events, pointer: None, breakpoints: breakpoints.into_iter().collect() }
    }

    /// The event currently under the cursor, if the session has advanced.
    pub fn current_event(&self) -> Option<&TraceEvent> {
        self.pointer.and_then(|p| self.events.get(p))
    }

    /// Call stack depth at the cursor; 0 before the first advance.
    pub fn current_depth(&self) -> usize {
        self.current_event().map_or(0, TraceEvent::stack_depth)
    }

    /// Breakpoint lines as a sorted array, for responses.
    pub fn breakpoint_lines(&self) -> Vec<u32> {
        self.breakpoints.iter().copied().collect()
    }
}
