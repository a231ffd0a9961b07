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

//! Debugger command interpretation over a precomputed trace.
//!
//! All navigation commands move the cursor strictly forward. The scan always
//! starts one past the cursor, so the current event is never yielded twice;
//! a cursor that has not advanced yet scans from index 0. When a scan runs
//! off the end the cursor clamps to the last event and the reply carries
//! `done = true`.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracepad_common::{DebugSession, TraceEvent};

/// A debugger command sent by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DebugCommand {
    /// Advance to the next event.
    Step,
    /// Advance to the next event whose line has a breakpoint.
    Continue,
    /// Step over: advance to the next event at the same or shallower depth.
    Next,
    /// Step out: advance to the first event at strictly shallower depth.
    Out,
    /// Add a breakpoint line.
    SetBreakpoint,
}

impl FromStr for DebugCommand {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "step" => Ok(Self::Step),
            "continue" => Ok(Self::Continue),
            "next" => Ok(Self::Next),
            "out" => Ok(Self::Out),
            "setBreakpoint" => Ok(Self::SetBreakpoint),
            _ => Err(()),
        }
    }
}

/// Reply to a debugger command.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CommandReply {
    /// Reply to a navigation command.
    Navigation {
        /// The event now under the cursor; `None` only for empty traces.
        event: Option<TraceEvent>,
        /// Whether the trace is exhausted.
        done: bool,
    },
    /// Reply to `setBreakpoint`.
    Breakpoints { breakpoints: Vec<u32> },
}

/// Applies `command` to `session` and produces the observable reply.
///
/// `line` is only meaningful for `setBreakpoint`; a missing or non-numeric
/// line leaves the breakpoint set unchanged.
pub fn apply_command(
    session: &mut DebugSession,
    command: DebugCommand,
    line: Option<u32>,
) -> CommandReply {
    match command {
        DebugCommand::Step => advance(session, |_, _| false),
        DebugCommand::Continue => advance(session, |event, session| {
            event.line().is_none_or(|l| !session.breakpoints.contains(&l))
        }),
        DebugCommand::Next => {
            let depth = session.current_depth();
            advance(session, move |event, _| event.stack_depth() > depth)
        }
        DebugCommand::Out => {
            let depth = session.current_depth();
            advance(session, move |event, _| event.stack_depth() >= depth)
        }
        DebugCommand::SetBreakpoint => {
            if let Some(line) = line {
                session.breakpoints.insert(line);
            }
            CommandReply::Breakpoints { breakpoints: session.breakpoint_lines() }
        }
    }
}

/// Moves the cursor one past its position, then forward while `skip` holds.
/// Clamps to the last event with `done = true` when the scan runs out.
fn advance(
    session: &mut DebugSession,
    skip: impl Fn(&TraceEvent, &DebugSession) -> bool,
) -> CommandReply {
    if session.events.is_empty() {
        return CommandReply::Navigation { event: None, done: true };
    }

    let mut index = session.pointer.map_or(0, |p| p + 1);
    while index < session.events.len() && skip(&session.events[index], session) {
        index += 1;
    }

    if index >= session.events.len() {
        let last = session.events.len() - 1;
        session.pointer = Some(last);
        CommandReply::Navigation { event: Some(session.events[last].clone()), done: true }
    } else {
        session.pointer = Some(index);
        CommandReply::Navigation { event: Some(session.events[index].clone()), done: false }
    }
}
