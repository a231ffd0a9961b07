// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
// SPDX-License-Identifier: AGPL-3.0
//! Tracepad Common - Shared functionality for Tracepad components
//!
//! This crate provides the shared vocabulary used by the engine and the
//! binary: the trace event model produced by both execution backends, the
//! debug session state, environment variable names, and logging setup.

pub mod env;
pub mod logging;
pub mod types;

pub use types::*;
