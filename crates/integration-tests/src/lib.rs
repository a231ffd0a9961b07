// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
// SPDX-License-Identifier: AGPL-3.0
//! Shared helpers for Tracepad integration tests.

pub mod test_utils;
