// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! CLI command modules.

pub mod compare;
pub mod list;
pub mod run;
pub mod validate;
