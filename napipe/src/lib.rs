/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

mod config;
mod opts;

pub mod build;
pub mod cmd;
pub mod log;

pub use config::AppConfig;
pub use opts::{ProcArgs, add_global_args, parse_global_args};
