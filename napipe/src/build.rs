/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");

const BUILD_PROFILE_DEBUG: bool = cfg!(debug_assertions);

pub fn print_version() {
    println!("{PKG_NAME} {VERSION}");
    println!("Schemes: {}", netaccess_backend::DEBUG_PIPE_SCHEME);
    println!("Debug: {BUILD_PROFILE_DEBUG}");
}
