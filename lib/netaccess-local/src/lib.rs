/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

mod config;
mod error;
mod server;
mod socket;

pub mod registry;

pub use config::LocalServerConfig;
pub use error::{LocalServerError, LocalSocketError};
pub use server::{LocalServer, SERVER_NAME_PREFIX, full_server_name};
pub use socket::LocalSocket;
