/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

mod local;
mod pipe;
mod primary;
mod proxy;

pub use local::{as_local_server_config, as_registry_scope};
pub use pipe::as_pipe_config;
pub use primary::{as_string, as_u16, as_u32, as_usize};
pub use proxy::as_proxy_env;
