/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

mod error;
mod proxy;

pub use error::{SocketError, SocketErrorKind};
pub use proxy::{
    NoProxyRule, ProxyCapabilities, ProxyDescriptor, ProxyEnv, ProxyEnvError, ProxyEnvVar,
    ProxyParseError, ProxyQuery, ProxyQueryType, ProxySelector, ProxyType,
};
