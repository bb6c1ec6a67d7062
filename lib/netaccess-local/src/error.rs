/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::sync::Arc;

use thiserror::Error;

#[derive(Clone, Debug, Error)]
pub enum LocalServerError {
    #[error("bind failed: {0}")]
    BindFailure(Arc<io::Error>),
    #[error("server name {0} is already in use")]
    NameInUse(String),
    #[error("already listening")]
    AlreadyListening,
    #[error("not listening")]
    NotListening,
    #[error("accept failed: {0}")]
    AcceptFailed(Arc<io::Error>),
}

#[derive(Debug, Error)]
pub enum LocalSocketError {
    #[error("server {0} not found")]
    ServerNotFound(String),
    #[error("invalid port {1} registered for server {0}")]
    InvalidPort(String, String),
    #[error("connect failed: {0:?}")]
    ConnectFailed(io::Error),
}
