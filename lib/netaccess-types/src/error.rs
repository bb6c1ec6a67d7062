/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::fmt;

use thiserror::Error;

/// Error code reported to the consumer of a backend.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum NetworkError {
    /// the peer closed while there were still bytes pending to be written
    RemoteHostClosed,
    /// generic transport fault
    UnknownNetwork,
    /// write failure or any other backend level fault
    ProtocolFailure,
}

impl NetworkError {
    pub const fn as_str(&self) -> &'static str {
        match self {
            NetworkError::RemoteHostClosed => "RemoteHostClosedError",
            NetworkError::UnknownNetwork => "UnknownNetworkError",
            NetworkError::ProtocolFailure => "ProtocolFailure",
        }
    }
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("{code}: {message}")]
pub struct BackendError {
    code: NetworkError,
    message: String,
}

impl BackendError {
    pub fn new(code: NetworkError, message: String) -> Self {
        BackendError { code, message }
    }

    #[inline]
    pub fn code(&self) -> NetworkError {
        self.code
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}
