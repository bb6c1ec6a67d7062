/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::io;

use thiserror::Error;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum SocketErrorKind {
    ConnectionRefused,
    RemoteHostClosed,
    HostNotFound,
    Timeout,
    /// network down or unreachable
    Network,
    ProxyConnectionRefused,
    ProxyAuthenticationRequired,
    ProxyProtocol,
    Unknown,
}

impl SocketErrorKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SocketErrorKind::ConnectionRefused => "connection refused",
            SocketErrorKind::RemoteHostClosed => "remote host closed",
            SocketErrorKind::HostNotFound => "host not found",
            SocketErrorKind::Timeout => "timed out",
            SocketErrorKind::Network => "network error",
            SocketErrorKind::ProxyConnectionRefused => "proxy connection refused",
            SocketErrorKind::ProxyAuthenticationRequired => "proxy authentication required",
            SocketErrorKind::ProxyProtocol => "proxy protocol error",
            SocketErrorKind::Unknown => "unknown socket error",
        }
    }
}

impl fmt::Display for SocketErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("{kind}: {message}")]
pub struct SocketError {
    kind: SocketErrorKind,
    message: String,
}

impl SocketError {
    pub fn new(kind: SocketErrorKind, message: impl Into<String>) -> Self {
        SocketError {
            kind,
            message: message.into(),
        }
    }

    #[inline]
    pub fn kind(&self) -> SocketErrorKind {
        self.kind
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

fn kind_of_io_error(e: &io::Error) -> SocketErrorKind {
    match e.kind() {
        io::ErrorKind::ConnectionRefused => return SocketErrorKind::ConnectionRefused,
        io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::UnexpectedEof => return SocketErrorKind::RemoteHostClosed,
        io::ErrorKind::NetworkUnreachable
        | io::ErrorKind::HostUnreachable
        | io::ErrorKind::NetworkDown => return SocketErrorKind::Network,
        io::ErrorKind::TimedOut => return SocketErrorKind::Timeout,
        _ => {}
    }
    #[cfg(unix)]
    if let Some(code) = e.raw_os_error() {
        match code {
            libc::ENETUNREACH | libc::EHOSTUNREACH | libc::ENETDOWN => {
                return SocketErrorKind::Network;
            }
            libc::ECONNRESET | libc::EPIPE => return SocketErrorKind::RemoteHostClosed,
            libc::ETIMEDOUT => return SocketErrorKind::Timeout,
            libc::ECONNREFUSED => return SocketErrorKind::ConnectionRefused,
            _ => {}
        }
    }
    SocketErrorKind::Unknown
}

impl From<io::Error> for SocketError {
    fn from(e: io::Error) -> Self {
        SocketError {
            kind: kind_of_io_error(&e),
            message: e.to_string(),
        }
    }
}
