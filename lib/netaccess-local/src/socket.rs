/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io::{self, IoSlice};
use std::net::{Ipv4Addr, SocketAddr};
#[cfg(unix)]
use std::os::fd::{AsRawFd, RawFd};
#[cfg(windows)]
use std::os::windows::io::{AsRawSocket, RawSocket};
use std::pin::Pin;
use std::task::{Context, Poll};

use log::debug;
use pin_project_lite::pin_project;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;

use crate::LocalSocketError;
use crate::registry::ServerRegistry;
use crate::server::full_server_name;

pin_project! {
    /// A connection to or from a named local server.
    #[derive(Debug)]
    pub struct LocalSocket {
        #[pin]
        stream: TcpStream,
    }
}

impl LocalSocket {
    pub(crate) fn new(stream: TcpStream) -> Self {
        LocalSocket { stream }
    }

    /// Look up the port registered for `name` and connect to it on loopback.
    pub async fn connect_to_server<R>(registry: &R, name: &str) -> Result<Self, LocalSocketError>
    where
        R: ServerRegistry + ?Sized,
    {
        let full_name = full_server_name(name);
        let value = registry
            .value(&full_name)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| LocalSocketError::ServerNotFound(full_name.clone()))?;
        let port = value
            .trim()
            .parse::<u16>()
            .ok()
            .filter(|p| *p != 0)
            .ok_or_else(|| LocalSocketError::InvalidPort(full_name.clone(), value.clone()))?;

        let addr = SocketAddr::new(Ipv4Addr::LOCALHOST.into(), port);
        let stream = TcpStream::connect(addr)
            .await
            .map_err(LocalSocketError::ConnectFailed)?;
        debug!("connected to local server {full_name} at {addr}");
        Ok(LocalSocket::new(stream))
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.stream.local_addr()
    }

    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.stream.peer_addr()
    }

    pub fn into_inner(self) -> TcpStream {
        self.stream
    }
}

#[cfg(unix)]
impl AsRawFd for LocalSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.stream.as_raw_fd()
    }
}

#[cfg(windows)]
impl AsRawSocket for LocalSocket {
    fn as_raw_socket(&self) -> RawSocket {
        self.stream.as_raw_socket()
    }
}

impl AsyncRead for LocalSocket {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        self.project().stream.poll_read(cx, buf)
    }
}

impl AsyncWrite for LocalSocket {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.project().stream.poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.project().stream.poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.project().stream.poll_shutdown(cx)
    }

    fn poll_write_vectored(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        self.project().stream.poll_write_vectored(cx, bufs)
    }

    fn is_write_vectored(&self) -> bool {
        self.stream.is_write_vectored()
    }
}
