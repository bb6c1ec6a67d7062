/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::collections::VecDeque;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::task::noop_waker_ref;
use log::{debug, warn};
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use tokio::net::{TcpListener, TcpStream};

use crate::registry::ServerRegistry;
use crate::{LocalServerConfig, LocalServerError, LocalSocket};

pub const SERVER_NAME_PREFIX: &str = "QLocalServer/";

/// The registry key of a server name.
pub fn full_server_name(name: &str) -> String {
    if name.starts_with(SERVER_NAME_PREFIX) {
        name.to_string()
    } else {
        format!("{SERVER_NAME_PREFIX}{name}")
    }
}

fn new_loopback_listener(backlog: u32) -> io::Result<std::net::TcpListener> {
    let addr = SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 0);
    let socket = Socket::new(
        Domain::for_address(addr),
        Type::STREAM.nonblocking(),
        Some(Protocol::TCP),
    )?;
    let bind_addr: SockAddr = addr.into();
    socket.bind(&bind_addr)?;
    socket.listen(i32::try_from(backlog).unwrap_or(i32::MAX))?;
    Ok(std::net::TcpListener::from(socket))
}

/// A named server reachable by local clients through a loopback tcp port.
///
/// The name to port mapping is published in the shared registry while
/// listening. Must be used from within a tokio runtime.
pub struct LocalServer<R: ServerRegistry> {
    registry: Arc<R>,
    config: LocalServerConfig,
    listener: Option<TcpListener>,
    server_name: String,
    full_server_name: String,
    registered: bool,
    pending: VecDeque<LocalSocket>,
    error: Option<LocalServerError>,
}

impl<R: ServerRegistry> LocalServer<R> {
    pub fn new(registry: Arc<R>, config: LocalServerConfig) -> Self {
        LocalServer {
            registry,
            config,
            listener: None,
            server_name: String::new(),
            full_server_name: String::new(),
            registered: false,
            pending: VecDeque::new(),
            error: None,
        }
    }

    /// Remove a stale registry entry left by a server that did not close.
    pub fn remove_server(registry: &R, name: &str) -> bool {
        let full_name = full_server_name(name);
        if registry.contains(&full_name) {
            registry.remove(&full_name);
        }
        true
    }

    fn fail(&mut self, e: LocalServerError) -> Result<(), LocalServerError> {
        self.error = Some(e.clone());
        Err(e)
    }

    pub fn listen(&mut self, name: &str) -> Result<(), LocalServerError> {
        if self.listener.is_some() {
            return self.fail(LocalServerError::AlreadyListening);
        }

        let std_listener = match new_loopback_listener(self.config.backlog()) {
            Ok(l) => l,
            Err(e) => return self.fail(LocalServerError::BindFailure(Arc::new(e))),
        };

        let full_name = full_server_name(name);
        if self
            .registry
            .value(&full_name)
            .is_some_and(|v| !v.is_empty())
        {
            warn!("local server name {full_name} is already in use");
            drop(std_listener);
            return self.fail(LocalServerError::NameInUse(full_name));
        }

        let listener = match TcpListener::from_std(std_listener) {
            Ok(l) => l,
            Err(e) => return self.fail(LocalServerError::BindFailure(Arc::new(e))),
        };
        let port = match listener.local_addr() {
            Ok(addr) => addr.port(),
            Err(e) => return self.fail(LocalServerError::BindFailure(Arc::new(e))),
        };

        self.registry.set_value(&full_name, &port.to_string());
        debug!("local server {full_name} listening on port {port}");

        self.listener = Some(listener);
        self.server_name = name.to_string();
        self.full_server_name = full_name;
        self.registered = true;
        self.error = None;
        Ok(())
    }

    /// Adopt an already listening socket. Nothing is published in the registry.
    pub fn listen_socket(&mut self, listener: std::net::TcpListener) -> Result<(), LocalServerError> {
        if self.listener.is_some() {
            return self.fail(LocalServerError::AlreadyListening);
        }
        let listener = match listener
            .set_nonblocking(true)
            .and_then(|_| TcpListener::from_std(listener))
        {
            Ok(l) => l,
            Err(e) => return self.fail(LocalServerError::BindFailure(Arc::new(e))),
        };
        self.listener = Some(listener);
        self.server_name.clear();
        self.full_server_name.clear();
        self.registered = false;
        self.error = None;
        Ok(())
    }

    pub fn close_server(&mut self) {
        if self.registered {
            if self.server_name.is_empty() {
                self.registry.set_value(&self.full_server_name, "");
            } else {
                self.registry.remove(&self.full_server_name);
            }
            self.registered = false;
        }
        if self.listener.take().is_some() {
            debug!("local server {} closed", self.full_server_name);
        }
        self.pending.clear();
        self.server_name.clear();
        self.full_server_name.clear();
    }

    #[inline]
    pub fn is_listening(&self) -> bool {
        self.listener.is_some()
    }

    #[inline]
    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    #[inline]
    pub fn full_server_name(&self) -> &str {
        &self.full_server_name
    }

    pub fn server_port(&self) -> Option<u16> {
        let listener = self.listener.as_ref()?;
        listener.local_addr().ok().map(|addr| addr.port())
    }

    #[inline]
    pub fn server_error(&self) -> Option<&LocalServerError> {
        self.error.as_ref()
    }

    pub fn set_max_pending_connections(&mut self, max: usize) {
        self.config.set_max_pending_connections(max);
    }

    #[inline]
    pub fn max_pending_connections(&self) -> usize {
        self.config.max_pending_connections()
    }

    #[inline]
    pub fn has_pending_connections(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn next_pending_connection(&mut self) -> Option<LocalSocket> {
        self.pending.pop_front()
    }

    #[inline]
    fn pending_full(&self) -> bool {
        self.pending.len() >= self.config.max_pending_connections()
    }

    fn queue_connection(&mut self, stream: TcpStream, peer: SocketAddr) {
        debug!(
            "local server {} accepted connection from {peer}",
            self.full_server_name
        );
        self.pending.push_back(LocalSocket::new(stream));
    }

    fn on_accept_error(&mut self, e: io::Error) {
        warn!("local server {} accept failed: {e}", self.full_server_name);
        self.error = Some(LocalServerError::AcceptFailed(Arc::new(e)));
    }

    /// Pull exactly one connection from the listener without waiting.
    ///
    /// Returns whether a connection was queued. Connections stay in the
    /// listen backlog while the pending queue is full. Meant to be called
    /// after a wake of `wait_for_new_connection`, to take in a burst.
    pub fn accept_pending(&mut self) -> bool {
        if self.pending_full() {
            return false;
        }
        let Some(listener) = &self.listener else {
            return false;
        };
        let mut cx = Context::from_waker(noop_waker_ref());
        match listener.poll_accept(&mut cx) {
            Poll::Ready(Ok((stream, peer))) => {
                self.queue_connection(stream, peer);
                true
            }
            Poll::Ready(Err(e)) => {
                self.on_accept_error(e);
                false
            }
            Poll::Pending => {
                debug!(
                    "local server {}: no pending connection",
                    self.full_server_name
                );
                false
            }
        }
    }

    /// Wait up to `timeout` for a connection, returning whether it timed out.
    pub async fn wait_for_new_connection(&mut self, timeout: Duration) -> bool {
        if self.has_pending_connections() {
            return false;
        }
        let Some(listener) = &self.listener else {
            return false;
        };
        let accepted = tokio::time::timeout(timeout, listener.accept()).await;
        match accepted {
            Ok(Ok((stream, peer))) => {
                self.queue_connection(stream, peer);
                false
            }
            Ok(Err(e)) => {
                self.on_accept_error(e);
                false
            }
            Err(_) => true,
        }
    }

    /// Take the next connection, waiting for one if none is pending.
    pub async fn next_connection(&mut self) -> Result<LocalSocket, LocalServerError> {
        if let Some(socket) = self.pending.pop_front() {
            return Ok(socket);
        }
        let Some(listener) = &self.listener else {
            return Err(LocalServerError::NotListening);
        };
        let accepted = listener.accept().await;
        match accepted {
            Ok((stream, peer)) => {
                debug!(
                    "local server {} accepted connection from {peer}",
                    self.full_server_name
                );
                Ok(LocalSocket::new(stream))
            }
            Err(e) => {
                let e = Arc::new(e);
                self.error = Some(LocalServerError::AcceptFailed(e.clone()));
                Err(LocalServerError::AcceptFailed(e))
            }
        }
    }
}

impl<R: ServerRegistry> Drop for LocalServer<R> {
    fn drop(&mut self) {
        self.close_server();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixed_name() {
        assert_eq!(full_server_name("abc"), "QLocalServer/abc");
        assert_eq!(full_server_name("QLocalServer/abc"), "QLocalServer/abc");
        assert_eq!(full_server_name(""), "QLocalServer/");
    }
}
