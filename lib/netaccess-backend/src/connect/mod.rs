/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::io;
use std::net::{IpAddr, SocketAddr};

use bytes::Bytes;
use log::debug;
use thiserror::Error;
use tokio::net::{TcpStream, lookup_host};

use netaccess_types::net::{ProxyDescriptor, ProxyType, SocketError, SocketErrorKind};

mod http;
mod socks5;

pub use http::http_connect_to;
pub use socks5::socks5_connect_to;

#[derive(Debug, Error)]
pub enum TunnelError {
    #[error("read failed: {0:?}")]
    ReadFailed(io::Error),
    #[error("write failed: {0:?}")]
    WriteFailed(io::Error),
    #[error("remote closed")]
    RemoteClosed,
    #[error("no auth method available")]
    NoAuthMethodAvailable,
    #[error("auth failed")]
    AuthFailed,
    #[error("invalid protocol: {0}")]
    InvalidProtocol(&'static str),
    #[error("request rejected: {1}")]
    Rejected(u8, &'static str),
    #[error("too large header, should be less than {0}")]
    TooLargeHeader(usize),
    #[error("unexpected status code {0} {1}")]
    UnexpectedStatusCode(u16, String),
}

impl TunnelError {
    fn read_failed(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            TunnelError::RemoteClosed
        } else {
            TunnelError::ReadFailed(e)
        }
    }
}

impl From<TunnelError> for SocketError {
    fn from(e: TunnelError) -> Self {
        let message = e.to_string();
        let kind = match e {
            TunnelError::ReadFailed(e) | TunnelError::WriteFailed(e) => SocketError::from(e).kind(),
            TunnelError::NoAuthMethodAvailable | TunnelError::AuthFailed => {
                SocketErrorKind::ProxyAuthenticationRequired
            }
            TunnelError::UnexpectedStatusCode(407, _) => {
                SocketErrorKind::ProxyAuthenticationRequired
            }
            TunnelError::Rejected(0x03 | 0x04, _) => SocketErrorKind::Network,
            TunnelError::Rejected(0x05, _) => SocketErrorKind::ConnectionRefused,
            TunnelError::Rejected(0x09, _) => SocketErrorKind::Timeout,
            _ => SocketErrorKind::ProxyProtocol,
        };
        SocketError::new(kind, message)
    }
}

/// Where the proxy should connect to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TargetAddr {
    Ip(SocketAddr),
    Domain(String, u16),
}

impl TargetAddr {
    pub fn new(host: &str, port: u16) -> Self {
        match host.parse::<IpAddr>() {
            Ok(ip) => TargetAddr::Ip(SocketAddr::new(ip, port)),
            Err(_) => TargetAddr::Domain(host.to_string(), port),
        }
    }

    pub fn port(&self) -> u16 {
        match self {
            TargetAddr::Ip(addr) => addr.port(),
            TargetAddr::Domain(_, port) => *port,
        }
    }
}

impl fmt::Display for TargetAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetAddr::Ip(addr) => write!(f, "{addr}"),
            TargetAddr::Domain(domain, port) => write!(f, "{domain}:{port}"),
        }
    }
}

async fn resolve(host: &str, port: u16) -> Result<Vec<SocketAddr>, SocketError> {
    let addrs: Vec<SocketAddr> = lookup_host((host, port))
        .await
        .map_err(|e| SocketError::new(SocketErrorKind::HostNotFound, format!("{host}: {e}")))?
        .collect();
    if addrs.is_empty() {
        return Err(SocketError::new(
            SocketErrorKind::HostNotFound,
            format!("no address found for {host}"),
        ));
    }
    Ok(addrs)
}

pub async fn connect_direct(host: &str, port: u16) -> Result<TcpStream, SocketError> {
    let addrs = resolve(host, port).await?;
    let mut last_err = None;
    for addr in addrs {
        match TcpStream::connect(addr).await {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                debug!("connect to {addr} failed: {e}");
                last_err = Some(e);
            }
        }
    }
    Err(last_err
        .map(SocketError::from)
        .unwrap_or_else(|| SocketError::new(SocketErrorKind::Unknown, "no address to connect to")))
}

async fn connect_proxy(proxy: &ProxyDescriptor) -> Result<TcpStream, SocketError> {
    connect_direct(proxy.host(), proxy.port())
        .await
        .map_err(|e| match e.kind() {
            SocketErrorKind::ConnectionRefused => SocketError::new(
                SocketErrorKind::ProxyConnectionRefused,
                format!("proxy {proxy}: {}", e.message()),
            ),
            _ => e,
        })
}

/// Connect to `host:port`, through the proxy if it is not a no-proxy one.
///
/// Data already received from the target is returned along with the stream.
pub async fn connect_via(
    proxy: &ProxyDescriptor,
    host: &str,
    port: u16,
) -> Result<(TcpStream, Bytes), SocketError> {
    match proxy.proxy_type() {
        ProxyType::NoProxy => {
            let stream = connect_direct(host, port).await?;
            Ok((stream, Bytes::new()))
        }
        ProxyType::Socks5 => {
            let target = if proxy.is_socks5_hostname() {
                TargetAddr::new(host, port)
            } else {
                let addrs = resolve(host, port).await?;
                TargetAddr::Ip(addrs[0])
            };
            let mut stream = connect_proxy(proxy).await?;
            socks5_connect_to(&mut stream, proxy.user(), proxy.password(), &target).await?;
            Ok((stream, Bytes::new()))
        }
        ProxyType::Http => {
            let target = TargetAddr::new(host, port);
            let mut stream = connect_proxy(proxy).await?;
            let leftover =
                http_connect_to(&mut stream, proxy.user(), proxy.password(), &target).await?;
            Ok((stream, leftover))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_addr() {
        assert_eq!(
            TargetAddr::new("127.0.0.1", 80),
            TargetAddr::Ip("127.0.0.1:80".parse().unwrap())
        );
        assert_eq!(TargetAddr::new("::1", 80).to_string(), "[::1]:80");
        assert_eq!(TargetAddr::new("example.net", 81).to_string(), "example.net:81");
    }

    #[test]
    fn tunnel_error_kind() {
        let e = SocketError::from(TunnelError::AuthFailed);
        assert_eq!(e.kind(), SocketErrorKind::ProxyAuthenticationRequired);
        let e = SocketError::from(TunnelError::UnexpectedStatusCode(407, "Auth".to_string()));
        assert_eq!(e.kind(), SocketErrorKind::ProxyAuthenticationRequired);
        let e = SocketError::from(TunnelError::Rejected(0x05, "Connection refused"));
        assert_eq!(e.kind(), SocketErrorKind::ConnectionRefused);
        let e = SocketError::from(TunnelError::WriteFailed(io::Error::from(
            io::ErrorKind::BrokenPipe,
        )));
        assert_eq!(e.kind(), SocketErrorKind::RemoteHostClosed);
        let e = SocketError::from(TunnelError::InvalidProtocol("invalid version"));
        assert_eq!(e.kind(), SocketErrorKind::ProxyProtocol);
    }

    #[tokio::test]
    async fn refused_proxy() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let proxy = ProxyDescriptor::new(ProxyType::Http, "127.0.0.1".to_string(), port);
        let e = connect_via(&proxy, "example.net", 80).await.unwrap_err();
        assert_eq!(e.kind(), SocketErrorKind::ProxyConnectionRefused);
    }
}
