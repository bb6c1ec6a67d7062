/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::str::FromStr;

use url::{Host, Url};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum ProxyQueryType {
    #[default]
    TcpSocket,
    UdpSocket,
    TcpServer,
    UrlRequest,
}

impl ProxyQueryType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ProxyQueryType::TcpSocket => "tcp",
            ProxyQueryType::UdpSocket => "udp",
            ProxyQueryType::TcpServer => "server",
            ProxyQueryType::UrlRequest => "url",
        }
    }

    /// http proxies can neither relay datagrams nor accept inbound connections
    #[inline]
    pub fn allows_http_proxy(&self) -> bool {
        !matches!(self, ProxyQueryType::UdpSocket | ProxyQueryType::TcpServer)
    }
}

impl fmt::Display for ProxyQueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProxyQueryType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" | "tcp_socket" => Ok(ProxyQueryType::TcpSocket),
            "udp" | "udp_socket" => Ok(ProxyQueryType::UdpSocket),
            "server" | "tcp_server" => Ok(ProxyQueryType::TcpServer),
            "url" | "url_request" => Ok(ProxyQueryType::UrlRequest),
            _ => Err(()),
        }
    }
}

/// The destination a proxy is requested for.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ProxyQuery {
    query_type: ProxyQueryType,
    protocol_tag: String,
    peer_host: String,
    peer_port: u16,
}

impl ProxyQuery {
    pub fn new(query_type: ProxyQueryType, protocol_tag: &str, peer_host: &str, peer_port: u16) -> Self {
        ProxyQuery {
            query_type,
            protocol_tag: protocol_tag.to_ascii_lowercase(),
            peer_host: peer_host.to_string(),
            peer_port,
        }
    }

    /// Build a query from a destination url, the scheme is used as protocol tag.
    pub fn from_url(query_type: ProxyQueryType, url: &Url) -> Self {
        let peer_host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(ip4)) => ip4.to_string(),
            Some(Host::Ipv6(ip6)) => ip6.to_string(),
            None => String::new(),
        };
        ProxyQuery {
            query_type,
            protocol_tag: url.scheme().to_string(),
            peer_host,
            peer_port: url.port_or_known_default().unwrap_or_default(),
        }
    }

    #[inline]
    pub fn query_type(&self) -> ProxyQueryType {
        self.query_type
    }

    #[inline]
    pub fn protocol_tag(&self) -> &str {
        &self.protocol_tag
    }

    #[inline]
    pub fn peer_host(&self) -> &str {
        &self.peer_host
    }

    #[inline]
    pub fn peer_port(&self) -> u16 {
        self.peer_port
    }
}
