/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use percent_encoding::percent_decode_str;
use thiserror::Error;
use url::{Host, Url};

mod env;
mod no_proxy;
mod query;
mod selector;

pub use env::{ProxyEnv, ProxyEnvError, ProxyEnvVar};
pub use no_proxy::NoProxyRule;
pub use query::{ProxyQuery, ProxyQueryType};
pub use selector::ProxySelector;

const DEFAULT_SOCKS5_PORT: u16 = 1080;
const DEFAULT_HTTP_PORT: u16 = 8080;

#[derive(Debug, Error)]
pub enum ProxyParseError {
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("no host found")]
    NoHostFound,
}

bitflags! {
    #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
    pub struct ProxyCapabilities: u8 {
        const TUNNELING = 0b0000_0001;
        const LISTENING = 0b0000_0010;
        const UDP_TUNNELING = 0b0000_0100;
        const CACHING = 0b0000_1000;
        /// the proxy resolves the destination host name itself
        const HOST_NAME_LOOKUP = 0b0001_0000;
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ProxyType {
    NoProxy,
    Http,
    Socks5,
}

impl ProxyType {
    pub fn default_capabilities(&self) -> ProxyCapabilities {
        match self {
            ProxyType::NoProxy => {
                ProxyCapabilities::TUNNELING
                    | ProxyCapabilities::LISTENING
                    | ProxyCapabilities::UDP_TUNNELING
            }
            ProxyType::Http => {
                ProxyCapabilities::TUNNELING
                    | ProxyCapabilities::CACHING
                    | ProxyCapabilities::HOST_NAME_LOOKUP
            }
            ProxyType::Socks5 => {
                ProxyCapabilities::TUNNELING
                    | ProxyCapabilities::LISTENING
                    | ProxyCapabilities::UDP_TUNNELING
            }
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ProxyDescriptor {
    proxy_type: ProxyType,
    host: String,
    port: u16,
    user: String,
    password: String,
    capabilities: ProxyCapabilities,
}

impl ProxyDescriptor {
    pub fn no_proxy() -> Self {
        ProxyDescriptor::new(ProxyType::NoProxy, String::new(), 0)
    }

    pub fn new(proxy_type: ProxyType, host: String, port: u16) -> Self {
        ProxyDescriptor {
            proxy_type,
            host,
            port,
            user: String::new(),
            password: String::new(),
            capabilities: proxy_type.default_capabilities(),
        }
    }

    pub fn with_auth(mut self, user: String, password: String) -> Self {
        self.user = user;
        self.password = password;
        self
    }

    pub fn set_capabilities(&mut self, capabilities: ProxyCapabilities) {
        self.capabilities = capabilities;
    }

    #[inline]
    pub fn proxy_type(&self) -> ProxyType {
        self.proxy_type
    }

    #[inline]
    pub fn is_no_proxy(&self) -> bool {
        self.proxy_type == ProxyType::NoProxy
    }

    #[inline]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[inline]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[inline]
    pub fn user(&self) -> &str {
        &self.user
    }

    #[inline]
    pub fn password(&self) -> &str {
        &self.password
    }

    #[inline]
    pub fn capabilities(&self) -> ProxyCapabilities {
        self.capabilities
    }

    /// socks5 proxy that expects the destination as a host name
    pub fn is_socks5_hostname(&self) -> bool {
        self.proxy_type == ProxyType::Socks5
            && self
                .capabilities
                .contains(ProxyCapabilities::HOST_NAME_LOOKUP)
    }

    /// Build a descriptor from the value of a proxy environment variable.
    ///
    /// Values without a scheme are taken as http proxies. `Ok(None)` is
    /// returned when the scheme is not usable for the query type.
    pub fn from_env_value(
        value: &str,
        query_type: ProxyQueryType,
    ) -> Result<Option<Self>, ProxyParseError> {
        let url = if value.contains("://") {
            Url::parse(value)?
        } else {
            Url::parse(&format!("http://{value}"))?
        };

        let proxy = match url.scheme() {
            "socks5" => Some(ProxyDescriptor::from_url_authority(
                &url,
                value,
                ProxyType::Socks5,
                DEFAULT_SOCKS5_PORT,
            )?),
            "socks5h" => {
                let mut proxy = ProxyDescriptor::from_url_authority(
                    &url,
                    value,
                    ProxyType::Socks5,
                    DEFAULT_SOCKS5_PORT,
                )?;
                proxy.capabilities |= ProxyCapabilities::HOST_NAME_LOOKUP;
                Some(proxy)
            }
            "http" if query_type.allows_http_proxy() => Some(ProxyDescriptor::from_url_authority(
                &url,
                value,
                ProxyType::Http,
                DEFAULT_HTTP_PORT,
            )?),
            _ => None,
        };
        Ok(proxy)
    }

    fn from_url_authority(
        url: &Url,
        raw: &str,
        proxy_type: ProxyType,
        default_port: u16,
    ) -> Result<Self, ProxyParseError> {
        let host = match url.host().ok_or(ProxyParseError::NoHostFound)? {
            Host::Domain(domain) => domain.to_string(),
            Host::Ipv4(ip4) => ip4.to_string(),
            Host::Ipv6(ip6) => ip6.to_string(),
        };
        if host.is_empty() {
            return Err(ProxyParseError::NoHostFound);
        }
        let port = url
            .port()
            .or_else(|| authority_port(raw))
            .filter(|port| *port != 0)
            .unwrap_or(default_port);

        let user = percent_decode_str(url.username())
            .decode_utf8_lossy()
            .into_owned();
        let password = url
            .password()
            .map(|p| percent_decode_str(p).decode_utf8_lossy().into_owned())
            .unwrap_or_default();

        Ok(ProxyDescriptor::new(proxy_type, host, port).with_auth(user, password))
    }
}

/// Port written in the authority part of a raw url string.
///
/// The url parser drops ports equal to the scheme default, e.g. `:80` for http.
fn authority_port(raw: &str) -> Option<u16> {
    let rest = raw.split_once("://").map(|(_, r)| r).unwrap_or(raw);
    let authority = rest.split(['/', '?', '#']).next()?;
    let host_port = authority
        .rsplit_once('@')
        .map(|(_, h)| h)
        .unwrap_or(authority);
    let (host, port) = host_port.rsplit_once(':')?;
    if host.ends_with(']') || !host.contains(':') {
        u16::from_str(port).ok()
    } else {
        None
    }
}

impl fmt::Display for ProxyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = match self.proxy_type {
            ProxyType::NoProxy => return f.write_str("NoProxy"),
            ProxyType::Http => "http",
            ProxyType::Socks5 => {
                if self.is_socks5_hostname() {
                    "socks5h"
                } else {
                    "socks5"
                }
            }
        };
        write!(f, "{scheme}://")?;
        if !self.user.is_empty() {
            write!(f, "{}@", self.user)?;
        }
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socks5_with_auth() {
        let p = ProxyDescriptor::from_env_value("socks5://u:p@host:1111", ProxyQueryType::TcpSocket)
            .unwrap()
            .unwrap();
        assert_eq!(p.proxy_type(), ProxyType::Socks5);
        assert_eq!(p.host(), "host");
        assert_eq!(p.port(), 1111);
        assert_eq!(p.user(), "u");
        assert_eq!(p.password(), "p");
        assert!(!p.capabilities().contains(ProxyCapabilities::HOST_NAME_LOOKUP));
        assert!(!p.is_socks5_hostname());
    }

    #[test]
    fn socks5h_default_port() {
        let p = ProxyDescriptor::from_env_value("socks5h://proxy.local", ProxyQueryType::UdpSocket)
            .unwrap()
            .unwrap();
        assert_eq!(p.port(), 1080);
        assert!(p.is_socks5_hostname());
        assert_eq!(p.to_string(), "socks5h://proxy.local:1080");
    }

    #[test]
    fn http_variants() {
        let p = ProxyDescriptor::from_env_value("http://host", ProxyQueryType::UrlRequest)
            .unwrap()
            .unwrap();
        assert_eq!(p.proxy_type(), ProxyType::Http);
        assert_eq!(p.port(), 8080);

        let p = ProxyDescriptor::from_env_value("http://host:80", ProxyQueryType::UrlRequest)
            .unwrap()
            .unwrap();
        assert_eq!(p.port(), 80);

        let p = ProxyDescriptor::from_env_value("10.0.0.1:3128", ProxyQueryType::TcpSocket)
            .unwrap()
            .unwrap();
        assert_eq!(p.proxy_type(), ProxyType::Http);
        assert_eq!(p.host(), "10.0.0.1");
        assert_eq!(p.port(), 3128);

        let p = ProxyDescriptor::from_env_value("http://a%40b:p%3Aw@[::1]:81", ProxyQueryType::TcpSocket)
            .unwrap()
            .unwrap();
        assert_eq!(p.host(), "::1");
        assert_eq!(p.port(), 81);
        assert_eq!(p.user(), "a@b");
        assert_eq!(p.password(), "p:w");
        assert_eq!(p.to_string(), "http://a@b@[::1]:81");
    }

    #[test]
    fn http_not_for_server_or_udp() {
        assert!(
            ProxyDescriptor::from_env_value("http://host:3128", ProxyQueryType::TcpServer)
                .unwrap()
                .is_none()
        );
        assert!(
            ProxyDescriptor::from_env_value("host:3128", ProxyQueryType::UdpSocket)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn unknown_scheme() {
        assert!(
            ProxyDescriptor::from_env_value("https://host:3128", ProxyQueryType::TcpSocket)
                .unwrap()
                .is_none()
        );
        assert!(ProxyDescriptor::from_env_value("http://", ProxyQueryType::TcpSocket).is_err());
    }

    #[test]
    fn raw_authority_port() {
        assert_eq!(authority_port("http://h:80"), Some(80));
        assert_eq!(authority_port("http://u:p@h:80/x"), Some(80));
        assert_eq!(authority_port("http://[::1]:80"), Some(80));
        assert_eq!(authority_port("http://[::1]"), None);
        assert_eq!(authority_port("http://h"), None);
    }
}
