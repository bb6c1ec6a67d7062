/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::fmt;

use url::{Host, Url};

use crate::net::ProxyQueryType;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Operation {
    Head,
    Get,
    Put,
    Post,
    Delete,
    Custom,
}

impl Operation {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Operation::Head => "HEAD",
            Operation::Get => "GET",
            Operation::Put => "PUT",
            Operation::Post => "POST",
            Operation::Delete => "DELETE",
            Operation::Custom => "CUSTOM",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A logical network request, immutable once handed to a backend.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NetworkRequest {
    operation: Operation,
    url: Url,
    proxy_query_type: Option<ProxyQueryType>,
}

impl NetworkRequest {
    pub fn new(operation: Operation, url: Url) -> Self {
        NetworkRequest {
            operation,
            url,
            proxy_query_type: None,
        }
    }

    /// Ask the transport to resolve a proxy for this request.
    pub fn with_proxy_query(mut self, query_type: ProxyQueryType) -> Self {
        self.proxy_query_type = Some(query_type);
        self
    }

    #[inline]
    pub fn operation(&self) -> Operation {
        self.operation
    }

    #[inline]
    pub fn url(&self) -> &Url {
        &self.url
    }

    #[inline]
    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    #[inline]
    pub fn proxy_query_type(&self) -> Option<ProxyQueryType> {
        self.proxy_query_type
    }

    /// The destination host, ipv6 addresses without brackets.
    pub fn peer_host(&self) -> Option<String> {
        match self.url.host()? {
            Host::Domain(domain) => Some(domain.to_string()),
            Host::Ipv4(ip4) => Some(ip4.to_string()),
            Host::Ipv6(ip6) => Some(ip6.to_string()),
        }
    }

    pub fn port_or(&self, default_port: u16) -> u16 {
        self.url.port().unwrap_or(default_port)
    }

    pub fn query_item_value(&self, key: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }
}
