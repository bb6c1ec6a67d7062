/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::env::{self, VarError};
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProxyEnvError {
    #[error("unknown proxy variable {0}")]
    UnknownVariable(String),
    #[error("value of {0} is not valid unicode")]
    NotUnicode(&'static str),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ProxyEnvVar {
    NoProxy,
    HttpProxy,
    HttpsProxy,
    FtpProxy,
    AllProxy,
}

impl ProxyEnvVar {
    pub const ALL: [ProxyEnvVar; 5] = [
        ProxyEnvVar::NoProxy,
        ProxyEnvVar::HttpProxy,
        ProxyEnvVar::HttpsProxy,
        ProxyEnvVar::FtpProxy,
        ProxyEnvVar::AllProxy,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            ProxyEnvVar::NoProxy => "no_proxy",
            ProxyEnvVar::HttpProxy => "http_proxy",
            ProxyEnvVar::HttpsProxy => "https_proxy",
            ProxyEnvVar::FtpProxy => "ftp_proxy",
            ProxyEnvVar::AllProxy => "all_proxy",
        }
    }

    /// The variable holding the proxy for a protocol tag.
    pub fn for_protocol(protocol_tag: &str) -> Self {
        match protocol_tag {
            "http" => ProxyEnvVar::HttpProxy,
            "https" => ProxyEnvVar::HttpsProxy,
            "ftp" => ProxyEnvVar::FtpProxy,
            _ => ProxyEnvVar::AllProxy,
        }
    }

    const fn index(&self) -> usize {
        match self {
            ProxyEnvVar::NoProxy => 0,
            ProxyEnvVar::HttpProxy => 1,
            ProxyEnvVar::HttpsProxy => 2,
            ProxyEnvVar::FtpProxy => 3,
            ProxyEnvVar::AllProxy => 4,
        }
    }
}

impl FromStr for ProxyEnvVar {
    type Err = ProxyEnvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProxyEnvVar::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ProxyEnvError::UnknownVariable(s.to_string()))
    }
}

/// A read-only snapshot of the proxy environment variables.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ProxyEnv {
    values: [String; 5],
}

impl ProxyEnv {
    pub fn from_process() -> Result<Self, ProxyEnvError> {
        let mut proxy_env = ProxyEnv::default();
        for var in ProxyEnvVar::ALL {
            match env::var(var.as_str()) {
                Ok(value) => proxy_env.set(var, value),
                Err(VarError::NotPresent) => {}
                Err(VarError::NotUnicode(_)) => return Err(ProxyEnvError::NotUnicode(var.as_str())),
            }
        }
        Ok(proxy_env)
    }

    pub fn set(&mut self, var: ProxyEnvVar, value: String) {
        self.values[var.index()] = value;
    }

    pub fn with(mut self, var: ProxyEnvVar, value: &str) -> Self {
        self.set(var, value.to_string());
        self
    }

    /// The trimmed value, empty if unset.
    pub fn get(&self, var: ProxyEnvVar) -> &str {
        self.values[var.index()].trim()
    }

    pub fn is_empty(&self) -> bool {
        self.values.iter().all(|v| v.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn var_names() {
        assert_eq!(ProxyEnvVar::from_str("HTTPS_PROXY").unwrap(), ProxyEnvVar::HttpsProxy);
        assert!(ProxyEnvVar::from_str("socks_proxy").is_err());
        assert_eq!(ProxyEnvVar::for_protocol("ftp"), ProxyEnvVar::FtpProxy);
        assert_eq!(ProxyEnvVar::for_protocol("debugpipe"), ProxyEnvVar::AllProxy);
    }

    #[test]
    fn snapshot() {
        let env = ProxyEnv::default().with(ProxyEnvVar::NoProxy, "  .local ");
        assert_eq!(env.get(ProxyEnvVar::NoProxy), ".local");
        assert_eq!(env.get(ProxyEnvVar::HttpProxy), "");
        assert!(!env.is_empty());
        assert!(ProxyEnv::default().is_empty());
    }
}
