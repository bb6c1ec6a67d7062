/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use log::{debug, warn};

use super::{NoProxyRule, ProxyDescriptor, ProxyEnv, ProxyEnvVar, ProxyQuery};

/// Resolve proxies for a destination from the proxy environment variables.
///
/// With no snapshot set, the process environment is read on every query.
#[derive(Clone, Debug, Default)]
pub struct ProxySelector {
    env: Option<ProxyEnv>,
}

impl ProxySelector {
    pub fn new(env: Option<ProxyEnv>) -> Self {
        ProxySelector { env }
    }

    pub fn with_env(env: ProxyEnv) -> Self {
        ProxySelector { env: Some(env) }
    }

    pub fn select(&self, query: &ProxyQuery) -> Vec<ProxyDescriptor> {
        match &self.env {
            Some(env) => Self::select_from_env(env, query),
            None => match ProxyEnv::from_process() {
                Ok(env) => Self::select_from_env(&env, query),
                Err(e) => {
                    warn!("failed to load proxy environment: {e}");
                    vec![ProxyDescriptor::no_proxy()]
                }
            },
        }
    }

    /// The candidate list, never empty.
    pub fn select_from_env(env: &ProxyEnv, query: &ProxyQuery) -> Vec<ProxyDescriptor> {
        let rule = NoProxyRule::parse(env.get(ProxyEnvVar::NoProxy));
        if rule.matches(query.peer_host()) {
            debug!("proxy ignored for host {}", query.peer_host());
            return vec![ProxyDescriptor::no_proxy()];
        }

        let mut value = env.get(ProxyEnvVar::for_protocol(query.protocol_tag()));
        if value.is_empty() {
            value = env.get(ProxyEnvVar::HttpProxy);
        }

        let mut proxies = Vec::with_capacity(1);
        if !value.is_empty() {
            match ProxyDescriptor::from_env_value(value, query.query_type()) {
                Ok(Some(proxy)) => proxies.push(proxy),
                Ok(None) => {}
                Err(e) => warn!("invalid proxy value {value}: {e}"),
            }
        }
        if proxies.is_empty() {
            proxies.push(ProxyDescriptor::no_proxy());
        }
        proxies
    }
}
