/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::path::Path;

use anyhow::{Context, anyhow};
use yaml_rust::Yaml;

use netaccess_backend::PipeConfig;
use netaccess_local::LocalServerConfig;
use netaccess_local::registry::RegistryScope;
use netaccess_types::net::ProxyEnv;

#[derive(Clone, Debug, Default)]
pub struct AppConfig {
    pipe: PipeConfig,
    local_server: LocalServerConfig,
    registry: RegistryScope,
    proxy_env: Option<ProxyEnv>,
}

impl AppConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let doc = netaccess_yaml::load_doc(path)?;
        AppConfig::parse(&doc).context(format!("invalid config file {}", path.display()))
    }

    pub fn parse(doc: &Yaml) -> anyhow::Result<Self> {
        let mut config = AppConfig::default();
        let map = match doc {
            Yaml::Hash(map) => map,
            Yaml::Null => return Ok(config),
            _ => return Err(anyhow!("the config document should be a map")),
        };
        netaccess_yaml::foreach_kv(map, |k, v| {
            match netaccess_yaml::key::normalize(k).as_str() {
                "pipe" => config.pipe = netaccess_yaml::value::as_pipe_config(v)?,
                "local_server" => {
                    config.local_server = netaccess_yaml::value::as_local_server_config(v)?
                }
                "registry" => config.registry = netaccess_yaml::value::as_registry_scope(v)?,
                "proxy_env" => config.proxy_env = Some(netaccess_yaml::value::as_proxy_env(v)?),
                _ => return Err(anyhow!("invalid key {k}")),
            }
            Ok(())
        })?;
        Ok(config)
    }

    #[inline]
    pub fn pipe(&self) -> &PipeConfig {
        &self.pipe
    }

    #[inline]
    pub fn local_server(&self) -> &LocalServerConfig {
        &self.local_server
    }

    #[inline]
    pub fn registry(&self) -> &RegistryScope {
        &self.registry
    }

    /// The proxy environment snapshot, the process environment is used if absent.
    #[inline]
    pub fn proxy_env(&self) -> Option<&ProxyEnv> {
        self.proxy_env.as_ref()
    }
}
