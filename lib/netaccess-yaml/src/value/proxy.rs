/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::str::FromStr;

use anyhow::{Context, anyhow};
use yaml_rust::Yaml;

use netaccess_types::net::{ProxyEnv, ProxyEnvVar};

/// A proxy environment snapshot, used in place of the process environment.
pub fn as_proxy_env(value: &Yaml) -> anyhow::Result<ProxyEnv> {
    let Yaml::Hash(map) = value else {
        return Err(anyhow!(
            "yaml value type for 'proxy env' should be 'map'"
        ));
    };

    let mut env = ProxyEnv::default();
    crate::foreach_kv(map, |k, v| {
        let var = ProxyEnvVar::from_str(&crate::key::normalize(k))?;
        let value =
            crate::value::as_string(v).context(format!("invalid string value for key {k}"))?;
        env.set(var, value);
        Ok(())
    })?;
    Ok(env)
}

#[cfg(test)]
mod tests {
    use super::*;
    use yaml_rust::YamlLoader;

    #[test]
    fn snapshot() {
        let yaml = yaml_doc!(
            r#"
                HTTP_PROXY: proxy.local:3128
                no-proxy: .internal, localhost
                all_proxy: ~
            "#
        );
        let env = as_proxy_env(&yaml).unwrap();
        assert_eq!(env.get(ProxyEnvVar::HttpProxy), "proxy.local:3128");
        assert_eq!(env.get(ProxyEnvVar::NoProxy), ".internal, localhost");
        assert_eq!(env.get(ProxyEnvVar::AllProxy), "");
    }

    #[test]
    fn unknown_variable() {
        let yaml = yaml_doc!("gopher_proxy: x");
        assert!(as_proxy_env(&yaml).is_err());
    }
}
