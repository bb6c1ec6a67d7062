/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::path::PathBuf;

use anyhow::{Context, anyhow};
use yaml_rust::Yaml;

use netaccess_local::LocalServerConfig;
use netaccess_local::registry::RegistryScope;

pub fn as_local_server_config(value: &Yaml) -> anyhow::Result<LocalServerConfig> {
    let Yaml::Hash(map) = value else {
        return Err(anyhow!(
            "yaml value type for 'local server config' should be 'map'"
        ));
    };

    let mut config = LocalServerConfig::default();
    crate::foreach_kv(map, |k, v| match crate::key::normalize(k).as_str() {
        "backlog" => {
            let backlog =
                crate::value::as_u32(v).context(format!("invalid u32 value for key {k}"))?;
            config.set_backlog(backlog);
            Ok(())
        }
        "max_pending_connections" | "max_pending" => {
            let max =
                crate::value::as_usize(v).context(format!("invalid usize value for key {k}"))?;
            config.set_max_pending_connections(max);
            Ok(())
        }
        _ => Err(anyhow!("invalid key {k}")),
    })?;
    Ok(config)
}

pub fn as_registry_scope(value: &Yaml) -> anyhow::Result<RegistryScope> {
    let Yaml::Hash(map) = value else {
        return Err(anyhow!(
            "yaml value type for 'registry scope' should be 'map'"
        ));
    };

    let mut scope = RegistryScope::default();
    crate::foreach_kv(map, |k, v| match crate::key::normalize(k).as_str() {
        "organization" | "org" => {
            let organization =
                crate::value::as_string(v).context(format!("invalid string value for key {k}"))?;
            if organization.is_empty() {
                return Err(anyhow!("empty organization name"));
            }
            scope.set_organization(organization);
            Ok(())
        }
        "application" | "app" => {
            let application =
                crate::value::as_string(v).context(format!("invalid string value for key {k}"))?;
            if application.is_empty() {
                return Err(anyhow!("empty application name"));
            }
            scope.set_application(application);
            Ok(())
        }
        "path" | "file" => {
            let path =
                crate::value::as_string(v).context(format!("invalid string value for key {k}"))?;
            if path.is_empty() {
                return Err(anyhow!("empty registry file path"));
            }
            scope.set_path(PathBuf::from(path));
            Ok(())
        }
        _ => Err(anyhow!("invalid key {k}")),
    })?;
    Ok(scope)
}
