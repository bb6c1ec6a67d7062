/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use anyhow::{Context, anyhow};
use yaml_rust::{Yaml, yaml};

pub fn foreach_kv<F>(table: &yaml::Hash, mut f: F) -> anyhow::Result<()>
where
    F: FnMut(&str, &Yaml) -> anyhow::Result<()>,
{
    for (k, v) in table.iter() {
        let Yaml::String(key) = k else {
            return Err(anyhow!("key in hash should be string"));
        };
        f(key, v).context(format!("failed to parse value of key {key}"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use yaml_rust::YamlLoader;

    #[test]
    fn visit_in_order() {
        let yaml = yaml_doc!("b: 1\na: 2");
        let mut keys = Vec::new();
        foreach_kv(yaml.as_hash().unwrap(), |k, _| {
            keys.push(k.to_string());
            Ok(())
        })
        .unwrap();
        assert_eq!(keys, ["b", "a"]);
    }

    #[test]
    fn non_string_key() {
        let yaml = yaml_doc!("1: a");
        assert!(foreach_kv(yaml.as_hash().unwrap(), |_, _| Ok(())).is_err());
    }
}
