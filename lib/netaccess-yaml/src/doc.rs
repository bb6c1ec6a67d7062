/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::fs;
use std::path::Path;

use anyhow::{Context, anyhow};
use yaml_rust::{Yaml, YamlLoader};

/// Load the first document of a yaml file, `Yaml::Null` if there is none.
pub fn load_doc(path: &Path) -> anyhow::Result<Yaml> {
    let content = fs::read_to_string(path)
        .context(format!("failed to read file {}", path.display()))?;
    let docs = YamlLoader::load_from_str(&content)
        .map_err(|e| anyhow!("invalid yaml file {}: {e}", path.display()))?;
    Ok(docs.into_iter().next().unwrap_or(Yaml::Null))
}
