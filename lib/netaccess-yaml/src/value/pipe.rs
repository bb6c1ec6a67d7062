/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use anyhow::{Context, anyhow};
use yaml_rust::Yaml;

use netaccess_backend::PipeConfig;

pub fn as_pipe_config(value: &Yaml) -> anyhow::Result<PipeConfig> {
    let Yaml::Hash(map) = value else {
        return Err(anyhow!(
            "yaml value type for 'pipe config' should be 'map'"
        ));
    };

    let mut config = PipeConfig::default();
    crate::foreach_kv(map, |k, v| match crate::key::normalize(k).as_str() {
        "read_buffer_size" | "read_buffer" => {
            let size = crate::humanize::as_usize(v)
                .context(format!("invalid humanize usize value for key {k}"))?;
            config.set_read_buffer_size(size);
            Ok(())
        }
        "default_port" | "port" => {
            let port =
                crate::value::as_u16(v).context(format!("invalid u16 value for key {k}"))?;
            config.set_default_port(port);
            Ok(())
        }
        "connect_timeout" => {
            let timeout = crate::humanize::as_duration(v)
                .context(format!("invalid humanize duration value for key {k}"))?;
            config.set_connect_timeout(timeout);
            Ok(())
        }
        "chunk_size" | "upload_chunk_size" => {
            let size = crate::humanize::as_usize(v)
                .context(format!("invalid humanize usize value for key {k}"))?;
            let mut pump = *config.pump();
            pump.set_chunk_size(size);
            config.set_pump(pump);
            Ok(())
        }
        _ => Err(anyhow!("invalid key {k}")),
    })?;
    Ok(config)
}
