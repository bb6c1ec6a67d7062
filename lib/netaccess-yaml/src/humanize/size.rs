/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use anyhow::anyhow;
use humanize_rs::bytes::Bytes;
use yaml_rust::Yaml;

pub fn as_usize(v: &Yaml) -> anyhow::Result<usize> {
    match v {
        Yaml::String(value) => {
            let v = value.parse::<Bytes>()?;
            Ok(v.size())
        }
        Yaml::Integer(value) => Ok(usize::try_from(*value)?),
        _ => Err(anyhow!(
            "yaml value type for humanize usize should be 'string' or 'integer'"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes() {
        assert_eq!(as_usize(&Yaml::String("16K".to_string())).unwrap(), 16000);
        assert_eq!(as_usize(&Yaml::String("16KiB".to_string())).unwrap(), 16384);
        assert_eq!(as_usize(&Yaml::Integer(4096)).unwrap(), 4096);
        assert!(as_usize(&Yaml::Integer(-1)).is_err());
        assert!(as_usize(&Yaml::Boolean(true)).is_err());
    }
}
