/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

const DEFAULT_CHUNK_SIZE: usize = 16 * 1024; // 16KB
const MINIMAL_CHUNK_SIZE: usize = 1024; // 1KB

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PumpConfig {
    chunk_size: usize,
}

impl Default for PumpConfig {
    fn default() -> Self {
        PumpConfig {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl PumpConfig {
    pub fn set_chunk_size(&mut self, chunk_size: usize) {
        self.chunk_size = chunk_size.max(MINIMAL_CHUNK_SIZE);
    }

    /// Size of a single peek from the upload source.
    #[inline]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Outstanding write bytes at which the pump stops producing.
    #[inline]
    pub fn high_water_mark(&self) -> usize {
        self.chunk_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp() {
        let mut config = PumpConfig::default();
        assert_eq!(config.chunk_size(), 16384);
        assert_eq!(config.high_water_mark(), 16384);
        config.set_chunk_size(10);
        assert_eq!(config.chunk_size(), 1024);
        config.set_chunk_size(4096);
        assert_eq!(config.high_water_mark(), 4096);
    }
}
