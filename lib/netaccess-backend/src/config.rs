/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::time::Duration;

use netaccess_io::PumpConfig;

const DEFAULT_READ_BUFFER_SIZE: usize = 16 * 1024; // 16KB
const MINIMAL_READ_BUFFER_SIZE: usize = 1024; // 1KB
const DEFAULT_PIPE_PORT: u16 = 12345;
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PipeConfig {
    read_buffer_size: usize,
    default_port: u16,
    connect_timeout: Duration,
    pump: PumpConfig,
}

impl Default for PipeConfig {
    fn default() -> Self {
        PipeConfig {
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            default_port: DEFAULT_PIPE_PORT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            pump: PumpConfig::default(),
        }
    }
}

impl PipeConfig {
    pub fn set_read_buffer_size(&mut self, size: usize) {
        self.read_buffer_size = size.max(MINIMAL_READ_BUFFER_SIZE);
    }

    #[inline]
    pub fn read_buffer_size(&self) -> usize {
        self.read_buffer_size
    }

    pub fn set_default_port(&mut self, port: u16) {
        self.default_port = port;
    }

    /// Port used when the url has none.
    #[inline]
    pub fn default_port(&self) -> u16 {
        self.default_port
    }

    pub fn set_connect_timeout(&mut self, timeout: Duration) {
        self.connect_timeout = timeout;
    }

    #[inline]
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn set_pump(&mut self, pump: PumpConfig) {
        self.pump = pump;
    }

    #[inline]
    pub fn pump(&self) -> &PumpConfig {
        &self.pump
    }
}
