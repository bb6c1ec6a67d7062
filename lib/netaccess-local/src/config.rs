/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

const DEFAULT_LISTEN_BACKLOG: u32 = 50;
const DEFAULT_MAX_PENDING_CONNECTIONS: usize = 30;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LocalServerConfig {
    backlog: u32,
    max_pending_connections: usize,
}

impl Default for LocalServerConfig {
    fn default() -> Self {
        LocalServerConfig {
            backlog: DEFAULT_LISTEN_BACKLOG,
            max_pending_connections: DEFAULT_MAX_PENDING_CONNECTIONS,
        }
    }
}

impl LocalServerConfig {
    pub fn set_backlog(&mut self, backlog: u32) {
        self.backlog = backlog.max(1);
    }

    #[inline]
    pub fn backlog(&self) -> u32 {
        self.backlog
    }

    pub fn set_max_pending_connections(&mut self, max: usize) {
        self.max_pending_connections = max.max(1);
    }

    /// Accepted connections not yet taken by the user.
    #[inline]
    pub fn max_pending_connections(&self) -> usize {
        self.max_pending_connections
    }
}
