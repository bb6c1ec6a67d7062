/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::sync::Arc;

use thiserror::Error;

mod file;
mod memory;

pub use file::{FileRegistry, RegistryScope};
pub use memory::MemoryRegistry;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("io failed: {0:?}")]
    Io(#[from] io::Error),
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("the registry is not a json object")]
    InvalidFormat,
    #[error("no config directory found")]
    NoConfigDir,
}

/// Durable name to port store shared by local servers and their clients.
///
/// Operations are independent, the last writer wins.
pub trait ServerRegistry: Send + Sync {
    fn contains(&self, key: &str) -> bool {
        self.value(key).is_some()
    }

    fn value(&self, key: &str) -> Option<String>;

    fn set_value(&self, key: &str, value: &str);

    fn remove(&self, key: &str);
}

impl<T: ServerRegistry + ?Sized> ServerRegistry for Arc<T> {
    fn contains(&self, key: &str) -> bool {
        (**self).contains(key)
    }

    fn value(&self, key: &str) -> Option<String> {
        (**self).value(key)
    }

    fn set_value(&self, key: &str, value: &str) {
        (**self).set_value(key, value)
    }

    fn remove(&self, key: &str) {
        (**self).remove(key)
    }
}
