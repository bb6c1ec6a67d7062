/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::ServerRegistry;

/// Registry living as long as the process.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    map: Mutex<BTreeMap<String, String>>,
}

impl MemoryRegistry {
    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.map.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl ServerRegistry for MemoryRegistry {
    fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    fn value(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn set_value(&self, key: &str, value: &str) {
        self.lock().insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.lock().remove(key);
    }
}
