/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use log::warn;
use serde_json::{Map, Value};

use super::{RegistryError, ServerRegistry};

const DEFAULT_ORGANIZATION: &str = "QtProject";
const DEFAULT_APPLICATION: &str = "Qt";

/// Where the per-user registry file lives.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RegistryScope {
    organization: String,
    application: String,
    path: Option<PathBuf>,
}

impl Default for RegistryScope {
    fn default() -> Self {
        RegistryScope {
            organization: DEFAULT_ORGANIZATION.to_string(),
            application: DEFAULT_APPLICATION.to_string(),
            path: None,
        }
    }
}

impl RegistryScope {
    pub fn set_organization(&mut self, organization: String) {
        self.organization = organization;
    }

    pub fn set_application(&mut self, application: String) {
        self.application = application;
    }

    /// Use a fixed file instead of the per-user default location.
    pub fn set_path(&mut self, path: PathBuf) {
        self.path = Some(path);
    }

    #[inline]
    pub fn organization(&self) -> &str {
        &self.organization
    }

    #[inline]
    pub fn application(&self) -> &str {
        &self.application
    }

    pub fn file_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.path {
            return Some(path.clone());
        }
        let dir = user_config_dir()?;
        Some(
            dir.join(&self.organization)
                .join(format!("{}.json", self.application)),
        )
    }
}

#[cfg(not(windows))]
fn user_config_dir() -> Option<PathBuf> {
    if let Some(dir) = env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(dir));
    }
    env::var_os("HOME")
        .filter(|v| !v.is_empty())
        .map(|home| PathBuf::from(home).join(".config"))
}

#[cfg(windows)]
fn user_config_dir() -> Option<PathBuf> {
    env::var_os("APPDATA")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Registry persisted as a flat json object.
///
/// Every operation re-reads the file so that separate processes observe
/// each other's entries. Storage errors are logged and otherwise ignored.
#[derive(Debug)]
pub struct FileRegistry {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileRegistry {
    pub fn new(path: PathBuf) -> Self {
        FileRegistry {
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn with_scope(scope: &RegistryScope) -> Result<Self, RegistryError> {
        let path = scope.file_path().ok_or(RegistryError::NoConfigDir)?;
        Ok(FileRegistry::new(path))
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Map<String, Value>, RegistryError> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(Map::new());
        }
        match serde_json::from_slice(&data)? {
            Value::Object(map) => Ok(map),
            _ => Err(RegistryError::InvalidFormat),
        }
    }

    fn store(&self, map: Map<String, Value>) -> Result<(), RegistryError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let content = serde_json::to_vec_pretty(&Value::Object(map))?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn update<F>(&self, key: &str, f: F)
    where
        F: FnOnce(&mut Map<String, Value>) -> bool,
    {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut map = match self.load() {
            Ok(map) => map,
            Err(e) => {
                warn!(
                    "failed to load registry {} for update of {key}: {e}",
                    self.path.display()
                );
                return;
            }
        };
        if f(&mut map)
            && let Err(e) = self.store(map)
        {
            warn!(
                "failed to store registry {} for update of {key}: {e}",
                self.path.display()
            );
        }
    }
}

fn value_to_string(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        v => v.to_string(),
    }
}

impl ServerRegistry for FileRegistry {
    fn value(&self, key: &str) -> Option<String> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        match self.load() {
            Ok(map) => map.get(key).map(value_to_string),
            Err(e) => {
                warn!("failed to load registry {}: {e}", self.path.display());
                None
            }
        }
    }

    fn set_value(&self, key: &str, value: &str) {
        self.update(key, |map| {
            map.insert(key.to_string(), Value::String(value.to_string()));
            true
        })
    }

    fn remove(&self, key: &str) {
        self.update(key, |map| map.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path() -> PathBuf {
        env::temp_dir()
            .join(format!("netaccess-registry-{}", fastrand::u64(..)))
            .join("registry.json")
    }

    #[test]
    fn scope_path() {
        let mut scope = RegistryScope::default();
        assert_eq!(scope.organization(), "QtProject");
        assert_eq!(scope.application(), "Qt");
        scope.set_path(PathBuf::from("/tmp/r.json"));
        assert_eq!(scope.file_path().unwrap(), PathBuf::from("/tmp/r.json"));
    }

    #[test]
    fn persisted() {
        let path = temp_path();
        let registry = FileRegistry::new(path.clone());
        assert!(!registry.contains("QLocalServer/a"));

        registry.set_value("QLocalServer/a", "40000");
        registry.set_value("QLocalServer/", "");
        let other = FileRegistry::new(path.clone());
        assert_eq!(other.value("QLocalServer/a").unwrap(), "40000");
        assert!(other.contains("QLocalServer/"));

        other.remove("QLocalServer/a");
        assert!(!registry.contains("QLocalServer/a"));
        registry.remove("QLocalServer/a");

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn corrupt_file_untouched() {
        let path = temp_path();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"[1, 2]").unwrap();

        let registry = FileRegistry::new(path.clone());
        assert!(registry.value("k").is_none());
        registry.set_value("k", "1");
        assert_eq!(fs::read(&path).unwrap(), b"[1, 2]");

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
