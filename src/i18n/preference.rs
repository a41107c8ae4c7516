//! Key-value preference file.
//!
//! Holds the visitor's language choice (and the geolocation cache) in a
//! single flat JSON object. There is no schema versioning.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::LocaleError;

use super::locale::Locale;

/// Well-known keys.
pub mod keys {
    pub const LANGUAGE: &str = "kangwoon:lang";
    pub const GEO_CACHE: &str = "kangwoon:geo_cache";
}

/// JSON-file backed string map. Every write is flushed immediately.
#[derive(Debug)]
pub struct PreferenceStore {
    path: Option<PathBuf>,
    values: Mutex<BTreeMap<String, String>>,
}

impl PreferenceStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LocaleError> {
        let path = path.into();
        let values = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&raw).map_err(|e| LocaleError::Store(e.to_string()))?
            }
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path: Some(path),
            values: Mutex::new(values),
        })
    }

    /// Store that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            values: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), LocaleError> {
        let mut values = self.lock();
        values.insert(key.to_string(), value.to_string());
        self.flush(&values)
    }

    pub fn remove(&self, key: &str) -> Result<(), LocaleError> {
        let mut values = self.lock();
        if values.remove(key).is_some() {
            self.flush(&values)?;
        }
        Ok(())
    }

    /// Stored language, ignoring values that are not a supported locale.
    pub fn load_locale(&self) -> Option<Locale> {
        let raw = self.get(keys::LANGUAGE)?;
        let locale = Locale::from_code(&raw);
        if locale.is_none() {
            tracing::warn!(value = %raw, "Ignoring unsupported stored language");
        }
        locale
    }

    pub fn save_locale(&self, locale: Locale) -> Result<(), LocaleError> {
        self.set(keys::LANGUAGE, locale.code())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        match self.values.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn flush(&self, values: &BTreeMap<String, String>) -> Result<(), LocaleError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let json =
            serde_json::to_string_pretty(values).map_err(|e| LocaleError::Store(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferenceStore::open(dir.path().join("prefs.json")).unwrap();
        assert_eq!(store.get(keys::LANGUAGE), None);
        assert_eq!(store.load_locale(), None);
    }

    #[test]
    fn locale_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/data/prefs.json");

        let store = PreferenceStore::open(&path).unwrap();
        store.save_locale(Locale::Vi).unwrap();
        drop(store);

        let reopened = PreferenceStore::open(&path).unwrap();
        assert_eq!(reopened.load_locale(), Some(Locale::Vi));
        assert_eq!(reopened.get(keys::LANGUAGE).as_deref(), Some("vi"));
    }

    #[test]
    fn unsupported_value_is_ignored() {
        let store = PreferenceStore::in_memory();
        store.set(keys::LANGUAGE, "klingon").unwrap();
        assert_eq!(store.load_locale(), None);
    }

    #[test]
    fn remove_deletes_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        let store = PreferenceStore::open(&path).unwrap();
        store.set("a", "1").unwrap();
        store.remove("a").unwrap();
        assert_eq!(store.get("a"), None);
        assert_eq!(PreferenceStore::open(&path).unwrap().get("a"), None);
    }

    #[test]
    fn corrupt_file_is_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, "[1, 2").unwrap();
        assert!(matches!(
            PreferenceStore::open(&path),
            Err(LocaleError::Store(_))
        ));
    }
}
