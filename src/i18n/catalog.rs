//! Locale dictionaries and typed lookups.

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;

use crate::error::LocaleError;

use super::keys::MessageKey;
use super::locale::Locale;

const BUILTIN_KO: &str = include_str!("../../locales/ko.json");
const BUILTIN_EN: &str = include_str!("../../locales/en.json");

/// Source of localized strings.
///
/// Only [`resolve`](Localizer::resolve) is required. The typed accessors fall
/// back to the fallback locale and finally to the key path itself, so a
/// missing translation never fails the caller.
pub trait Localizer: Send + Sync {
    /// Walk `path` (dot separated) inside the dictionary for `locale`.
    fn resolve(&self, locale: Locale, path: &str) -> Option<Value>;

    /// Locale consulted when the requested one lacks an entry.
    fn fallback_locale(&self) -> Locale {
        Locale::Ko
    }

    /// Resolve a string entry.
    fn text(&self, locale: Locale, key: MessageKey) -> String {
        let path = key.path();
        match self.lookup(locale, &path) {
            Some(Value::String(s)) => s,
            Some(other) => {
                tracing::warn!(locale = %locale, key = %path, "Translation is not a string: {other}");
                path
            }
            None => {
                tracing::warn!(locale = %locale, key = %path, "Translation key not found");
                path
            }
        }
    }

    /// Resolve an array-of-strings entry. Missing keys give an empty list.
    fn list(&self, locale: Locale, key: MessageKey) -> Vec<String> {
        let path = key.path();
        match self.lookup(locale, &path) {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
            Some(Value::String(s)) => vec![s],
            _ => {
                tracing::warn!(locale = %locale, key = %path, "Translation list not found");
                Vec::new()
            }
        }
    }

    #[doc(hidden)]
    fn lookup(&self, locale: Locale, path: &str) -> Option<Value> {
        self.resolve(locale, path).or_else(|| {
            let fallback = self.fallback_locale();
            if fallback != locale {
                self.resolve(fallback, path)
            } else {
                None
            }
        })
    }
}

/// In-memory set of locale dictionaries.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    dictionaries: HashMap<Locale, Value>,
}

impl Catalog {
    /// Empty catalog; every lookup returns `None`.
    pub fn new() -> Self {
        Self::default()
    }

    /// The Korean and English dictionaries compiled into the binary.
    pub fn builtin() -> Result<Self, LocaleError> {
        let mut catalog = Self::new();
        catalog.insert(Locale::Ko, parse_dictionary(Locale::Ko, BUILTIN_KO)?);
        catalog.insert(Locale::En, parse_dictionary(Locale::En, BUILTIN_EN)?);
        Ok(catalog)
    }

    /// Load `<dir>/<code>.json` for every supported locale.
    ///
    /// Missing files are skipped with a warning. Korean and English fall back
    /// to the built-in dictionaries when the directory does not provide them.
    pub fn load_dir(dir: &Path) -> Result<Self, LocaleError> {
        let mut catalog = Self::builtin()?;
        for locale in Locale::ALL {
            let file = dir.join(format!("{}.json", locale.code()));
            if !file.exists() {
                tracing::warn!(locale = %locale, path = %file.display(), "Locale dictionary missing, skipping");
                continue;
            }
            let raw = std::fs::read_to_string(&file)?;
            catalog.insert(locale, parse_dictionary(locale, &raw)?);
            tracing::debug!(locale = %locale, "Loaded locale dictionary");
        }
        Ok(catalog)
    }

    pub fn insert(&mut self, locale: Locale, dictionary: Value) {
        self.dictionaries.insert(locale, dictionary);
    }

    pub fn has(&self, locale: Locale) -> bool {
        self.dictionaries.contains_key(&locale)
    }

    /// Locales with a dictionary, in menu order.
    pub fn locales(&self) -> Vec<Locale> {
        Locale::ALL.into_iter().filter(|l| self.has(*l)).collect()
    }
}

impl Localizer for Catalog {
    fn resolve(&self, locale: Locale, path: &str) -> Option<Value> {
        let root = self
            .dictionaries
            .get(&locale)
            .or_else(|| self.dictionaries.get(&self.fallback_locale()))?;
        walk(root, path).cloned()
    }
}

fn walk<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(root, |node, segment| node.as_object()?.get(segment))
}

fn parse_dictionary(locale: Locale, raw: &str) -> Result<Value, LocaleError> {
    let value: Value = serde_json::from_str(raw).map_err(|e| LocaleError::InvalidDictionary {
        locale: locale.to_string(),
        reason: e.to_string(),
    })?;
    if !value.is_object() {
        return Err(LocaleError::InvalidDictionary {
            locale: locale.to_string(),
            reason: "top level must be an object".to_string(),
        });
    }
    Ok(value)
}
