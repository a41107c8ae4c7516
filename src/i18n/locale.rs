//! Supported site locales and the shared active-locale handle.

use std::str::FromStr;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::LocaleError;

/// A language the site is published in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    Ko,
    En,
    Zh,
    Vi,
    Ja,
    Th,
    Id,
}

impl Default for Locale {
    fn default() -> Self {
        Self::Ko
    }
}

impl Locale {
    /// Every supported locale, in the order the language menu lists them.
    pub const ALL: [Locale; 7] = [
        Locale::Ko,
        Locale::En,
        Locale::Zh,
        Locale::Vi,
        Locale::Ja,
        Locale::Th,
        Locale::Id,
    ];

    /// ISO 639-1 code, also the dictionary file stem.
    pub fn code(self) -> &'static str {
        match self {
            Self::Ko => "ko",
            Self::En => "en",
            Self::Zh => "zh",
            Self::Vi => "vi",
            Self::Ja => "ja",
            Self::Th => "th",
            Self::Id => "id",
        }
    }

    /// Primary region for the locale.
    pub fn region(self) -> &'static str {
        match self {
            Self::Ko => "KR",
            Self::En => "US",
            Self::Zh => "CN",
            Self::Vi => "VN",
            Self::Ja => "JP",
            Self::Th => "TH",
            Self::Id => "ID",
        }
    }

    /// Name of the language in the language itself.
    pub fn native_name(self) -> &'static str {
        match self {
            Self::Ko => "한국어",
            Self::En => "English",
            Self::Zh => "中文",
            Self::Vi => "Tiếng Việt",
            Self::Ja => "日本語",
            Self::Th => "ไทย",
            Self::Id => "Bahasa Indonesia",
        }
    }

    /// Open Graph locale tag, e.g. `ko_KR`.
    pub fn og_locale(self) -> String {
        format!("{}_{}", self.code(), self.region())
    }

    /// Short label shown when no flag icon is available.
    pub fn flag_label(self) -> String {
        self.code().to_uppercase()
    }

    /// Parse a code, returning `None` for anything unsupported.
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|l| l.code().eq_ignore_ascii_case(code.trim()))
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Locale {
    type Err = LocaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s).ok_or_else(|| LocaleError::Unsupported(s.to_string()))
    }
}

/// Shared handle to the locale currently selected by the visitor.
///
/// Cloning shares the underlying value, so a language switch made through one
/// handle is seen by every component holding a clone.
#[derive(Debug, Clone, Default)]
pub struct ActiveLocale {
    inner: Arc<RwLock<Locale>>,
}

impl ActiveLocale {
    pub fn new(locale: Locale) -> Self {
        Self {
            inner: Arc::new(RwLock::new(locale)),
        }
    }

    pub fn get(&self) -> Locale {
        match self.inner.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub fn set(&self, locale: Locale) {
        match self.inner.write() {
            Ok(mut guard) => *guard = locale,
            Err(poisoned) => *poisoned.into_inner() = locale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_roundtrip_through_from_code() {
        for locale in Locale::ALL {
            assert_eq!(Locale::from_code(locale.code()), Some(locale));
        }
    }

    #[test]
    fn from_code_is_case_insensitive_and_trims() {
        assert_eq!(Locale::from_code(" EN "), Some(Locale::En));
        assert_eq!(Locale::from_code("fr"), None);
    }

    #[test]
    fn parse_unsupported_is_error() {
        let err = "de".parse::<Locale>().unwrap_err();
        assert!(matches!(err, LocaleError::Unsupported(code) if code == "de"));
    }

    #[test]
    fn og_locale_joins_code_and_region() {
        assert_eq!(Locale::Ko.og_locale(), "ko_KR");
        assert_eq!(Locale::Id.og_locale(), "id_ID");
    }

    #[test]
    fn display_matches_serde() {
        for locale in Locale::ALL {
            let json = serde_json::to_string(&locale).unwrap();
            assert_eq!(format!("\"{locale}\""), json);
        }
    }

    #[test]
    fn active_locale_clones_share_state() {
        let a = ActiveLocale::new(Locale::Ko);
        let b = a.clone();
        b.set(Locale::Ja);
        assert_eq!(a.get(), Locale::Ja);
    }
}
