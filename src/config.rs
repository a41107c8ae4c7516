//! Configuration types.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::consult::engine::DEFAULT_RECOMMENDATION_TIMEOUT;
use crate::error::ConfigError;
use crate::handoff::DEFAULT_CONTACT_URL;
use crate::i18n::Locale;
use crate::site::seo::DEFAULT_BASE_URL;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory of `<lang>.json` dictionaries; built-in ones when unset.
    pub locales_dir: Option<PathBuf>,
    pub default_locale: Locale,
    /// Key-value file holding the language preference and geo cache.
    pub state_path: PathBuf,
    /// HTTP surface is disabled when unset.
    pub http_port: Option<u16>,
    pub recommendation_timeout: Duration,
    pub contact_url: String,
    pub site_base_url: String,
    pub geo_lookup: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            locales_dir: None,
            default_locale: Locale::Ko,
            state_path: PathBuf::from("./data/preferences.json"),
            http_port: None,
            recommendation_timeout: DEFAULT_RECOMMENDATION_TIMEOUT,
            contact_url: DEFAULT_CONTACT_URL.to_string(),
            site_base_url: DEFAULT_BASE_URL.to_string(),
            geo_lookup: false,
        }
    }
}

impl AppConfig {
    /// Build config from `CONSULT_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary variable source.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let default_locale = match get("CONSULT_DEFAULT_LANG") {
            Some(code) => Locale::from_code(&code).ok_or_else(|| ConfigError::InvalidValue {
                key: "CONSULT_DEFAULT_LANG".into(),
                message: format!("unsupported language '{code}'"),
            })?,
            None => defaults.default_locale,
        };

        let recommendation_timeout = parse(&get, "CONSULT_RECOMMENDATION_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.recommendation_timeout);

        Ok(Self {
            locales_dir: get("CONSULT_LOCALES_DIR").map(PathBuf::from),
            default_locale,
            state_path: get("CONSULT_STATE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.state_path),
            http_port: parse(&get, "CONSULT_HTTP_PORT")?,
            recommendation_timeout,
            contact_url: get("CONSULT_CONTACT_URL").unwrap_or(defaults.contact_url),
            site_base_url: get("CONSULT_SITE_BASE_URL").unwrap_or(defaults.site_base_url),
            geo_lookup: parse(&get, "CONSULT_GEO_LOOKUP")?.unwrap_or(defaults.geo_lookup),
        })
    }
}

fn parse<T>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn defaults_when_nothing_set() {
        let config = from(&[]).unwrap();
        assert_eq!(config.default_locale, Locale::Ko);
        assert_eq!(config.http_port, None);
        assert_eq!(config.recommendation_timeout, Duration::from_secs(30));
        assert_eq!(config.contact_url, "http://pf.kakao.com/_Mxmxakn");
        assert!(!config.geo_lookup);
    }

    #[test]
    fn reads_overrides() {
        let config = from(&[
            ("CONSULT_DEFAULT_LANG", "en"),
            ("CONSULT_HTTP_PORT", "8080"),
            ("CONSULT_RECOMMENDATION_TIMEOUT_SECS", "5"),
            ("CONSULT_GEO_LOOKUP", "true"),
        ])
        .unwrap();
        assert_eq!(config.default_locale, Locale::En);
        assert_eq!(config.http_port, Some(8080));
        assert_eq!(config.recommendation_timeout, Duration::from_secs(5));
        assert!(config.geo_lookup);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            from(&[("CONSULT_HTTP_PORT", "web")]),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            from(&[("CONSULT_DEFAULT_LANG", "de")]),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
