//! Picks the visitor's language.
//!
//! [`LanguageDetector`] serves the local terminal: explicit request
//! parameter, stored preference, IP geolocation, `Accept-Language`, then the
//! default locale. Remote HTTP visitors only go through
//! [`request_language`], since the preference file and the host's location
//! belong to the machine, not to them.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::locale::Locale;
use super::preference::{PreferenceStore, keys};

const GEO_CACHE_TTL_MS: i64 = 24 * 60 * 60 * 1000;
const GEO_TIMEOUT: Duration = Duration::from_secs(5);

/// Resolves the caller's country as an ISO 3166 alpha-2 code.
#[async_trait]
pub trait GeoLookup: Send + Sync {
    async fn country_code(&self) -> Option<String>;
}

struct GeoService {
    name: &'static str,
    url: &'static str,
    field: &'static str,
}

const GEO_SERVICES: [GeoService; 3] = [
    GeoService {
        name: "ipapi.co",
        url: "https://ipapi.co/json/",
        field: "country_code",
    },
    GeoService {
        name: "ip-api.com",
        url: "https://ip-api.com/json/",
        field: "countryCode",
    },
    GeoService {
        name: "ipwhois.app",
        url: "https://ipwhois.app/json/",
        field: "country_code",
    },
];

/// Public IP geolocation services, tried in order. First valid answer wins.
pub struct IpGeoLookup {
    client: reqwest::Client,
}

impl IpGeoLookup {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    async fn query(&self, service: &GeoService) -> Option<String> {
        let response = self
            .client
            .get(service.url)
            .header("Accept", "application/json")
            .timeout(GEO_TIMEOUT)
            .send()
            .await
            .map_err(|e| tracing::debug!(service = service.name, "Geo lookup failed: {e}"))
            .ok()?;

        if !response.status().is_success() {
            tracing::debug!(service = service.name, status = %response.status(), "Geo lookup rejected");
            return None;
        }

        let body: serde_json::Value = response.json().await.ok()?;
        body.get(service.field)
            .and_then(|v| v.as_str())
            .filter(|code| !code.is_empty())
            .map(str::to_uppercase)
    }
}

impl Default for IpGeoLookup {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GeoLookup for IpGeoLookup {
    async fn country_code(&self) -> Option<String> {
        for service in &GEO_SERVICES {
            if let Some(code) = self.query(service).await {
                tracing::debug!(service = service.name, country = %code, "Geo lookup succeeded");
                return Some(code);
            }
        }
        tracing::warn!("All geolocation services failed");
        None
    }
}

/// Language for a country. Unlisted countries get English.
pub fn language_for_country(country: &str) -> Locale {
    match country.to_ascii_uppercase().as_str() {
        "KR" => Locale::Ko,
        "CN" => Locale::Zh,
        "VN" => Locale::Vi,
        "JP" => Locale::Ja,
        "TH" => Locale::Th,
        "ID" => Locale::Id,
        _ => Locale::En,
    }
}

/// First supported language in an `Accept-Language` header.
///
/// Tags are taken in listed order; quality weights are ignored.
pub fn language_from_accept(header: &str) -> Option<Locale> {
    header
        .split(',')
        .map(|part| part.split(';').next().unwrap_or("").trim())
        .filter(|tag| !tag.is_empty())
        .find_map(|tag| {
            Locale::from_code(tag).or_else(|| {
                let primary = tag.split('-').next().unwrap_or(tag);
                Locale::from_code(primary)
            })
        })
}

#[derive(Debug, Serialize, Deserialize)]
struct GeoCacheEntry {
    country: String,
    language: Locale,
    timestamp: i64,
}

/// Language carried by the request itself: explicit parameter, then
/// `Accept-Language`.
pub fn request_language(request: DetectionRequest<'_>) -> Option<Locale> {
    request
        .explicit
        .and_then(Locale::from_code)
        .or_else(|| request.accept_language.and_then(language_from_accept))
}

/// Inputs available for one detection.
#[derive(Debug, Default, Clone, Copy)]
pub struct DetectionRequest<'a> {
    /// `?lang=` style override.
    pub explicit: Option<&'a str>,
    /// Raw `Accept-Language` header.
    pub accept_language: Option<&'a str>,
}

pub struct LanguageDetector {
    store: Arc<PreferenceStore>,
    geo: Option<Arc<dyn GeoLookup>>,
    default_locale: Locale,
}

impl LanguageDetector {
    pub fn new(store: Arc<PreferenceStore>, default_locale: Locale) -> Self {
        Self {
            store,
            geo: None,
            default_locale,
        }
    }

    pub fn with_geo(mut self, geo: Arc<dyn GeoLookup>) -> Self {
        self.geo = Some(geo);
        self
    }

    pub async fn detect(&self, request: DetectionRequest<'_>) -> Locale {
        self.detect_at(request, Utc::now()).await
    }

    pub async fn detect_at(&self, request: DetectionRequest<'_>, now: DateTime<Utc>) -> Locale {
        if let Some(locale) = request.explicit.and_then(Locale::from_code) {
            tracing::debug!(%locale, "Language from request parameter");
            return locale;
        }
        if let Some(locale) = self.store.load_locale() {
            tracing::debug!(%locale, "Language from stored preference");
            return locale;
        }
        if let Some(locale) = self.geo_language(now).await {
            tracing::debug!(%locale, "Language from geolocation");
            return locale;
        }
        if let Some(locale) = request.accept_language.and_then(language_from_accept) {
            tracing::debug!(%locale, "Language from Accept-Language");
            return locale;
        }
        self.default_locale
    }

    async fn geo_language(&self, now: DateTime<Utc>) -> Option<Locale> {
        let geo = self.geo.as_ref()?;

        if let Some(entry) = self.cached_geo(now) {
            return Some(entry.language);
        }

        let country = geo.country_code().await?;
        let language = language_for_country(&country);
        let entry = GeoCacheEntry {
            country,
            language,
            timestamp: now.timestamp_millis(),
        };
        match serde_json::to_string(&entry) {
            Ok(json) => {
                if let Err(e) = self.store.set(keys::GEO_CACHE, &json) {
                    tracing::warn!("Failed to cache geolocation: {e}");
                }
            }
            Err(e) => tracing::warn!("Failed to encode geolocation cache: {e}"),
        }
        Some(language)
    }

    fn cached_geo(&self, now: DateTime<Utc>) -> Option<GeoCacheEntry> {
        let raw = self.store.get(keys::GEO_CACHE)?;
        let entry: GeoCacheEntry = serde_json::from_str(&raw).ok()?;
        if now.timestamp_millis() - entry.timestamp > GEO_CACHE_TTL_MS {
            if let Err(e) = self.store.remove(keys::GEO_CACHE) {
                tracing::warn!("Failed to drop expired geolocation cache: {e}");
            }
            return None;
        }
        Some(entry)
    }
}
