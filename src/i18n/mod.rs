//! Localization: supported locales, dictionaries, typed keys, the stored
//! language preference and language detection.

pub mod catalog;
pub mod detect;
pub mod keys;
pub mod locale;
pub mod preference;

pub use catalog::{Catalog, Localizer};
pub use detect::{
    DetectionRequest, GeoLookup, IpGeoLookup, LanguageDetector, request_language,
};
pub use keys::MessageKey;
pub use locale::{ActiveLocale, Locale};
pub use preference::PreferenceStore;
