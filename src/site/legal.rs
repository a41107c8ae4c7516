//! Privacy-policy and terms-of-service links per locale.

use serde::Serialize;

use crate::i18n::Locale;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LegalLinks {
    pub privacy: &'static str,
    pub terms: &'static str,
}

/// Locales without translated documents get the Korean ones.
pub fn legal_links(locale: Locale) -> LegalLinks {
    match locale {
        Locale::Ko => LegalLinks {
            privacy: "/privacy-policy.html",
            terms: "/terms-of-service.html",
        },
        Locale::En => LegalLinks {
            privacy: "/privacy-policy-en.html",
            terms: "/terms-of-service-en.html",
        },
        Locale::Zh => LegalLinks {
            privacy: "/privacy-policy-zh.html",
            terms: "/terms-of-service-zh.html",
        },
        Locale::Vi => LegalLinks {
            privacy: "/privacy-policy-vi.html",
            terms: "/terms-of-service-vi.html",
        },
        Locale::Ja => LegalLinks {
            privacy: "/privacy-policy-ja.html",
            terms: "/terms-of-service-ja.html",
        },
        Locale::Th => LegalLinks {
            privacy: "/privacy-policy-th.html",
            terms: "/terms-of-service-th.html",
        },
        Locale::Id => LegalLinks {
            privacy: "/privacy-policy-id.html",
            terms: "/terms-of-service-id.html",
        },
    }
}

/// Links for a raw language code; unknown codes fall back to Korean.
pub fn legal_links_for_code(code: &str) -> LegalLinks {
    legal_links(Locale::from_code(code).unwrap_or(Locale::Ko))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn korean_documents_have_no_suffix() {
        assert_eq!(legal_links(Locale::Ko).privacy, "/privacy-policy.html");
        assert_eq!(legal_links(Locale::Vi).terms, "/terms-of-service-vi.html");
    }

    #[test]
    fn unknown_code_falls_back_to_korean() {
        assert_eq!(legal_links_for_code("de"), legal_links(Locale::Ko));
        assert_eq!(legal_links_for_code("EN"), legal_links(Locale::En));
    }
}
