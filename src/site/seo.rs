//! Per-locale SEO head tags: basic meta, Open Graph, Twitter card, hreflang
//! alternates, canonical URL and the Organization JSON-LD block.

use serde::Serialize;
use serde_json::{Value, json};

use crate::i18n::keys::MetaField;
use crate::i18n::{Locale, Localizer, MessageKey};

pub const DEFAULT_BASE_URL: &str = "https://kangwoon.kr";
const SITE_NAME: &str = "KANGWOON";
const DEFAULT_OG_IMAGE: &str = "/images/og-default.jpg";
const TWITTER_SITE: &str = "@KANGWOON_official";

/// One `<meta>` element; `attribute` is `name` or `property`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetaTag {
    pub attribute: &'static str,
    pub key: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alternate {
    pub hreflang: String,
    pub href: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetaTags {
    pub lang: Locale,
    pub title: String,
    pub meta: Vec<MetaTag>,
    pub alternates: Vec<Alternate>,
    pub canonical: String,
    pub structured_data: Value,
}

impl MetaTags {
    /// Build the head tags for `page` (e.g. `""`, `"index"`, `"about.html"`).
    pub fn build(localizer: &dyn Localizer, locale: Locale, page: &str, base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        let page = normalize_page(page);
        let field = |f| meta_field(localizer, locale, f);

        let title = field(MetaField::Title).unwrap_or_else(|| SITE_NAME.to_string());
        let description = field(MetaField::Description);
        let keywords = field(MetaField::Keywords);
        let og_title = field(MetaField::OgTitle).unwrap_or_else(|| title.clone());
        let og_description = field(MetaField::OgDescription).or_else(|| description.clone());
        let og_image = field(MetaField::OgImage).unwrap_or_else(|| DEFAULT_OG_IMAGE.to_string());
        let url = format!("{base}{}", language_path(locale, &page));

        let mut meta = Vec::new();
        let mut push = |attribute: &'static str, key: &str, content: Option<String>| {
            if let Some(content) = content.filter(|c| !c.is_empty()) {
                meta.push(MetaTag {
                    attribute,
                    key: key.to_string(),
                    content,
                });
            }
        };

        push("name", "description", description.clone());
        push("name", "keywords", keywords.clone());
        push("name", "robots", field(MetaField::Robots));
        push("name", "author", field(MetaField::Author));

        push("property", "og:title", Some(og_title.clone()));
        push("property", "og:description", og_description.clone());
        push("property", "og:image", Some(og_image.clone()));
        push("property", "og:url", Some(url.clone()));
        push("property", "og:type", Some("website".to_string()));
        push("property", "og:site_name", Some(SITE_NAME.to_string()));
        push("property", "og:locale", Some(locale.og_locale()));

        push("name", "twitter:card", Some("summary_large_image".to_string()));
        push(
            "name",
            "twitter:title",
            field(MetaField::TwitterTitle).or(Some(og_title)),
        );
        push(
            "name",
            "twitter:description",
            field(MetaField::TwitterDescription).or(og_description),
        );
        push("name", "twitter:image", Some(og_image));
        push("name", "twitter:site", Some(TWITTER_SITE.to_string()));

        let mut alternates: Vec<Alternate> = Locale::ALL
            .into_iter()
            .map(|l| Alternate {
                hreflang: l.code().to_string(),
                href: format!("{base}{}", language_path(l, &page)),
            })
            .collect();
        alternates.push(Alternate {
            hreflang: "x-default".to_string(),
            href: format!("{base}/"),
        });

        Self {
            lang: locale,
            title,
            meta,
            alternates,
            canonical: url,
            structured_data: organization(base, description, keywords),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.meta
            .iter()
            .find(|m| m.key == key)
            .map(|m| m.content.as_str())
    }

    /// Render the tags as HTML for a document `<head>`.
    pub fn render_html(&self) -> String {
        let mut out = format!("<title>{}</title>\n", escape(&self.title));
        for tag in &self.meta {
            out.push_str(&format!(
                "<meta {}=\"{}\" content=\"{}\">\n",
                tag.attribute,
                escape(&tag.key),
                escape(&tag.content)
            ));
        }
        for alt in &self.alternates {
            out.push_str(&format!(
                "<link rel=\"alternate\" hreflang=\"{}\" href=\"{}\">\n",
                escape(&alt.hreflang),
                escape(&alt.href)
            ));
        }
        out.push_str(&format!(
            "<link rel=\"canonical\" href=\"{}\">\n",
            escape(&self.canonical)
        ));
        let json = serde_json::to_string_pretty(&self.structured_data)
            .unwrap_or_default()
            .replace("</", "<\\/");
        out.push_str(&format!(
            "<script type=\"application/ld+json\">\n{json}\n</script>\n"
        ));
        out
    }
}

/// Meta entry for `locale`, then the fallback locale. No path placeholder.
fn meta_field(localizer: &dyn Localizer, locale: Locale, field: MetaField) -> Option<String> {
    let path = MessageKey::Meta(field).path();
    [locale, localizer.fallback_locale()]
        .into_iter()
        .find_map(|l| match localizer.resolve(l, &path) {
            Some(Value::String(s)) if !s.is_empty() => Some(s),
            _ => None,
        })
}

fn normalize_page(page: &str) -> String {
    let page = page.trim().trim_matches('/');
    let page = page.strip_suffix(".html").unwrap_or(page);
    if page == "index" {
        String::new()
    } else {
        page.to_string()
    }
}

/// `/` for Korean, `/{lang}` or `/{lang}/{page}` otherwise.
pub fn language_path(locale: Locale, page: &str) -> String {
    if locale == Locale::Ko {
        return "/".to_string();
    }
    let page = normalize_page(page);
    if page.is_empty() {
        format!("/{}", locale.code())
    } else {
        format!("/{}/{page}", locale.code())
    }
}

fn organization(base: &str, description: Option<String>, keywords: Option<String>) -> Value {
    let languages: Vec<&str> = Locale::ALL.iter().map(|l| l.code()).collect();
    json!({
        "@context": "https://schema.org",
        "@type": "Organization",
        "name": SITE_NAME,
        "alternateName": "강운",
        "url": base,
        "logo": format!("{base}/images/logo.png"),
        "description": description,
        "contactPoint": {
            "@type": "ContactPoint",
            "telephone": "+82-10-4063-9062",
            "contactType": "customer service",
            "email": "kangwooncp@gmail.com",
            "availableLanguage": languages,
        },
        "address": {
            "@type": "PostalAddress",
            "addressCountry": "KR",
            "addressLocality": "Seoul",
            "addressRegion": "Gangnam-gu",
        },
        "foundingDate": "2024",
        "industry": "Artificial Intelligence",
        "keywords": keywords,
    })
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
