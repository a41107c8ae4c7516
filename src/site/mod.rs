//! Page metadata served alongside the consultation: SEO head tags and
//! legal document links.

pub mod legal;
pub mod seo;

pub use legal::{LegalLinks, legal_links};
pub use seo::MetaTags;
