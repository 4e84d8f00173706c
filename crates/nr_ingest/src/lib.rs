//! Turns uploaded files and web pages into article text.

pub mod extractors;
pub mod fetch;
pub mod jsonld;

pub use extractors::{extract_file, get_extractor_factories, ExtractedArticle, Extractor};
pub use extractors::html::extract_html;
pub use fetch::{parse_source_url, UrlImporter};

pub mod prelude {
    pub use super::extractors::{ExtractedArticle, Extractor};
    pub use super::fetch::UrlImporter;
    pub use nr_core::{Error, Result};
}
