use std::time::Duration;

use nr_core::{Error, Result};
use reqwest::Client;
use tracing::info;
use url::Url;

use crate::extractors::{html::extract_html, ExtractedArticle};

const USER_AGENT: &str = concat!("newsroom/", env!("CARGO_PKG_VERSION"));

/// Only http and https URLs can be imported.
pub fn parse_source_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(Error::validation(format!("unsupported URL scheme: {}", other))),
    }
}

/// Downloads web pages and turns them into articles.
#[derive(Debug, Clone)]
pub struct UrlImporter {
    client: Client,
}

impl UrlImporter {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    pub async fn import(&self, raw_url: &str) -> Result<ExtractedArticle> {
        let url = parse_source_url(raw_url)?;
        info!("🌐 Importing article from {}", url);

        let html = self
            .client
            .get(url.clone())
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let mut article = extract_html(&html);
        if article.content.trim().is_empty() {
            return Err(Error::Ingest(format!("no article text found at {}", url)));
        }
        if article.title.is_empty() {
            article.title = url.host_str().unwrap_or("Imported article").to_string();
        }
        article.source_url = Some(url.to_string());
        Ok(article)
    }
}

impl Default for UrlImporter {
    fn default() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_source_url() {
        assert!(parse_source_url("https://example.com/story").is_ok());
        assert!(parse_source_url(" http://example.com ").is_ok());
        assert!(matches!(parse_source_url("ftp://example.com"), Err(Error::Validation(_))));
        assert!(matches!(parse_source_url("not a url"), Err(Error::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_import_unreachable_host_fails() {
        let importer = UrlImporter::new(Duration::from_secs(2)).unwrap();
        assert!(importer.import("http://127.0.0.1:9/story").await.is_err());
    }
}
