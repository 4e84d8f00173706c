use nr_core::{Error, Result};

pub mod html;
pub mod text;

pub use html::HtmlExtractor;
pub use text::{MarkdownExtractor, PlainTextExtractor};

/// What an extractor recovers from a document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedArticle {
    pub title: String,
    pub content: String,
    pub summary: Option<String>,
    pub authors: Vec<String>,
    pub source_url: Option<String>,
}

pub trait Extractor: Send + Sync {
    /// Returns the name of the document format
    fn name(&self) -> &str;

    /// Returns true if this extractor understands the file
    fn can_handle(&self, file_name: &str, content_type: Option<&str>) -> bool;

    fn extract(&self, file_name: &str, text: &str) -> Result<ExtractedArticle>;
}

pub type ExtractorFactory = fn() -> Box<dyn Extractor>;

pub fn get_extractor_factories() -> Vec<ExtractorFactory> {
    vec![
        || Box::new(HtmlExtractor),
        || Box::new(MarkdownExtractor),
        || Box::new(PlainTextExtractor),
    ]
}

pub(crate) fn extension(file_name: &str) -> Option<String> {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

pub(crate) fn file_stem(file_name: &str) -> String {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    let stem = base.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(base);
    stem.replace(['_', '-'], " ").trim().to_string()
}

/// Picks the extractor for an uploaded file and runs it.
pub fn extract_file(file_name: &str, content_type: Option<&str>, bytes: &[u8]) -> Result<ExtractedArticle> {
    let extractor = get_extractor_factories()
        .into_iter()
        .map(|factory| factory())
        .find(|e| e.can_handle(file_name, content_type))
        .ok_or_else(|| {
            Error::validation(format!(
                "unsupported file type for {}: expected .txt, .md or .html",
                file_name
            ))
        })?;

    let text = std::str::from_utf8(bytes)
        .map_err(|_| Error::Ingest(format!("{} is not valid UTF-8 text", file_name)))?;
    tracing::debug!("Extracting {} with the {} extractor", file_name, extractor.name());

    let article = extractor.extract(file_name, text)?;
    if article.content.trim().is_empty() {
        return Err(Error::Ingest(format!("no article text found in {}", file_name)));
    }
    Ok(article)
}
