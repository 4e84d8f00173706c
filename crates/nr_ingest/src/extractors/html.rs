use nr_core::text::normalize_whitespace;
use nr_core::Result;
use scraper::{Html, Selector};

use super::{extension, file_stem, ExtractedArticle, Extractor};
use crate::jsonld;

fn select_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .find(|text| !text.is_empty())
}

fn meta_content(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .filter_map(|el| el.value().attr("content"))
        .map(|content| content.trim().to_string())
        .find(|content| !content.is_empty())
}

fn paragraphs(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    let text = document
        .select(&selector)
        .map(|el| el.text().collect::<String>().split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    (!text.is_empty()).then_some(text)
}

/// Pulls the article out of an HTML page. JSON-LD metadata wins, then
/// OpenGraph and the usual `<article>` markup.
pub fn extract_html(html: &str) -> ExtractedArticle {
    let document = Html::parse_document(html);
    let ld = jsonld::extract_article(&document).unwrap_or_default();

    let title = ld
        .headline
        .or_else(|| meta_content(&document, "meta[property='og:title']"))
        .or_else(|| select_text(&document, "h1"))
        .or_else(|| select_text(&document, "title"))
        .unwrap_or_default();

    let content = ld
        .body
        .or_else(|| paragraphs(&document, "article p"))
        .or_else(|| paragraphs(&document, "p"))
        .unwrap_or_default();

    let authors = if ld.authors.is_empty() {
        meta_content(&document, "meta[name='author']")
            .map(|author| vec![author])
            .unwrap_or_default()
    } else {
        ld.authors
    };

    let summary = ld
        .description
        .or_else(|| meta_content(&document, "meta[name='description']"))
        .or_else(|| meta_content(&document, "meta[property='og:description']"));

    ExtractedArticle {
        title,
        content: normalize_whitespace(&content),
        summary,
        authors,
        source_url: meta_content(&document, "meta[property='og:url']"),
    }
}

pub struct HtmlExtractor;

impl Extractor for HtmlExtractor {
    fn name(&self) -> &str {
        "html"
    }

    fn can_handle(&self, file_name: &str, content_type: Option<&str>) -> bool {
        matches!(extension(file_name).as_deref(), Some("html") | Some("htm"))
            || content_type.map_or(false, |ct| ct.starts_with("text/html"))
    }

    fn extract(&self, file_name: &str, text: &str) -> Result<ExtractedArticle> {
        let mut article = extract_html(text);
        if article.title.is_empty() {
            article.title = file_stem(file_name);
        }
        Ok(article)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefers_article_paragraphs() {
        let html = r#"<html><head><title>Site | Page</title>
            <meta name="author" content="Kim Park">
            <meta name="description" content="Council votes on the budget.">
            </head><body>
            <nav><p>Menu</p></nav>
            <h1>Council passes budget</h1>
            <article><p>The council   voted 7-2.</p><p>Spending rises.</p></article>
            </body></html>"#;
        let article = extract_html(html);
        assert_eq!(article.title, "Council passes budget");
        assert_eq!(article.content, "The council voted 7-2.\n\nSpending rises.");
        assert_eq!(article.authors, vec!["Kim Park"]);
        assert_eq!(article.summary.as_deref(), Some("Council votes on the budget."));
    }

    #[test]
    fn test_jsonld_and_opengraph() {
        let html = r#"<html><head>
            <meta property="og:title" content="OG title">
            <meta property="og:url" content="https://news.example.com/a">
            <script type="application/ld+json">{"@type": "NewsArticle", "articleBody": "Body from metadata."}</script>
            </head><body><p>Ignored paragraph.</p></body></html>"#;
        let article = extract_html(html);
        assert_eq!(article.title, "OG title");
        assert_eq!(article.content, "Body from metadata.");
        assert_eq!(article.source_url.as_deref(), Some("https://news.example.com/a"));
    }

    #[test]
    fn test_falls_back_to_title_tag_and_file_name() {
        let article = extract_html("<title>Only title</title><p>Some text.</p>");
        assert_eq!(article.title, "Only title");
        assert_eq!(article.content, "Some text.");

        let untitled = HtmlExtractor.extract("flood-report.html", "<p>Water rising.</p>").unwrap();
        assert_eq!(untitled.title, "flood report");
    }
}
