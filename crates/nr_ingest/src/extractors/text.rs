use nr_core::text::normalize_whitespace;
use nr_core::Result;

use super::{extension, file_stem, ExtractedArticle, Extractor};

/// Splits off the first non-empty line as the title when the text has more
/// than one paragraph; otherwise the file name becomes the title.
fn split_title(file_name: &str, text: &str, strip: fn(&str) -> String) -> (String, String) {
    let trimmed = text.trim();
    let mut lines = trimmed.lines();
    let first = lines.next().unwrap_or_default();
    let rest = lines.collect::<Vec<_>>().join("\n");

    if rest.trim().is_empty() || first.chars().count() > 200 {
        (file_stem(file_name), trimmed.to_string())
    } else {
        (strip(first).trim().to_string(), rest.trim().to_string())
    }
}

pub struct PlainTextExtractor;

impl Extractor for PlainTextExtractor {
    fn name(&self) -> &str {
        "text"
    }

    fn can_handle(&self, file_name: &str, content_type: Option<&str>) -> bool {
        matches!(extension(file_name).as_deref(), Some("txt") | Some("text"))
            || content_type.map_or(false, |ct| ct.starts_with("text/plain"))
    }

    fn extract(&self, file_name: &str, text: &str) -> Result<ExtractedArticle> {
        let (title, content) = split_title(file_name, text, str::to_string);
        Ok(ExtractedArticle {
            title,
            content: normalize_whitespace(&content),
            ..Default::default()
        })
    }
}

pub struct MarkdownExtractor;

fn strip_markdown_line(line: &str) -> String {
    let line = line.trim_start();
    let line = line.trim_start_matches('#').trim_start();
    let line = line
        .strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))
        .or_else(|| line.strip_prefix("> "))
        .unwrap_or(line);
    line.replace("**", "").replace("__", "").replace('`', "")
}

impl Extractor for MarkdownExtractor {
    fn name(&self) -> &str {
        "markdown"
    }

    fn can_handle(&self, file_name: &str, content_type: Option<&str>) -> bool {
        matches!(extension(file_name).as_deref(), Some("md") | Some("markdown"))
            || content_type.map_or(false, |ct| ct.starts_with("text/markdown"))
    }

    fn extract(&self, file_name: &str, text: &str) -> Result<ExtractedArticle> {
        let (title, content) = split_title(file_name, text, strip_markdown_line);
        let content = content
            .lines()
            .map(strip_markdown_line)
            .collect::<Vec<_>>()
            .join("\n");
        Ok(ExtractedArticle {
            title,
            content: normalize_whitespace(&content),
            ..Default::default()
        })
    }
}
