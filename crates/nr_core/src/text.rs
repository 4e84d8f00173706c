//! Small text helpers shared by the agents and the ingest crate.

/// Truncates `text` to at most `limit` characters, ending with an ellipsis
/// when anything was cut.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    if limit == 0 {
        return String::new();
    }
    let mut out: String = text.chars().take(limit - 1).collect();
    out = out.trim_end().to_string();
    out.push('…');
    out
}

/// Splits text into trimmed, non-empty sentences. Terminators are kept.
pub fn sentences(text: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') {
            let sentence = current.trim();
            if sentence.len() > 1 {
                result.push(sentence.to_string());
            }
            current.clear();
        }
    }
    let rest = current.trim();
    if !rest.is_empty() {
        result.push(rest.to_string());
    }
    result
}

pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut dash = false;
    for c in text.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
            dash = false;
        } else if !dash && !slug.is_empty() {
            slug.push('-');
            dash = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// Collapses runs of whitespace inside each line and drops blank-line runs.
pub fn normalize_whitespace(text: &str) -> String {
    let mut paragraphs = Vec::new();
    for block in text.split("\n\n") {
        let line = block.split_whitespace().collect::<Vec<_>>().join(" ");
        if !line.is_empty() {
            paragraphs.push(line);
        }
    }
    paragraphs.join("\n\n")
}
