use scraper::{Html, Selector};
use serde_json::Value;

/// The article fields we read from JSON-LD metadata.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct JsonLdArticle {
    pub headline: Option<String>,
    pub body: Option<String>,
    pub description: Option<String>,
    pub authors: Vec<String>,
}

fn author_names(author: &Value) -> Vec<String> {
    match author {
        Value::Array(arr) => arr.iter().flat_map(author_names).collect(),
        Value::Object(obj) => obj
            .get("name")
            .and_then(|n| n.as_str())
            .map(|name| vec![name.trim().to_string()])
            .unwrap_or_default(),
        Value::String(s) => vec![s.trim().to_string()],
        _ => vec![],
    }
}

fn is_article(node: &Value) -> bool {
    let matches = |t: &str| t.ends_with("Article") || t == "BlogPosting" || t == "Report";
    match node.get("@type") {
        Some(Value::String(t)) => matches(t),
        Some(Value::Array(types)) => types.iter().filter_map(|t| t.as_str()).any(matches),
        _ => false,
    }
}

/// Article-typed nodes, looking inside `@graph` and top-level arrays.
fn article_nodes(json: Value) -> Vec<Value> {
    match json {
        Value::Array(items) => items.into_iter().flat_map(article_nodes).collect(),
        Value::Object(mut obj) => match obj.remove("@graph") {
            Some(graph) => article_nodes(graph),
            None => {
                let node = Value::Object(obj);
                if is_article(&node) {
                    vec![node]
                } else {
                    vec![]
                }
            }
        },
        _ => vec![],
    }
}

fn text_field(node: &Value, key: &str) -> Option<String> {
    node.get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Extracts the first article described by JSON-LD metadata in the document.
pub fn extract_article(document: &Html) -> Option<JsonLdArticle> {
    let script_selector = Selector::parse("script[type='application/ld+json']").ok()?;
    for script in document.select(&script_selector) {
        let Ok(json) = serde_json::from_str::<Value>(script.text().collect::<String>().trim()) else {
            continue;
        };
        if let Some(node) = article_nodes(json).into_iter().next() {
            return Some(JsonLdArticle {
                headline: text_field(&node, "headline"),
                body: text_field(&node, "articleBody"),
                description: text_field(&node, "description"),
                authors: node.get("author").map(author_names).unwrap_or_default(),
            });
        }
    }
    None
}
