use std::collections::HashMap;
use std::fmt;

use nr_core::text::{normalize_whitespace, sentences, slugify, truncate_chars};
use nr_core::{
    Article, BrandVoice, ContentAgent, FactCheck, FakeNewsDetection, GenerateRequest,
    GeneratedArticle, Platform, Reformatted, Result, SeoMetadata, Tone,
};
use regex::Regex;

use crate::detection;

const STOPWORDS: &[&str] = &[
    "about", "after", "again", "against", "their", "there", "these", "those", "which", "while",
    "would", "could", "should", "being", "other", "where", "under", "since", "before", "still",
];

/// Deterministic agent used when no model API key is configured.
pub struct MockAgent;

impl fmt::Debug for MockAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockAgent").finish()
    }
}

impl MockAgent {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MockAgent {
    fn default() -> Self {
        Self::new()
    }
}

fn call_to_action(voice: Option<&BrandVoice>) -> &'static str {
    match voice.map(|v| v.tone) {
        Some(Tone::Professional) => "Read the full story.",
        Some(Tone::Casual) => "Check it out!",
        Some(Tone::Friendly) => "We'd love to hear your thoughts.",
        Some(Tone::Authoritative) => "Read the full analysis.",
        Some(Tone::Humorous) => "You'll want to see this one.",
        Some(Tone::Inspirational) => "Let this inspire your next step.",
        None => "Read more.",
    }
}

/// Most frequent longer words of `text`, ties broken alphabetically.
fn frequent_words(text: &str, limit: usize) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for word in text.split(|c: char| !c.is_alphanumeric()) {
        let word = word.to_lowercase();
        if word.chars().count() >= 5 && !STOPWORDS.contains(&word.as_str()) {
            *counts.entry(word).or_insert(0) += 1;
        }
    }
    let mut words: Vec<(String, usize)> = counts.into_iter().collect();
    words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    words.into_iter().take(limit).map(|(w, _)| w).collect()
}

fn hashtag(word: &str) -> String {
    let tag: String = word
        .split_whitespace()
        .map(|part| {
            let mut chars = part.chars().filter(|c| c.is_alphanumeric());
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect();
    format!("#{}", tag)
}

fn hashtags(article: &Article, voice: Option<&BrandVoice>) -> Vec<String> {
    let words = match voice {
        Some(v) if !v.keywords.is_empty() => v.keywords.clone(),
        _ => frequent_words(&article.title, 3),
    };
    words
        .iter()
        .map(|w| hashtag(w))
        .filter(|t| t.len() > 1)
        .take(5)
        .collect()
}

fn strip_avoided(text: &str, voice: Option<&BrandVoice>) -> String {
    let Some(voice) = voice else {
        return text.to_string();
    };
    let mut out = text.to_string();
    for word in &voice.avoid_words {
        if let Ok(re) = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(word))) {
            out = re.replace_all(&out, "").into_owned();
        }
    }
    // Removing words leaves double spaces and stray " ," behind.
    out.split('\n')
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" ").replace(" ,", ",").replace(" .", "."))
        .collect::<Vec<_>>()
        .join("\n")
}

fn summary(content: &str, count: usize) -> String {
    sentences(content).into_iter().take(count).collect::<Vec<_>>().join(" ")
}

fn paragraphs(content: &str) -> Vec<String> {
    normalize_whitespace(content)
        .split("\n\n")
        .map(|p| p.to_string())
        .collect()
}

fn seo(article: &Article, voice: Option<&BrandVoice>) -> SeoMetadata {
    let mut keywords: Vec<String> = voice.map(|v| v.keywords.clone()).unwrap_or_default();
    for word in frequent_words(&format!("{} {}", article.title, article.content), 8) {
        if keywords.len() >= 8 {
            break;
        }
        if !keywords.iter().any(|k| k.eq_ignore_ascii_case(&word)) {
            keywords.push(word);
        }
    }
    SeoMetadata {
        title: truncate_chars(&article.title, 60),
        description: truncate_chars(&summary(&article.content, 2), 160),
        keywords,
        slug: slugify(&article.title),
    }
}

/// Builds the platform text for an article. Pure and deterministic.
pub fn render(article: &Article, platform: Platform, voice: Option<&BrandVoice>) -> Reformatted {
    let tags = hashtags(article, voice);
    let tag_line = tags.join(" ");
    let cta = call_to_action(voice);
    let lead = summary(&article.content, 1);
    let short_summary = summary(&article.content, 2);

    let (content, seo) = match platform {
        Platform::Twitter => {
            let limit = 280usize.saturating_sub(tag_line.chars().count() + 2);
            let body = truncate_chars(&format!("{}: {}", article.title, lead), limit);
            (format!("{}\n\n{}", body, tag_line), None)
        }
        Platform::Linkedin => {
            let first = paragraphs(&article.content).into_iter().next().unwrap_or_default();
            (
                format!("{}\n\n{}\n\n{}\n\n{}\n\n{}", article.title, short_summary, first, cta, tag_line),
                None,
            )
        }
        Platform::Facebook => (format!("{}\n\n{}\n\n{}", article.title, short_summary, cta), None),
        Platform::Instagram => (
            format!("{}\n\n{}\n\n{}\n.\n.\n{}", article.title, short_summary, cta, tag_line),
            None,
        ),
        Platform::Blog => (
            format!("# {}\n\n{}\n\n{}", article.title, paragraphs(&article.content).join("\n\n"), cta),
            Some(seo(article, voice)),
        ),
        Platform::Newsletter => {
            let body = paragraphs(&article.content).into_iter().take(2).collect::<Vec<_>>().join("\n\n");
            (
                format!(
                    "Subject: {}\n\nHi there,\n\n{}\n\n{}\n\n{}\n\nThanks for reading.",
                    article.title, short_summary, body, cta
                ),
                None,
            )
        }
    };

    let content = strip_avoided(content.trim_end(), voice);
    let content = match platform.max_chars() {
        Some(limit) => truncate_chars(&content, limit),
        None => content,
    };

    Reformatted { content, hashtags: tags, seo }
}

pub fn generate(request: &GenerateRequest, voice: Option<&BrandVoice>) -> GeneratedArticle {
    let topic = request.topic.trim();
    let mut title: String = topic.chars().take(1).flat_map(char::to_uppercase).collect();
    title.push_str(&topic.chars().skip(1).collect::<String>());
    let title = format!("{}: What You Need to Know", title);

    let mut paragraphs = vec![format!(
        "{} has drawn growing attention in recent weeks, and this report sets out what is known so far.",
        title.split(':').next().unwrap_or(topic)
    )];
    for point in &request.key_points {
        let point = point.trim().trim_end_matches('.');
        if !point.is_empty() {
            paragraphs.push(format!("{}.", point));
        }
    }
    if let Some(voice) = voice {
        if !voice.keywords.is_empty() {
            paragraphs.push(format!(
                "The story touches on {}, themes our readers follow closely.",
                voice.keywords.join(", ")
            ));
        }
    }
    while paragraphs.len() < request.length.paragraphs() {
        paragraphs.push(format!(
            "Further details on {} are expected as more information becomes available.",
            topic
        ));
    }
    paragraphs.truncate(request.length.paragraphs().max(1 + request.key_points.len()));

    let content = strip_avoided(&paragraphs.join("\n\n"), voice);
    GeneratedArticle {
        summary: Some(summary(&content, 1)),
        title,
        content,
    }
}

#[async_trait::async_trait]
impl ContentAgent for MockAgent {
    fn name(&self) -> &str {
        "Mock"
    }

    async fn detect_fake_news(&self, title: &str, content: &str) -> Result<FakeNewsDetection> {
        Ok(detection::analyze(title, content))
    }

    async fn reformat(
        &self,
        article: &Article,
        platform: Platform,
        voice: Option<&BrandVoice>,
    ) -> Result<Reformatted> {
        Ok(render(article, platform, voice))
    }

    async fn fact_check(&self, text: &str, _source: &Article) -> Result<FactCheck> {
        Ok(detection::claims::check(text))
    }

    async fn generate_article(
        &self,
        request: &GenerateRequest,
        voice: Option<&BrandVoice>,
    ) -> Result<GeneratedArticle> {
        Ok(generate(request, voice))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use nr_core::{ArticleLength, FactCheckStatus, SourceType, Style};
    use uuid::Uuid;

    fn article() -> Article {
        Article::new(
            Uuid::new_v4(),
            "Council approves transit budget".to_string(),
            "The city council approved the transit budget on Tuesday. \
             Officials said bus service will expand to 12 new routes. \
             The plan takes effect in March.\n\n\
             Residents can comment on the routes until February."
                .to_string(),
            SourceType::Manual,
        )
    }

    fn voice(tone: Tone) -> BrandVoice {
        BrandVoice {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            name: "Metro".to_string(),
            description: None,
            tone,
            style: Style::Conversational,
            target_audience: None,
            custom_prompt: None,
            keywords: vec!["city transit".to_string(), "budget".to_string()],
            avoid_words: vec!["bus".to_string()],
            is_default: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_twitter_output_fits_limit() {
        let mut long = article();
        long.content = "A very long sentence about transit policy ".repeat(40);
        let model = MockAgent::new();
        let result = model.reformat(&long, Platform::Twitter, None).await.unwrap();
        assert!(result.content.chars().count() <= 280);
        assert!(result.content.starts_with("Council approves transit budget:"));
        assert!(result.content.ends_with(&result.hashtags.join(" ")));
    }

    #[tokio::test]
    async fn test_brand_voice_hashtags_cta_and_avoid_words() {
        let model = MockAgent::new();
        let voice = voice(Tone::Friendly);
        let result = model.reformat(&article(), Platform::Linkedin, Some(&voice)).await.unwrap();
        assert_eq!(result.hashtags, vec!["#CityTransit", "#Budget"]);
        assert!(result.content.contains("We'd love to hear your thoughts."));
        assert!(!result.content.to_lowercase().contains(" bus "));
        assert!(result.seo.is_none());
    }

    #[tokio::test]
    async fn test_blog_has_seo_metadata() {
        let model = MockAgent::new();
        let result = model.reformat(&article(), Platform::Blog, None).await.unwrap();
        let seo = result.seo.unwrap();
        assert_eq!(seo.slug, "council-approves-transit-budget");
        assert!(seo.title.chars().count() <= 60);
        assert!(seo.description.chars().count() <= 160);
        assert!(!seo.keywords.is_empty());
        assert!(result.content.starts_with("# Council approves transit budget"));
        assert!(result.content.ends_with("Read more."));
    }

    #[tokio::test]
    async fn test_newsletter_layout() {
        let model = MockAgent::new();
        let result = model.reformat(&article(), Platform::Newsletter, None).await.unwrap();
        assert!(result.content.starts_with("Subject: Council approves transit budget"));
        assert!(result.content.ends_with("Thanks for reading."));
    }

    #[tokio::test]
    async fn test_fact_check_of_rendered_output() {
        let model = MockAgent::new();
        let source = article();
        let faithful = model.fact_check("Officials said bus service will expand to 12 new routes.", &source).await.unwrap();
        assert_eq!(faithful.status, FactCheckStatus::Verified);

        let unsourced = model.fact_check("Service will expand to 40 routes.", &source).await.unwrap();
        assert_eq!(unsourced.issues.len(), 1);
        assert_eq!(unsourced.score, 85);
    }

    #[tokio::test]
    async fn test_generate_article() {
        let model = MockAgent::new();
        let request = GenerateRequest {
            topic: "night buses".to_string(),
            key_points: vec!["Routes run until 3am".to_string(), "Fares stay the same.".to_string()],
            brand_voice_id: None,
            length: ArticleLength::Medium,
        };
        let generated = model.generate_article(&request, None).await.unwrap();
        assert_eq!(generated.title, "Night buses: What You Need to Know");
        let paragraphs: Vec<_> = generated.content.split("\n\n").collect();
        assert_eq!(paragraphs.len(), 4);
        assert_eq!(paragraphs[1], "Routes run until 3am.");
        assert_eq!(paragraphs[2], "Fares stay the same.");
        assert!(generated.summary.unwrap().starts_with("Night buses has drawn"));
    }

    #[tokio::test]
    async fn test_detection_uses_heuristics() {
        let model = MockAgent::new();
        let result = model.detect_fake_news("Shocking cover-up", "Wake up!!").await.unwrap();
        assert!(result.score < 40);
    }
}
