use nr_core::{Article, ArticleLength, BrandVoice, GenerateRequest, Platform};

pub const SYSTEM_PROMPT: &str = "You are an editorial assistant for a newsroom. \
You rewrite, check and write news content. \
When asked for JSON, reply with a single JSON object and nothing else.";

fn platform_guidance(platform: Platform) -> &'static str {
    match platform {
        Platform::Twitter => "A single post of at most 280 characters including hashtags. Lead with the news.",
        Platform::Linkedin => "A professional post of up to 3000 characters with a strong opening line and short paragraphs.",
        Platform::Facebook => "An engaging post of a few short paragraphs that invites discussion.",
        Platform::Instagram => "A caption of up to 2200 characters with an inviting first line and hashtags at the end.",
        Platform::Blog => "A complete blog post in Markdown with a title, subheadings and SEO metadata.",
        Platform::Newsletter => "A newsletter section with a subject line, greeting, summary and sign-off.",
    }
}

/// Renders the brand voice as prompt instructions.
pub fn voice_instructions(voice: Option<&BrandVoice>) -> String {
    let Some(voice) = voice else {
        return "Use a neutral, clear journalistic voice.".to_string();
    };

    let mut lines = vec![
        format!("Brand voice: {}", voice.name),
        format!("Tone: {}", format!("{:?}", voice.tone).to_lowercase()),
        format!("Style: {}", format!("{:?}", voice.style).to_lowercase()),
    ];
    if let Some(description) = &voice.description {
        lines.push(format!("Description: {}", description));
    }
    if let Some(audience) = &voice.target_audience {
        lines.push(format!("Target audience: {}", audience));
    }
    if !voice.keywords.is_empty() {
        lines.push(format!("Work in these keywords where natural: {}", voice.keywords.join(", ")));
    }
    if !voice.avoid_words.is_empty() {
        lines.push(format!("Never use these words: {}", voice.avoid_words.join(", ")));
    }
    if let Some(custom) = &voice.custom_prompt {
        lines.push(custom.clone());
    }
    lines.join("\n")
}

pub fn reformat_prompt(article: &Article, platform: Platform, voice: Option<&BrandVoice>) -> String {
    format!(
        "Rewrite the following article for {platform}.\n\
         Requirements: {guidance}\n\
         Keep every fact, figure and name exactly as in the article.\n\n\
         {voice}\n\n\
         Title: {title}\n\n\
         Article:\n{content}\n\n\
         Reply with JSON: {{\"content\": string, \"hashtags\": [string], \
         \"seo\": {{\"title\": string, \"description\": string, \"keywords\": [string], \"slug\": string}} | null}}",
        platform = platform,
        guidance = platform_guidance(platform),
        voice = voice_instructions(voice),
        title = article.title,
        content = article.content,
    )
}

pub fn detection_prompt(title: &str, content: &str) -> String {
    format!(
        "Assess the authenticity of this news article. Look for sensational language, \
         clickbait, conspiracy framing, vague sourcing, absolute claims, emotional manipulation \
         and miracle claims.\n\n\
         Title: {title}\n\nArticle:\n{content}\n\n\
         Reply with JSON: {{\"score\": integer 0-100 where 100 is fully credible, \
         \"flags\": [{{\"kind\": string, \"severity\": \"low\"|\"medium\"|\"high\", \"description\": string}}], \
         \"summary\": string, \"confidence\": number 0-1}}"
    )
}

pub fn fact_check_prompt(text: &str, source: &Article) -> String {
    format!(
        "Fact-check the rewritten text against the source article. \
         List every claim in the rewrite that is missing from, contradicts or overstates the source.\n\n\
         Source title: {title}\n\nSource article:\n{source}\n\n\
         Rewritten text:\n{text}\n\n\
         Reply with JSON: {{\"score\": integer 0-100 where 100 is fully faithful, \
         \"issues\": [{{\"claim\": string, \"note\": string}}]}}",
        title = source.title,
        source = source.content,
    )
}

fn length_name(length: ArticleLength) -> &'static str {
    match length {
        ArticleLength::Short => "short",
        ArticleLength::Medium => "medium-length",
        ArticleLength::Long => "long",
    }
}

pub fn generate_prompt(request: &GenerateRequest, voice: Option<&BrandVoice>) -> String {
    let points = if request.key_points.is_empty() {
        "(none given)".to_string()
    } else {
        request
            .key_points
            .iter()
            .map(|p| format!("- {}", p))
            .collect::<Vec<_>>()
            .join("\n")
    };
    format!(
        "Write a {length} news article ({paragraphs} paragraphs) about: {topic}\n\
         Key points:\n{points}\n\n\
         {voice}\n\n\
         Reply with JSON: {{\"title\": string, \"content\": string, \"summary\": string}}",
        length = length_name(request.length),
        paragraphs = request.length.paragraphs(),
        topic = request.topic,
        voice = voice_instructions(voice),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use nr_core::{Style, Tone};
    use uuid::Uuid;

    fn voice() -> BrandVoice {
        BrandVoice {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            name: "Civic Desk".to_string(),
            description: None,
            tone: Tone::Authoritative,
            style: Style::Concise,
            target_audience: Some("local readers".to_string()),
            custom_prompt: Some("Always end with a question.".to_string()),
            keywords: vec!["transit".to_string(), "budget".to_string()],
            avoid_words: vec!["slams".to_string()],
            is_default: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_voice_instructions_inline_fields() {
        let text = voice_instructions(Some(&voice()));
        assert!(text.contains("Brand voice: Civic Desk"));
        assert!(text.contains("Tone: authoritative"));
        assert!(text.contains("Style: concise"));
        assert!(text.contains("transit, budget"));
        assert!(text.contains("Never use these words: slams"));
        assert!(text.ends_with("Always end with a question."));
        assert!(voice_instructions(None).contains("neutral"));
    }

    #[test]
    fn test_generate_prompt_lists_key_points() {
        let request = GenerateRequest {
            topic: "bike lanes".to_string(),
            key_points: vec!["new routes".to_string()],
            brand_voice_id: None,
            length: ArticleLength::Short,
        };
        let prompt = generate_prompt(&request, None);
        assert!(prompt.starts_with("Write a short news article (2 paragraphs) about: bike lanes"));
        assert!(prompt.contains("- new routes"));
    }
}
