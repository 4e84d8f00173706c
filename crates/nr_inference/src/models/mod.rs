use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use nr_core::text::truncate_chars;
use nr_core::{
    AnalysisMethod, Article, BrandVoice, ContentAgent, DetectionFlag, Error, FactCheck,
    FactCheckIssue, FakeNewsDetection, GenerateRequest, GeneratedArticle, Platform, Reformatted,
    Result,
};

use crate::detection::{self, claims};
use crate::prompts;
use crate::InferenceConfig;

pub mod mock;

pub use mock::MockAgent;

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: String,
}

#[derive(Deserialize)]
struct DetectionReply {
    score: f64,
    #[serde(default)]
    flags: Vec<DetectionFlag>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    confidence: Option<f32>,
}

#[derive(Deserialize)]
struct FactCheckReply {
    score: f64,
    #[serde(default)]
    issues: Vec<FactCheckIssue>,
}

/// Strips Markdown code fences and any prose around the outermost JSON object.
pub fn extract_json(reply: &str) -> &str {
    let trimmed = reply.trim();
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}

fn clamp_score(score: f64) -> u8 {
    score.round().clamp(0.0, 100.0) as u8
}

/// Agent backed by an OpenAI-compatible chat completions API.
///
/// Every call that fails (transport, HTTP status or unparseable reply) is
/// answered by the [`MockAgent`] instead, so callers never see model errors.
pub struct LlmAgent {
    client: Arc<Client>,
    api_key: String,
    base_url: String,
    model: String,
    fallback: MockAgent,
}

impl fmt::Debug for LlmAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmAgent")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl LlmAgent {
    pub fn new(config: &InferenceConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::Inference("LLM API key is required".to_string()))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client: Arc::new(client),
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            fallback: MockAgent::new(),
        })
    }

    async fn chat(&self, prompt: String) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: prompts::SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt,
                },
            ],
            temperature: 0.4,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json::<ChatResponse>()
            .await?;

        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| Error::Inference("model returned no choices".to_string()))
    }

    async fn chat_json<T: DeserializeOwned>(&self, prompt: String) -> Result<T> {
        let reply = self.chat(prompt).await?;
        debug!("Model reply: {} chars", reply.len());
        Ok(serde_json::from_str(extract_json(&reply))?)
    }
}

#[async_trait]
impl ContentAgent for LlmAgent {
    fn name(&self) -> &str {
        "LLM"
    }

    async fn detect_fake_news(&self, title: &str, content: &str) -> Result<FakeNewsDetection> {
        match self.chat_json::<DetectionReply>(prompts::detection_prompt(title, content)).await {
            Ok(reply) => {
                let score = clamp_score(reply.score);
                let (status, copy) = detection::bucket(score);
                Ok(FakeNewsDetection {
                    score,
                    status,
                    summary: reply.summary.filter(|s| !s.trim().is_empty()).unwrap_or_else(|| copy.to_string()),
                    confidence: reply.confidence.unwrap_or(0.8).clamp(0.0, 1.0),
                    flags: reply.flags,
                    method: AnalysisMethod::Llm,
                    analyzed_at: Utc::now(),
                })
            }
            Err(e) => {
                warn!("⚠️ Fake news detection via model failed, using heuristics: {}", e);
                self.fallback.detect_fake_news(title, content).await
            }
        }
    }

    async fn reformat(
        &self,
        article: &Article,
        platform: Platform,
        voice: Option<&BrandVoice>,
    ) -> Result<Reformatted> {
        match self
            .chat_json::<Reformatted>(prompts::reformat_prompt(article, platform, voice))
            .await
        {
            Ok(mut reply) if !reply.content.trim().is_empty() => {
                if let Some(limit) = platform.max_chars() {
                    reply.content = truncate_chars(reply.content.trim(), limit);
                }
                if platform != Platform::Blog {
                    reply.seo = None;
                }
                Ok(reply)
            }
            Ok(_) => {
                warn!("⚠️ Model returned empty {} content, using template", platform);
                self.fallback.reformat(article, platform, voice).await
            }
            Err(e) => {
                warn!("⚠️ Reformatting for {} via model failed, using template: {}", platform, e);
                self.fallback.reformat(article, platform, voice).await
            }
        }
    }

    async fn fact_check(&self, text: &str, source: &Article) -> Result<FactCheck> {
        match self.chat_json::<FactCheckReply>(prompts::fact_check_prompt(text, source)).await {
            Ok(reply) => {
                let score = clamp_score(reply.score);
                Ok(FactCheck {
                    status: claims::status_for(score),
                    score,
                    issues: reply.issues,
                    method: AnalysisMethod::Llm,
                    checked_at: Utc::now(),
                })
            }
            Err(e) => {
                warn!("⚠️ Fact check via model failed, using heuristics: {}", e);
                self.fallback.fact_check(text, source).await
            }
        }
    }

    async fn generate_article(
        &self,
        request: &GenerateRequest,
        voice: Option<&BrandVoice>,
    ) -> Result<GeneratedArticle> {
        match self
            .chat_json::<GeneratedArticle>(prompts::generate_prompt(request, voice))
            .await
        {
            Ok(reply) if !reply.title.trim().is_empty() && !reply.content.trim().is_empty() => Ok(reply),
            Ok(_) => {
                warn!("⚠️ Model returned an empty article, using template");
                self.fallback.generate_article(request, voice).await
            }
            Err(e) => {
                warn!("⚠️ Article generation via model failed, using template: {}", e);
                self.fallback.generate_article(request, voice).await
            }
        }
    }
}

/// Picks the agent for a configuration: the model API when a key is set,
/// the deterministic mock otherwise.
pub fn create_agent(config: &InferenceConfig) -> Result<Arc<dyn ContentAgent>> {
    if config.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
        info!("🧪 No LLM API key configured, using the mock agent");
        return Ok(Arc::new(MockAgent::new()));
    }
    let agent = LlmAgent::new(config)?;
    info!("🧠 Using model {} at {}", agent.model, agent.base_url);
    Ok(Arc::new(agent))
}
