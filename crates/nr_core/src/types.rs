use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Editor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Editor => "editor",
            Role::Admin => "admin",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::User
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "editor" => Ok(Role::Editor),
            "admin" => Ok(Role::Admin),
            other => Err(Error::validation(format!("unknown role: {}", other))),
        }
    }
}

/// Publishing targets an article can be reformatted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Twitter,
    Linkedin,
    Facebook,
    Instagram,
    Blog,
    Newsletter,
}

impl Platform {
    pub const ALL: [Platform; 6] = [
        Platform::Twitter,
        Platform::Linkedin,
        Platform::Facebook,
        Platform::Instagram,
        Platform::Blog,
        Platform::Newsletter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Twitter => "twitter",
            Platform::Linkedin => "linkedin",
            Platform::Facebook => "facebook",
            Platform::Instagram => "instagram",
            Platform::Blog => "blog",
            Platform::Newsletter => "newsletter",
        }
    }

    /// Maximum post length in characters, `None` for long-form targets.
    pub fn max_chars(&self) -> Option<usize> {
        match self {
            Platform::Twitter => Some(280),
            Platform::Linkedin => Some(3000),
            Platform::Facebook => Some(63206),
            Platform::Instagram => Some(2200),
            Platform::Blog | Platform::Newsletter => None,
        }
    }

    /// Whether distribution needs a connected social account.
    pub fn is_social(&self) -> bool {
        !matches!(self, Platform::Blog | Platform::Newsletter)
    }

    pub fn host(&self) -> &'static str {
        match self {
            Platform::Twitter => "x.com",
            Platform::Linkedin => "www.linkedin.com",
            Platform::Facebook => "www.facebook.com",
            Platform::Instagram => "www.instagram.com",
            Platform::Blog => "blog.newsroom.local",
            Platform::Newsletter => "newsletter.newsroom.local",
        }
    }

    pub fn default_set() -> Vec<Platform> {
        vec![Platform::Twitter, Platform::Linkedin, Platform::Blog]
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s.to_ascii_lowercase())
            .ok_or_else(|| Error::validation(format!("unknown platform: {}", s)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub default_platforms: Vec<Platform>,
    pub default_brand_voice_id: Option<Uuid>,
    pub notifications: bool,
    pub auto_fact_check: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            default_platforms: Platform::default_set(),
            default_brand_voice_id: None,
            notifications: true,
            auto_fact_check: true,
        }
    }
}

/// Connection stub for a social platform. There is no token lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SocialAccount {
    pub platform: Platform,
    pub connected: bool,
    pub username: Option<String>,
    pub connected_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(default)]
    pub social_accounts: Vec<SocialAccount>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("role", &self.role)
            .field("preferences", &self.preferences)
            .field("social_accounts", &self.social_accounts)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

impl User {
    pub fn new(name: String, email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            email: email.trim().to_lowercase(),
            password_hash,
            role: Role::User,
            preferences: Preferences::default(),
            social_accounts: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn social_account(&self, platform: Platform) -> Option<&SocialAccount> {
        self.social_accounts.iter().find(|a| a.platform == platform)
    }

    pub fn connect_account(&mut self, platform: Platform, username: String) {
        let now = Utc::now();
        match self.social_accounts.iter_mut().find(|a| a.platform == platform) {
            Some(account) => {
                account.connected = true;
                account.username = Some(username);
                account.connected_at = Some(now);
            }
            None => self.social_accounts.push(SocialAccount {
                platform,
                connected: true,
                username: Some(username),
                connected_at: Some(now),
            }),
        }
        self.updated_at = now;
    }

    pub fn disconnect_account(&mut self, platform: Platform) {
        if let Some(account) = self.social_accounts.iter_mut().find(|a| a.platform == platform) {
            account.connected = false;
            account.connected_at = None;
        }
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Manual,
    Upload,
    Url,
    Generated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArticleStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl FromStr for ArticleStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ArticleStatus::Pending),
            "processing" => Ok(ArticleStatus::Processing),
            "completed" => Ok(ArticleStatus::Completed),
            "failed" => Ok(ArticleStatus::Failed),
            other => Err(Error::validation(format!("unknown article status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub content: String,
    pub original_content: String,
    pub summary: Option<String>,
    pub source_type: SourceType,
    pub source_url: Option<String>,
    pub file_name: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub status: ArticleStatus,
    pub fake_news_detection: Option<FakeNewsDetection>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Article {
    pub fn new(owner_id: Uuid, title: String, content: String, source_type: SourceType) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            title,
            original_content: content.clone(),
            content,
            summary: None,
            source_type,
            source_url: None,
            file_name: None,
            authors: Vec::new(),
            tags: Vec::new(),
            status: ArticleStatus::Pending,
            fake_news_detection: None,
            processed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn set_status(&mut self, status: ArticleStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Professional,
    Casual,
    Friendly,
    Authoritative,
    Humorous,
    Inspirational,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Style {
    Formal,
    Conversational,
    Technical,
    Storytelling,
    Concise,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandVoice {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub tone: Tone,
    pub style: Style,
    pub target_audience: Option<String>,
    pub custom_prompt: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub avoid_words: Vec<String>,
    #[serde(default)]
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    Draft,
    Approved,
    Published,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SeoMetadata {
    pub title: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReformattedContent {
    pub id: Uuid,
    pub article_id: Uuid,
    pub owner_id: Uuid,
    pub platform: Platform,
    pub content: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
    pub brand_voice_id: Option<Uuid>,
    pub fact_check: Option<FactCheck>,
    pub seo: Option<SeoMetadata>,
    pub status: ContentStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub published_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReformattedContent {
    pub fn new(article: &Article, platform: Platform, output: Reformatted) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            article_id: article.id,
            owner_id: article.owner_id,
            platform,
            content: output.content,
            hashtags: output.hashtags,
            brand_voice_id: None,
            fact_check: None,
            seo: output.seo,
            status: ContentStatus::Draft,
            published_at: None,
            published_url: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Text produced by an agent for one platform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Reformatted {
    pub content: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub seo: Option<SeoMetadata>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMethod {
    Llm,
    Heuristic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthenticityStatus {
    LikelyAuthentic,
    MostlyReliable,
    Questionable,
    LikelyMisleading,
    LikelyFake,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DetectionFlag {
    pub kind: String,
    pub severity: Severity,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FakeNewsDetection {
    pub score: u8,
    pub status: AuthenticityStatus,
    pub summary: String,
    pub flags: Vec<DetectionFlag>,
    pub confidence: f32,
    pub method: AnalysisMethod,
    pub analyzed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactCheckStatus {
    Verified,
    NeedsReview,
    Disputed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FactCheckIssue {
    pub claim: String,
    pub note: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FactCheck {
    pub status: FactCheckStatus,
    pub score: u8,
    pub issues: Vec<FactCheckIssue>,
    pub method: AnalysisMethod,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArticleLength {
    Short,
    Medium,
    Long,
}

impl ArticleLength {
    pub fn paragraphs(&self) -> usize {
        match self {
            ArticleLength::Short => 2,
            ArticleLength::Medium => 4,
            ArticleLength::Long => 6,
        }
    }
}

impl Default for ArticleLength {
    fn default() -> Self {
        Self::Medium
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub topic: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    pub brand_voice_id: Option<Uuid>,
    #[serde(default)]
    pub length: ArticleLength,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedArticle {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub summary: Option<String>,
}
