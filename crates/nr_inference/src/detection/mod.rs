//! Rule-based authenticity scoring.
//!
//! Used whenever no language model is configured, and as the fallback when a
//! model call fails. The rules are fixed regular expressions applied to the
//! lowercased title and body; every match costs a flat penalty and two caps
//! bound the score once enough (or severe enough) flags pile up.

use chrono::Utc;
use lazy_static::lazy_static;
use nr_core::{AnalysisMethod, AuthenticityStatus, DetectionFlag, FakeNewsDetection, Severity};
use regex::Regex;

pub mod claims;

pub const BASE_SCORE: i32 = 85;
pub const FLAG_PENALTY: i32 = 12;
pub const MANY_FLAGS_THRESHOLD: usize = 3;
pub const MANY_FLAGS_CAP: u8 = 45;
pub const HIGH_SEVERITY_THRESHOLD: usize = 2;
pub const HIGH_SEVERITY_CAP: u8 = 25;
pub const SHORT_CONTENT_CHARS: usize = 200;
pub const SHORT_CONTENT_CAP: u8 = 70;

struct Rule {
    kind: &'static str,
    severity: Severity,
    description: &'static str,
    pattern: Regex,
}

impl Rule {
    fn new(kind: &'static str, severity: Severity, description: &'static str, pattern: &str) -> Self {
        Self {
            kind,
            severity,
            description,
            pattern: Regex::new(pattern).expect("static detection pattern"),
        }
    }
}

lazy_static! {
    static ref RULES: Vec<Rule> = vec![
        Rule::new(
            "sensational_language",
            Severity::High,
            "Sensational wording designed to provoke rather than inform",
            r"\b(shocking|unbelievable|you won'?t believe|mind-?blowing|jaw-?dropping|explosive)\b",
        ),
        Rule::new(
            "clickbait",
            Severity::Medium,
            "Clickbait phrasing that pushes sharing or clicking",
            r"(click here|share (this )?before|before (it'?s|they'?re) (deleted|gone|removed)|what happens next|go(es|ing)? viral)",
        ),
        Rule::new(
            "conspiracy_framing",
            Severity::High,
            "Conspiracy framing without supporting evidence",
            r"(cover-?up|deep state|hidden agenda|secret plan|they don'?t want you to know|wake up)",
        ),
        Rule::new(
            "unverified_sources",
            Severity::Medium,
            "Claims attributed to vague or anonymous sources",
            r"(sources say|anonymous sources?|some people (are )?say(ing)?|rumou?rs? (has|have) it|insiders claim|reportedly)",
        ),
        Rule::new(
            "absolute_claims",
            Severity::Low,
            "Absolute or guaranteed claims",
            r"(100%|\bguaranteed\b|(always|never) works|everyone knows|no one is talking)",
        ),
        Rule::new(
            "emotional_manipulation",
            Severity::Medium,
            "Emotionally charged language",
            r"\b(outrage(ous)?|disgusting|terrifying|horrifying|furious|evil)\b",
        ),
        Rule::new(
            "miracle_claims",
            Severity::High,
            "Miracle or too-good-to-be-true claims",
            r"(miracle cure|doctors hate|one weird trick|cures? (cancer|everything)|instant results)",
        ),
        Rule::new(
            "excessive_punctuation",
            Severity::Low,
            "Excessive exclamation or question marks",
            r"[!?]{2,}",
        ),
    ];
}

/// Runs every rule against the text and returns one flag per matching rule.
pub fn find_flags(title: &str, content: &str) -> Vec<DetectionFlag> {
    let text = format!("{}\n{}", title, content).to_lowercase();
    RULES
        .iter()
        .filter(|rule| rule.pattern.is_match(&text))
        .map(|rule| DetectionFlag {
            kind: rule.kind.to_string(),
            severity: rule.severity,
            description: rule.description.to_string(),
        })
        .collect()
}

/// Turns a set of flags into a 0-100 score.
pub fn score(flags: &[DetectionFlag], content_chars: usize) -> u8 {
    let raw = BASE_SCORE - FLAG_PENALTY * flags.len() as i32;
    let mut score = raw.clamp(0, 100) as u8;

    if flags.len() >= MANY_FLAGS_THRESHOLD {
        score = score.min(MANY_FLAGS_CAP);
    }
    let high = flags.iter().filter(|f| f.severity == Severity::High).count();
    if high >= HIGH_SEVERITY_THRESHOLD {
        score = score.min(HIGH_SEVERITY_CAP);
    }
    if flags.is_empty() && content_chars < SHORT_CONTENT_CHARS {
        score = score.min(SHORT_CONTENT_CAP);
    }
    score
}

/// Maps a score to its status bucket and fixed summary copy.
pub fn bucket(score: u8) -> (AuthenticityStatus, &'static str) {
    match score {
        80..=u8::MAX => (
            AuthenticityStatus::LikelyAuthentic,
            "No significant credibility issues were detected.",
        ),
        60..=79 => (
            AuthenticityStatus::MostlyReliable,
            "Minor credibility concerns; verify key claims before sharing.",
        ),
        40..=59 => (
            AuthenticityStatus::Questionable,
            "Several credibility red flags; independent verification recommended.",
        ),
        20..=39 => (
            AuthenticityStatus::LikelyMisleading,
            "Strong indicators of misleading or manipulative content.",
        ),
        _ => (
            AuthenticityStatus::LikelyFake,
            "Content shows hallmark patterns of fabricated news.",
        ),
    }
}

pub fn confidence(flag_count: usize) -> f32 {
    (0.5 + 0.05 * flag_count as f32).min(0.9)
}

/// Full heuristic assessment of an article.
pub fn analyze(title: &str, content: &str) -> FakeNewsDetection {
    let flags = find_flags(title, content);
    let score = score(&flags, content.chars().count());
    let (status, summary) = bucket(score);
    tracing::debug!("Heuristic authenticity score {} with {} flags", score, flags.len());

    FakeNewsDetection {
        score,
        status,
        summary: summary.to_string(),
        confidence: confidence(flags.len()),
        flags,
        method: AnalysisMethod::Heuristic,
        analyzed_at: Utc::now(),
    }
}
