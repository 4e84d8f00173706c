//! Heuristic fact check of a reformatted text.

use chrono::Utc;
use lazy_static::lazy_static;
use nr_core::text::{sentences, truncate_chars};
use nr_core::{AnalysisMethod, FactCheck, FactCheckIssue, FactCheckStatus};
use regex::Regex;

pub const BASE_SCORE: i32 = 95;
pub const ISSUE_PENALTY: i32 = 10;

lazy_static! {
    static ref FIGURE: Regex = Regex::new(r"\d").expect("static figure pattern");
    static ref ATTRIBUTION: Regex =
        Regex::new(r"(?i)(\baccording to\b|\bsaid\b|\breported\b|\bstudy\b|\bdata\b|\bsource\b)")
            .expect("static attribution pattern");
    static ref ABSOLUTE: Regex = Regex::new(
        r"(?i)\b(always|never|everyone|nobody|guaranteed|undeniabl[ey]|proven fact)\b"
    )
    .expect("static absolute pattern");
}

/// Maps a fact-check score to its status.
pub fn status_for(score: u8) -> FactCheckStatus {
    match score {
        80..=u8::MAX => FactCheckStatus::Verified,
        50..=79 => FactCheckStatus::NeedsReview,
        _ => FactCheckStatus::Disputed,
    }
}

/// Flags at most one issue per sentence of `text`.
pub fn find_issues(text: &str) -> Vec<FactCheckIssue> {
    sentences(text)
        .into_iter()
        .filter_map(|sentence| {
            let note = if FIGURE.is_match(&sentence) && !ATTRIBUTION.is_match(&sentence) {
                "Statistic stated without attribution"
            } else if ABSOLUTE.is_match(&sentence) {
                "Absolute wording that may overstate the source"
            } else {
                return None;
            };
            Some(FactCheckIssue {
                claim: truncate_chars(&sentence, 200),
                note: note.to_string(),
            })
        })
        .collect()
}

pub fn check(text: &str) -> FactCheck {
    let issues = find_issues(text);
    let score = (BASE_SCORE - ISSUE_PENALTY * issues.len() as i32).clamp(0, 100) as u8;
    FactCheck {
        status: status_for(score),
        score,
        issues,
        method: AnalysisMethod::Heuristic,
        checked_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attributed_figures_are_verified() {
        let result = check("Officials said 1,200 homes lost power on Monday. Data show 40% were back by noon.");
        assert!(result.issues.is_empty());
        assert_eq!(result.score, 95);
        assert_eq!(result.status, FactCheckStatus::Verified);
    }

    #[test]
    fn test_unattributed_statistic() {
        let issues = find_issues("Power returned to 900 homes. Crews worked overnight.");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].claim, "Power returned to 900 homes.");
        assert_eq!(issues[0].note, "Statistic stated without attribution");
    }

    #[test]
    fn test_truncated_figure_with_attribution_passes() {
        let issues = find_issues("Officials said 1,2…");
        assert!(issues.is_empty());
    }

    #[test]
    fn test_words_outside_the_attribution_list_do_not_count() {
        let issues = find_issues("Officials say 300 lines are down.");
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn test_absolute_wording_and_status() {
        let text = "Everyone lost power. Nobody was warned. Crews never came. It always happens.";
        let result = check(text);
        assert_eq!(result.issues.len(), 4);
        assert_eq!(result.score, 55);
        assert_eq!(result.status, FactCheckStatus::NeedsReview);
    }

    #[test]
    fn test_status_thresholds() {
        assert_eq!(status_for(80), FactCheckStatus::Verified);
        assert_eq!(status_for(79), FactCheckStatus::NeedsReview);
        assert_eq!(status_for(50), FactCheckStatus::NeedsReview);
        assert_eq!(status_for(49), FactCheckStatus::Disputed);
    }
}
