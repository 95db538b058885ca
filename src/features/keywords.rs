use super::{FeatureExtractor, FeatureScore};
use crate::config::RuleSet;
use crate::email::EmailMessage;

pub struct KeywordAnalyzer;

impl FeatureExtractor for KeywordAnalyzer {
    fn extract(&self, rules: &RuleSet, email: &EmailMessage) -> FeatureScore {
        check_keywords(rules, &email.subject, &email.content)
    }

    fn name(&self) -> &str {
        "keywords"
    }
}

/// Each configured keyword found in the subject or the content adds its
/// points once.
pub fn check_keywords(rules: &RuleSet, subject: &str, content: &str) -> FeatureScore {
    let mut score = FeatureScore::default();
    let subject_lower = subject.to_lowercase();
    let content_lower = content.to_lowercase();

    for (keyword, points) in &rules.keywords {
        let needle = keyword.to_lowercase();
        if needle.is_empty() {
            continue;
        }
        if subject_lower.contains(&needle) || content_lower.contains(&needle) {
            score.add(*points, format!("keyword:{keyword}"));
        }
    }

    score
}
