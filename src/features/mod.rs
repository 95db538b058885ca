pub mod attachments;
pub mod keywords;
pub mod links;
pub mod sender;

use crate::config::{RuleSet, Thresholds};
use crate::domain_utils::DomainUtils;
use crate::email::EmailMessage;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use attachments::check_attachments;
pub use keywords::check_keywords;
pub use links::{check_urls, extract_urls};
pub use sender::check_sender;

/// Points and reason tags contributed by one scorer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureScore {
    pub points: i64,
    pub reasons: Vec<String>,
}

impl FeatureScore {
    pub fn add(&mut self, points: i64, reason: String) {
        self.points = self.points.saturating_add(points);
        self.reasons.push(reason);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpamLabel {
    Legit,
    Suspect,
    Spam,
}

impl SpamLabel {
    /// Both boundaries are inclusive.
    pub fn from_score(score: i64, thresholds: &Thresholds) -> Self {
        if score >= thresholds.spam {
            SpamLabel::Spam
        } else if score >= thresholds.suspect {
            SpamLabel::Suspect
        } else {
            SpamLabel::Legit
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SpamLabel::Legit => "legit",
            SpamLabel::Suspect => "suspect",
            SpamLabel::Spam => "spam",
        }
    }
}

impl fmt::Display for SpamLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub label: SpamLabel,
    pub score: i64,
    /// In scorer order: sender, keywords, URLs, attachments
    pub reasons: Vec<String>,
    /// Sender domain is on the whitelist
    pub whitelisted: bool,
}

impl ScoreResult {
    /// Raw points scaled into `[0, 1]` against the spam threshold.
    pub fn normalized(&self, thresholds: &Thresholds) -> f64 {
        if self.score <= 0 {
            return 0.0;
        }
        if thresholds.spam <= 0 {
            return 1.0;
        }
        (self.score as f64 / thresholds.spam as f64).clamp(0.0, 1.0)
    }
}

pub trait FeatureExtractor: Send + Sync {
    fn extract(&self, rules: &RuleSet, email: &EmailMessage) -> FeatureScore;
    fn name(&self) -> &str;
}

pub struct FeatureEngine {
    extractors: Vec<Box<dyn FeatureExtractor>>,
}

impl Default for FeatureEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureEngine {
    pub fn new() -> Self {
        Self {
            extractors: vec![
                Box::new(sender::SenderAnalyzer),
                Box::new(keywords::KeywordAnalyzer),
                Box::new(links::LinkAnalyzer),
                Box::new(attachments::AttachmentAnalyzer),
            ],
        }
    }

    pub fn extractor_names(&self) -> Vec<&str> {
        self.extractors.iter().map(|e| e.name()).collect()
    }

    pub fn analyze(&self, rules: &RuleSet, email: &EmailMessage) -> ScoreResult {
        let mut score: i64 = 0;
        let mut reasons = Vec::new();

        for extractor in &self.extractors {
            let feature = extractor.extract(rules, email);
            if feature.points != 0 {
                log::debug!(
                    "{}: {} points ({})",
                    extractor.name(),
                    feature.points,
                    feature.reasons.join(", ")
                );
            }
            score = score.saturating_add(feature.points);
            reasons.extend(feature.reasons);
        }

        let label = SpamLabel::from_score(score, &rules.thresholds);

        ScoreResult {
            label,
            score,
            reasons,
            whitelisted: is_whitelisted(rules, &email.sender),
        }
    }
}

pub(crate) fn is_whitelisted(rules: &RuleSet, sender: &str) -> bool {
    DomainUtils::extract_domain(sender)
        .map(|domain| DomainUtils::matches_domain_list(&domain, &rules.whitelist_domains))
        .unwrap_or(false)
}

/// Score an email against `rules` with the standard scorer chain.
pub fn label_email(rules: &RuleSet, email: &EmailMessage) -> ScoreResult {
    FeatureEngine::new().analyze(rules, email)
}
