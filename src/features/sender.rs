use super::{is_whitelisted, FeatureExtractor, FeatureScore};
use crate::config::{RuleSet, Weights};
use crate::domain_utils::DomainUtils;
use crate::email::EmailMessage;

pub struct SenderAnalyzer;

impl FeatureExtractor for SenderAnalyzer {
    fn extract(&self, rules: &RuleSet, email: &EmailMessage) -> FeatureScore {
        check_sender(rules, &email.sender)
    }

    fn name(&self) -> &str {
        "sender"
    }
}

/// Penalize a sender whose domain sits under a suspicious TLD. Whitelisted
/// sender domains are exempt.
pub fn check_sender(rules: &RuleSet, sender: &str) -> FeatureScore {
    let mut score = FeatureScore::default();

    let Some(domain) = DomainUtils::extract_domain(sender) else {
        return score;
    };
    if is_whitelisted(rules, sender) {
        log::debug!("Sender domain {domain} is whitelisted");
        return score;
    }

    if let Some(tld) = DomainUtils::extract_tld(&domain) {
        if rules.suspicious_tlds.contains(&tld) {
            score.add(
                Weights::points(rules.weights.sender_tld),
                format!("sender-tld:{tld}"),
            );
        }
    }

    score
}
