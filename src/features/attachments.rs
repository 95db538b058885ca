use super::{FeatureExtractor, FeatureScore};
use crate::config::{RuleSet, Weights};
use crate::domain_utils::DomainUtils;
use crate::email::EmailMessage;

pub struct AttachmentAnalyzer;

impl FeatureExtractor for AttachmentAnalyzer {
    fn extract(&self, rules: &RuleSet, email: &EmailMessage) -> FeatureScore {
        check_attachments(rules, &email.attachments)
    }

    fn name(&self) -> &str {
        "attachments"
    }
}

pub fn check_attachments(rules: &RuleSet, attachments: &[String]) -> FeatureScore {
    let mut score = FeatureScore::default();

    for filename in attachments {
        if let Some(ext) = DomainUtils::extract_extension(filename) {
            if rules.bad_extensions.contains(&ext) {
                score.add(
                    Weights::points(rules.weights.attachment_executable),
                    format!("attachment:{ext}"),
                );
            }
        }
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dangerous_files() {
        let rules = RuleSet::default();
        let files = vec![
            "invoice.pdf".to_string(),
            "Invoice.PDF.EXE".to_string(),
            "setup.msi".to_string(),
            "noext".to_string(),
        ];
        let score = check_attachments(&rules, &files);
        assert_eq!(score.points, 10);
        assert_eq!(score.reasons, vec!["attachment:.exe", "attachment:.msi"]);
    }

    #[test]
    fn test_no_attachments() {
        assert_eq!(
            check_attachments(&RuleSet::default(), &[]),
            FeatureScore::default()
        );
    }
}
