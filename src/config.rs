use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Upper bound for a single keyword or weight
pub const MAX_POINTS: i64 = 1000;

/// Spam-detection policy loaded from the rule file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    /// Keyword (matched case-insensitively) to points
    pub keywords: BTreeMap<String, i64>,
    pub suspicious_domains: Vec<String>,
    /// TLDs without the leading dot
    pub suspicious_tlds: Vec<String>,
    /// Extensions with the leading dot
    pub bad_extensions: Vec<String>,
    pub whitelist_domains: Vec<String>,
    pub weights: Weights,
    pub thresholds: Thresholds,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    pub url_suspicious: f64,
    pub tld_suspicious: f64,
    pub attachment_executable: f64,
    pub sender_tld: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    pub suspect: i64,
    pub spam: i64,
}

/// On-disk shape. Every key is optional and falls back to the default.
#[derive(Debug, Default, Deserialize)]
struct RuleFile {
    keywords: Option<BTreeMap<String, i64>>,
    suspicious_domains: Option<Vec<String>>,
    suspicious_tlds: Option<Vec<String>>,
    bad_extensions: Option<Vec<String>>,
    whitelist_domains: Option<Vec<String>>,
    weights: Option<WeightsFile>,
    thresholds: Option<ThresholdsFile>,
}

#[derive(Debug, Default, Deserialize)]
struct WeightsFile {
    url_suspicious: Option<f64>,
    tld_suspicious: Option<f64>,
    attachment_executable: Option<f64>,
    sender_tld: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct ThresholdsFile {
    suspect: Option<i64>,
    spam: Option<i64>,
}

impl Weights {
    /// Weight rounded to whole points
    pub fn points(weight: f64) -> i64 {
        weight.round() as i64
    }
}

impl Default for Weights {
    fn default() -> Self {
        Weights {
            url_suspicious: 3.0,
            tld_suspicious: 2.0,
            attachment_executable: 5.0,
            sender_tld: 2.0,
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            suspect: 4,
            spam: 8,
        }
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        let keywords = [
            ("FREE", 3),
            ("WINNER", 3),
            ("URGENT", 2),
            ("CLICK HERE", 2),
            ("BITCOIN", 3),
            ("VIAGRA", 4),
            ("免費", 3),
            ("中獎", 4),
            ("限時", 2),
            ("點擊", 2),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        RuleSet {
            keywords,
            suspicious_domains: strings(&["bit.ly", "tinyurl.com", "t.co", "goo.gl", "is.gd"]),
            suspicious_tlds: strings(&["tk", "ml", "ga", "cf", "gq", "xyz", "top"]),
            bad_extensions: strings(&[
                ".exe", ".scr", ".bat", ".cmd", ".com", ".pif", ".vbs", ".js", ".jar", ".msi",
            ]),
            whitelist_domains: Vec::new(),
            weights: Weights::default(),
            thresholds: Thresholds::default(),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl RuleSet {
    /// Parse YAML (or JSON) rule text. Empty documents are an error so the
    /// loader can fall back to defaults.
    pub fn from_yaml_str(content: &str) -> anyhow::Result<Self> {
        if content.trim().is_empty() {
            anyhow::bail!("rule file is empty");
        }
        let file: Option<RuleFile> = serde_yaml::from_str(content)?;
        let file = file.context("rule file contains no mapping")?;

        let rules = Self::from_rule_file(file);
        rules.validate()?;
        Ok(rules)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read rule file {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("invalid rule file {}", path.display()))
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// `thresholds.spam >= thresholds.suspect >= 0`, and every keyword and
    /// weight is a finite number of points in `0..=MAX_POINTS`.
    pub fn validate(&self) -> anyhow::Result<()> {
        let Thresholds { suspect, spam } = self.thresholds;
        if suspect < 0 {
            anyhow::bail!("thresholds.suspect must be >= 0, got {suspect}");
        }
        if spam < suspect {
            anyhow::bail!("thresholds.spam ({spam}) must be >= thresholds.suspect ({suspect})");
        }

        for (word, points) in &self.keywords {
            if !(0..=MAX_POINTS).contains(points) {
                anyhow::bail!("keyword {word:?} has {points} points, expected 0..={MAX_POINTS}");
            }
        }

        let weights = [
            ("url_suspicious", self.weights.url_suspicious),
            ("tld_suspicious", self.weights.tld_suspicious),
            ("attachment_executable", self.weights.attachment_executable),
            ("sender_tld", self.weights.sender_tld),
        ];
        for (name, weight) in weights {
            if !weight.is_finite() || weight < 0.0 || weight > MAX_POINTS as f64 {
                anyhow::bail!("weights.{name} is {weight}, expected 0..={MAX_POINTS}");
            }
        }
        Ok(())
    }

    fn from_rule_file(file: RuleFile) -> Self {
        let defaults = RuleSet::default();
        let weights = file.weights.unwrap_or_default();
        let thresholds = file.thresholds.unwrap_or_default();

        RuleSet {
            keywords: file
                .keywords
                .map(|k| {
                    k.into_iter()
                        .filter(|(word, _)| !word.trim().is_empty())
                        .collect()
                })
                .unwrap_or(defaults.keywords),
            suspicious_domains: file
                .suspicious_domains
                .map(|d| normalize_list(d, |s| s.trim_start_matches('.').to_string()))
                .unwrap_or(defaults.suspicious_domains),
            suspicious_tlds: file
                .suspicious_tlds
                .map(|t| normalize_list(t, |s| s.trim_start_matches('.').to_string()))
                .unwrap_or(defaults.suspicious_tlds),
            bad_extensions: file
                .bad_extensions
                .map(|e| normalize_list(e, |s| format!(".{}", s.trim_start_matches('.'))))
                .unwrap_or(defaults.bad_extensions),
            whitelist_domains: file
                .whitelist_domains
                .map(|d| normalize_list(d, |s| s.trim_start_matches('.').to_string()))
                .unwrap_or(defaults.whitelist_domains),
            weights: Weights {
                url_suspicious: weights
                    .url_suspicious
                    .unwrap_or(defaults.weights.url_suspicious),
                tld_suspicious: weights
                    .tld_suspicious
                    .unwrap_or(defaults.weights.tld_suspicious),
                attachment_executable: weights
                    .attachment_executable
                    .unwrap_or(defaults.weights.attachment_executable),
                sender_tld: weights.sender_tld.unwrap_or(defaults.weights.sender_tld),
            },
            thresholds: Thresholds {
                suspect: thresholds.suspect.unwrap_or(defaults.thresholds.suspect),
                spam: thresholds.spam.unwrap_or(defaults.thresholds.spam),
            },
        }
    }
}

/// Lowercase, trim, apply `shape`, drop empties and duplicates (first wins).
fn normalize_list(items: Vec<String>, shape: impl Fn(&str) -> String) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let item = item.trim().to_lowercase();
        if item.trim_matches('.').is_empty() {
            continue;
        }
        let item = shape(&item);
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds() {
        let rules = RuleSet::default();
        assert_eq!(rules.thresholds.suspect, 4);
        assert_eq!(rules.thresholds.spam, 8);
        assert!(rules.validate().is_ok());
    }

    #[test]
    fn test_parse_yaml_and_normalize() {
        let yaml = r#"
keywords:
  FREE: 3
suspicious_domains: ["Bit.ly"]
suspicious_tlds: [".TK", "ml"]
bad_extensions: ["EXE", ".scr"]
weights:
  url_suspicious: 4
  tld_suspicious: 3
  attachment_executable: 5
thresholds:
  suspect: 4
  spam: 8
"#;
        let rules = RuleSet::from_yaml_str(yaml).unwrap();
        assert_eq!(rules.keywords.get("FREE"), Some(&3));
        assert_eq!(rules.suspicious_domains, vec!["bit.ly"]);
        assert_eq!(rules.suspicious_tlds, vec!["tk", "ml"]);
        assert_eq!(rules.bad_extensions, vec![".exe", ".scr"]);
        assert_eq!(rules.weights.url_suspicious, 4.0);
        // Not in the file, so the default survives
        assert_eq!(rules.weights.sender_tld, 2.0);
        assert!(rules.whitelist_domains.is_empty());
    }

    #[test]
    fn test_parse_json_compatible() {
        let json = r#"{"keywords": {"win": 2}, "thresholds": {"suspect": 1, "spam": 2}}"#;
        let rules = RuleSet::from_yaml_str(json).unwrap();
        assert_eq!(rules.keywords.len(), 1);
        assert_eq!(rules.thresholds.spam, 2);
        assert_eq!(rules.suspicious_tlds, RuleSet::default().suspicious_tlds);
    }

    #[test]
    fn test_invalid_documents() {
        assert!(RuleSet::from_yaml_str("").is_err());
        assert!(RuleSet::from_yaml_str("   \n").is_err());
        assert!(RuleSet::from_yaml_str("keywords: [unclosed").is_err());
        assert!(RuleSet::from_yaml_str("- just\n- a list\n").is_err());
        assert!(RuleSet::from_yaml_str("thresholds: {suspect: 9, spam: 3}").is_err());
        assert!(RuleSet::from_yaml_str("thresholds: {suspect: -1, spam: 3}").is_err());
    }

    #[test]
    fn test_out_of_range_points_rejected() {
        assert!(RuleSet::from_yaml_str("weights: {url_suspicious: .inf}").is_err());
        assert!(RuleSet::from_yaml_str("weights: {tld_suspicious: .nan}").is_err());
        assert!(RuleSet::from_yaml_str("weights: {sender_tld: 1e300}").is_err());
        assert!(RuleSet::from_yaml_str("keywords: {FREE: 9223372036854775807}").is_err());

        let at_bound = format!("keywords: {{FREE: {MAX_POINTS}}}\nweights: {{url_suspicious: {MAX_POINTS}}}");
        assert!(RuleSet::from_yaml_str(&at_bound).is_ok());
    }

    #[test]
    fn test_negative_points_rejected() {
        assert!(RuleSet::from_yaml_str("keywords: {FREE: 3, meeting: -10}").is_err());
        assert!(RuleSet::from_yaml_str("weights: {attachment_executable: -5}").is_err());
        assert!(RuleSet::from_yaml_str("keywords: {FREE: 0}\nweights: {sender_tld: 0}").is_ok());
    }

    #[test]
    fn test_shipped_rule_file_matches_defaults() {
        let rules = RuleSet::from_file("config/spam_rules.yaml").unwrap();
        assert_eq!(rules, RuleSet::default());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.yaml");
        let rules = RuleSet::default();
        rules.to_file(&path).unwrap();
        assert_eq!(RuleSet::from_file(&path).unwrap(), rules);
    }
}
