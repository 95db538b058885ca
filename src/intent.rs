//! Business-intent classification.
//!
//! An optional pipeline callback produces a raw label and confidence; without
//! one, built-in keyword rules are used. Two overrides are applied on top of
//! either source: quote/pricing wording forces `sales_inquiry`, and a bare
//! greeting with low confidence forces `other`. Neither changes the
//! confidence number.

use crate::model_output::ModelOutput;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Confidence below which a greeting-only message is reclassified as `other`.
pub const GENERIC_FALLBACK_THRESHOLD: f64 = 0.5;

lazy_static! {
    static ref QUOTE_REGEX: Regex =
        Regex::new(r"(?i)(報價|詢價|價格|價錢|費用|quot(e|ation)|pricing|price\s*list)").unwrap();
    static ref PUNCTUATION: Regex = Regex::new(r"[\p{P}\p{S}\s]+").unwrap();
    static ref KEYWORD_MATCHERS: Vec<(IntentLabel, Vec<Regex>)> = KEYWORD_RULES
        .iter()
        .map(|(label, words)| (*label, words.iter().map(|w| keyword_regex(w)).collect()))
        .collect();
}

const GREETINGS: &[&str] = &[
    "hi", "hello", "hey", "hiya", "hithere", "hellothere", "ok", "thanks", "thx", "test", "你好",
    "您好", "哈囉", "嗨", "謝謝", "測試",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentLabel {
    SalesInquiry,
    SupportRequest,
    Complaint,
    PolicyQuestion,
    ProfileChange,
    Other,
    Unknown,
}

impl IntentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentLabel::SalesInquiry => "sales_inquiry",
            IntentLabel::SupportRequest => "support_request",
            IntentLabel::Complaint => "complaint",
            IntentLabel::PolicyQuestion => "policy_question",
            IntentLabel::ProfileChange => "profile_change",
            IntentLabel::Other => "other",
            IntentLabel::Unknown => "unknown",
        }
    }

    /// Accepts the English names and the Traditional Chinese ones.
    /// Unrecognized labels are `Other`.
    pub fn parse(label: &str) -> Self {
        let normalized = label.trim().to_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "sales_inquiry" | "sales" | "業務接洽或報價" => IntentLabel::SalesInquiry,
            "support_request" | "support" | "請求技術支援" => IntentLabel::SupportRequest,
            "complaint" | "投訴與抱怨" => IntentLabel::Complaint,
            "policy_question" | "詢問流程或規則" => IntentLabel::PolicyQuestion,
            "profile_change" | "資料異動" => IntentLabel::ProfileChange,
            "unknown" => IntentLabel::Unknown,
            _ => IntentLabel::Other,
        }
    }

    /// Key the external action dispatcher uses for this intent.
    pub fn action_name(&self) -> &'static str {
        match self {
            IntentLabel::SalesInquiry => "send_quote",
            IntentLabel::SupportRequest => "create_support_ticket",
            IntentLabel::Complaint => "reply_apology",
            IntentLabel::PolicyQuestion => "reply_faq",
            IntentLabel::ProfileChange => "apply_info_change",
            IntentLabel::Other => "reply_general",
            IntentLabel::Unknown => "manual_review",
        }
    }
}

impl fmt::Display for IntentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentResult {
    pub label: IntentLabel,
    pub confidence: f64,
}

impl IntentResult {
    pub fn unknown() -> Self {
        Self {
            label: IntentLabel::Unknown,
            confidence: 0.0,
        }
    }
}

/// Classifier callback: text in, any supported result shape out.
pub type Pipeline = Box<dyn Fn(&str) -> anyhow::Result<Value> + Send + Sync>;

enum Backend {
    Keywords,
    Pipeline(Pipeline),
    Unavailable(String),
}

pub struct IntentClassifier {
    backend: Backend,
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl IntentClassifier {
    /// Built-in keyword rules only.
    pub fn new() -> Self {
        Self {
            backend: Backend::Keywords,
        }
    }

    pub fn with_pipeline(pipeline: Pipeline) -> Self {
        Self {
            backend: Backend::Pipeline(pipeline),
        }
    }

    /// Build the pipeline with `loader`. A loader error is kept and every
    /// later `classify` call answers `unknown` with zero confidence.
    pub fn from_loader<F>(loader: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<Pipeline>,
    {
        match loader() {
            Ok(pipeline) => Self::with_pipeline(pipeline),
            Err(e) => {
                log::warn!("Intent model failed to load: {e:#}");
                Self {
                    backend: Backend::Unavailable(format!("{e:#}")),
                }
            }
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self.backend, Backend::Unavailable(_))
    }

    pub fn classify(&self, subject: &str, content: &str) -> IntentResult {
        let (label, confidence) = match &self.backend {
            Backend::Keywords => keyword_intent(subject, content),
            Backend::Pipeline(pipeline) => {
                let text = format!("{subject}\n{content}");
                match pipeline(&text) {
                    Ok(raw) => match normalize_pipeline_output(&raw) {
                        Some(parsed) => parsed,
                        None => return IntentResult::unknown(),
                    },
                    Err(e) => {
                        log::warn!("Intent pipeline failed: {e:#}");
                        return IntentResult::unknown();
                    }
                }
            }
            Backend::Unavailable(reason) => {
                log::debug!("Intent model unavailable: {reason}");
                return IntentResult::unknown();
            }
        };

        apply_overrides(subject, content, label, confidence)
    }
}

/// Pipeline result as `(label, confidence)`. A bare label counts as fully
/// confident; a missing label means no answer.
fn normalize_pipeline_output(raw: &Value) -> Option<(IntentLabel, f64)> {
    let output = ModelOutput::parse(raw);
    let label = output.label?;
    let confidence = output.score.unwrap_or(1.0).clamp(0.0, 1.0);
    Some((IntentLabel::parse(&label), confidence))
}

fn apply_overrides(subject: &str, content: &str, label: IntentLabel, confidence: f64) -> IntentResult {
    let mut label = label;

    if QUOTE_REGEX.is_match(subject) || QUOTE_REGEX.is_match(content) {
        if label != IntentLabel::SalesInquiry {
            log::debug!("Quote wording found, relabeling {label} as sales_inquiry");
        }
        label = IntentLabel::SalesInquiry;
    } else if is_generic(subject) && is_generic(content) && confidence < GENERIC_FALLBACK_THRESHOLD
    {
        label = IntentLabel::Other;
    }

    IntentResult { label, confidence }
}

/// Empty, a single character, or a plain greeting once punctuation and
/// whitespace are gone.
fn is_generic(text: &str) -> bool {
    let stripped = PUNCTUATION.replace_all(&text.to_lowercase(), "").into_owned();
    stripped.chars().count() <= 1 || GREETINGS.contains(&stripped.as_str())
}

const KEYWORD_RULES: &[(IntentLabel, &[&str])] = &[
    (
        IntentLabel::Complaint,
        &["投訴", "抱怨", "客訴", "不滿", "退款", "complaint", "refund", "disappointed", "unacceptable"],
    ),
    (
        IntentLabel::SupportRequest,
        &["技術支援", "故障", "錯誤", "無法", "當機", "bug", "error", "crash", "not working", "support"],
    ),
    (
        IntentLabel::ProfileChange,
        &["資料異動", "變更", "修改資料", "更新地址", "change my", "update my", "address change"],
    ),
    (
        IntentLabel::PolicyQuestion,
        &["規則", "流程", "政策", "規定", "條款", "policy", "terms", "procedure", "regulation"],
    ),
    (
        IntentLabel::SalesInquiry,
        &["合作", "採購", "方案", "業務", "purchase", "partnership", "proposal", "order", "quote"],
    ),
];

/// ASCII keywords must stand alone ("order" is not in "border"). CJK
/// keywords match anywhere since the script has no word separators.
fn keyword_regex(word: &str) -> Regex {
    let escaped = regex::escape(word);
    let pattern = if word.is_ascii() {
        format!("(?:^|[^a-z0-9]){escaped}(?:[^a-z0-9]|$)")
    } else {
        escaped
    };
    Regex::new(&pattern).unwrap()
}

/// The label with the most keyword hits wins; ties go to the earlier rule.
fn keyword_intent(subject: &str, content: &str) -> (IntentLabel, f64) {
    let text = format!("{subject}\n{content}").to_lowercase();

    let mut best = (IntentLabel::Other, 0usize);
    for (label, words) in KEYWORD_MATCHERS.iter() {
        let hits = words.iter().filter(|w| w.is_match(&text)).count();
        if hits > best.1 {
            best = (*label, hits);
        }
    }

    let confidence = match best.1 {
        0 => 0.3,
        1 => 0.6,
        2 => 0.75,
        3 => 0.9,
        _ => 0.95,
    };
    (best.0, confidence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pipeline_returning(value: Value) -> IntentClassifier {
        IntentClassifier::with_pipeline(Box::new(move |_: &str| {
            Ok::<Value, anyhow::Error>(value.clone())
        }))
    }

    #[test]
    fn test_keyword_rules() {
        let classifier = IntentClassifier::new();

        let result = classifier.classify("系統當機", "登入時出現錯誤，無法使用");
        assert_eq!(result.label, IntentLabel::SupportRequest);
        assert!(result.confidence >= GENERIC_FALLBACK_THRESHOLD);

        let result = classifier.classify("Complaint", "I want a refund, this is unacceptable");
        assert_eq!(result.label, IntentLabel::Complaint);
        assert_eq!(result.confidence, 0.9);
    }

    #[test]
    fn test_ascii_keywords_need_word_boundaries() {
        let classifier = IntentClassifier::new();

        let result = classifier.classify("Border crossing", "News on the war on terror");
        assert_eq!(result.label, IntentLabel::Other);
        assert_eq!(result.confidence, 0.3);

        let result = classifier.classify("", "Please process my order.");
        assert_eq!(result.label, IntentLabel::SalesInquiry);
        assert_eq!(result.confidence, 0.6);

        let result = classifier.classify("系統error", "");
        assert_eq!(result.label, IntentLabel::SupportRequest);
    }

    #[test]
    fn test_no_keywords_is_other() {
        let result = IntentClassifier::new().classify("Lunch", "See you at noon tomorrow");
        assert_eq!(result.label, IntentLabel::Other);
        assert_eq!(result.confidence, 0.3);
    }

    #[test]
    fn test_quote_override_keeps_confidence() {
        let classifier = pipeline_returning(json!({"label": "complaint", "score": 0.82}));
        let result = classifier.classify("想詢問報價", "請提供價格");
        assert_eq!(result.label, IntentLabel::SalesInquiry);
        assert_eq!(result.confidence, 0.82);

        let result = IntentClassifier::new().classify("Need a quotation", "");
        assert_eq!(result.label, IntentLabel::SalesInquiry);
    }

    #[test]
    fn test_generic_greeting_fallback() {
        let classifier = pipeline_returning(json!([{"label": "support_request", "score": 0.41}]));
        let result = classifier.classify("Hi", "hello!");
        assert_eq!(result.label, IntentLabel::Other);
        assert_eq!(result.confidence, 0.41);

        // Confident answers are left alone
        let classifier = pipeline_returning(json!(["support_request", 0.5]));
        let result = classifier.classify("hi", "");
        assert_eq!(result.label, IntentLabel::SupportRequest);

        // Real content is left alone
        let classifier = pipeline_returning(json!(["support_request", 0.2]));
        let result = classifier.classify("hi", "the export button crashes");
        assert_eq!(result.label, IntentLabel::SupportRequest);
    }

    #[test]
    fn test_pipeline_shapes() {
        let result = pipeline_returning(json!("資料異動")).classify("a", "b c d e");
        assert_eq!(result.label, IntentLabel::ProfileChange);
        assert_eq!(result.confidence, 1.0);

        let result = pipeline_returning(json!([0.7, "policy_question"])).classify("q", "rules?");
        assert_eq!(result.label, IntentLabel::PolicyQuestion);
        assert_eq!(result.confidence, 0.7);

        let result = pipeline_returning(json!({"label": "LABEL_9", "score": 0.9})).classify("x", "yyyy");
        assert_eq!(result.label, IntentLabel::Other);
    }

    #[test]
    fn test_pipeline_failures_are_unknown() {
        let classifier = IntentClassifier::with_pipeline(Box::new(|_: &str| -> anyhow::Result<Value> {
            anyhow::bail!("boom")
        }));
        assert_eq!(classifier.classify("報價", "x"), IntentResult::unknown());

        assert_eq!(
            pipeline_returning(Value::Null).classify("hello", "there"),
            IntentResult::unknown()
        );

        let classifier = IntentClassifier::from_loader(|| anyhow::bail!("model file missing"));
        assert!(!classifier.is_available());
        assert_eq!(classifier.classify("報價", ""), IntentResult::unknown());
    }

    #[test]
    fn test_label_parsing_and_actions() {
        assert_eq!(IntentLabel::parse("業務接洽或報價"), IntentLabel::SalesInquiry);
        assert_eq!(IntentLabel::parse("Sales Inquiry"), IntentLabel::SalesInquiry);
        assert_eq!(IntentLabel::parse("其他"), IntentLabel::Other);
        assert_eq!(IntentLabel::SalesInquiry.action_name(), "send_quote");
        assert_eq!(
            serde_json::to_value(IntentLabel::PolicyQuestion).unwrap(),
            json!("policy_question")
        );
    }

    #[test]
    fn test_is_generic() {
        assert!(is_generic(""));
        assert!(is_generic("  Hello!!  "));
        assert!(is_generic("您好～"));
        assert!(is_generic("ok"));
        assert!(is_generic("?"));
        assert!(!is_generic("退款"));
        assert!(!is_generic("invoice attached"));
    }
}
