//! Normalization of classifier callback results.
//!
//! Model and pipeline callbacks hand back a `serde_json::Value` in whatever
//! shape the underlying model produces. [`ModelOutput::parse`] tries the
//! known shapes in a fixed order and the first match wins:
//!
//! 1. `null`: no verdict
//! 2. a string: a bare label with no score
//! 3. a two-element array of one string and one number, in either order
//! 4. an object with `label` and `score` (or `confidence`) keys
//! 5. an array of objects: the entry with the highest score, or the first
//!    entry when none carries a score
//! 6. a number: a score with no label
//!
//! Anything else yields an empty output.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelOutput {
    pub label: Option<String>,
    pub score: Option<f64>,
}

impl ModelOutput {
    pub fn new(label: impl Into<String>, score: f64) -> Self {
        Self {
            label: Some(label.into()),
            score: Some(score),
        }
    }

    pub fn parse(value: &Value) -> Self {
        match value {
            Value::Null => Self::default(),
            Value::String(label) => Self {
                label: Some(label.clone()),
                score: None,
            },
            Value::Array(items) => {
                if let Some(pair) = Self::parse_pair(items) {
                    pair
                } else if let [inner @ Value::Array(_)] = items.as_slice() {
                    // Batched pipelines wrap a single result list
                    Self::parse(inner)
                } else {
                    Self::parse_ranked(items)
                }
            }
            Value::Object(_) => Self::parse_object(value),
            Value::Number(n) => Self {
                label: None,
                score: n.as_f64(),
            },
            Value::Bool(_) => Self::default(),
        }
    }

    /// `("SPAM", 0.9)` or `(0.9, "SPAM")`
    fn parse_pair(items: &[Value]) -> Option<Self> {
        match items {
            [Value::String(label), Value::Number(score)]
            | [Value::Number(score), Value::String(label)] => Some(Self {
                label: Some(label.clone()),
                score: score.as_f64(),
            }),
            _ => None,
        }
    }

    fn parse_object(value: &Value) -> Self {
        let label = value
            .get("label")
            .and_then(Value::as_str)
            .map(str::to_string);
        let score = value
            .get("score")
            .or_else(|| value.get("confidence"))
            .and_then(score_of);
        Self { label, score }
    }

    fn parse_ranked(items: &[Value]) -> Self {
        let candidates: Vec<Self> = items
            .iter()
            .filter(|item| item.is_object())
            .map(Self::parse_object)
            .collect();

        let mut best: Option<&Self> = None;
        for candidate in &candidates {
            let Some(score) = candidate.score else {
                continue;
            };
            // Strictly greater: ties keep the earlier entry
            if best.and_then(|b| b.score).map_or(true, |top| score > top) {
                best = Some(candidate);
            }
        }

        best.or_else(|| candidates.first())
            .cloned()
            .unwrap_or_default()
    }

    /// Label equals "SPAM" ignoring case.
    pub fn is_spam_label(&self) -> bool {
        self.label
            .as_deref()
            .map(|l| l.to_uppercase() == "SPAM")
            .unwrap_or(false)
    }
}

fn score_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|s| !s.is_nan())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tuple_in_either_order() {
        assert_eq!(
            ModelOutput::parse(&json!(["SPAM", 0.6])),
            ModelOutput::new("SPAM", 0.6)
        );
        assert_eq!(
            ModelOutput::parse(&json!([0.6, "SPAM"])),
            ModelOutput::new("SPAM", 0.6)
        );
    }

    #[test]
    fn test_object_shapes() {
        assert_eq!(
            ModelOutput::parse(&json!({"label": "ham", "score": 0.2})),
            ModelOutput::new("ham", 0.2)
        );
        assert_eq!(
            ModelOutput::parse(&json!({"label": "spam", "score": "0.75"})),
            ModelOutput::new("spam", 0.75)
        );
        assert_eq!(
            ModelOutput::parse(&json!({"label": "x", "confidence": 0.4})),
            ModelOutput::new("x", 0.4)
        );
    }

    #[test]
    fn test_ranked_list_takes_highest_score() {
        let value = json!([
            {"label": "HAM", "score": 0.3},
            {"label": "SPAM", "score": 0.7},
            {"label": "OTHER", "score": 0.7},
        ]);
        assert_eq!(ModelOutput::parse(&value), ModelOutput::new("SPAM", 0.7));

        let nested = json!([[{"label": "HAM", "score": 0.1}, {"label": "SPAM", "score": 0.9}]]);
        assert_eq!(ModelOutput::parse(&nested), ModelOutput::new("SPAM", 0.9));
    }

    #[test]
    fn test_ranked_list_without_scores_takes_first() {
        let value = json!([{"label": "HAM"}, {"label": "SPAM"}]);
        let output = ModelOutput::parse(&value);
        assert_eq!(output.label.as_deref(), Some("HAM"));
        assert_eq!(output.score, None);
    }

    #[test]
    fn test_bare_and_empty_shapes() {
        let bare = ModelOutput::parse(&json!("SPAM"));
        assert!(bare.is_spam_label());
        assert_eq!(bare.score, None);

        assert_eq!(ModelOutput::parse(&Value::Null), ModelOutput::default());
        assert_eq!(ModelOutput::parse(&json!([])), ModelOutput::default());
        assert_eq!(ModelOutput::parse(&json!(true)), ModelOutput::default());
        assert_eq!(ModelOutput::parse(&json!(0.5)).score, Some(0.5));
    }

    #[test]
    fn test_spam_label_is_case_insensitive() {
        assert!(ModelOutput::new("spam", 1.0).is_spam_label());
        assert!(!ModelOutput::new("spammy", 1.0).is_spam_label());
        assert!(!ModelOutput::default().is_spam_label());
    }
}
