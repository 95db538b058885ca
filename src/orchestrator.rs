use crate::config::RuleSet;
use crate::email::EmailMessage;
use crate::features::{label_email, SpamLabel};
use crate::model_output::ModelOutput;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionSource {
    Rule,
    Model,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpamAction {
    Drop,
    Review,
    RouteToInbox,
}

impl SpamAction {
    /// Borderline always goes to review, whatever the spam verdict.
    pub fn decide(is_spam: bool, is_borderline: bool) -> Self {
        if is_borderline {
            SpamAction::Review
        } else if is_spam {
            SpamAction::Drop
        } else {
            SpamAction::RouteToInbox
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SpamAction::Drop => "drop",
            SpamAction::Review => "review",
            SpamAction::RouteToInbox => "route_to_inbox",
        }
    }
}

impl fmt::Display for SpamAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestrateResult {
    pub is_spam: bool,
    /// Model said SPAM with a score exactly equal to the threshold
    pub is_borderline: bool,
    pub source: DecisionSource,
    pub action: SpamAction,
    pub rule_value: Value,
    pub model_label: Option<String>,
    pub model_score: Option<f64>,
    pub extra: BTreeMap<String, Value>,
}

impl OrchestrateResult {
    fn new(is_spam: bool, is_borderline: bool, source: DecisionSource, rule_value: Value) -> Self {
        Self {
            is_spam,
            is_borderline,
            source,
            action: SpamAction::decide(is_spam, is_borderline),
            rule_value,
            model_label: None,
            model_score: None,
            extra: BTreeMap::new(),
        }
    }
}

/// Coerce a rule verdict: a bool, or an object carrying `is_spam`. Other
/// values follow JSON truthiness.
pub fn rule_is_spam(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Object(map) => map.get("is_spam").map(rule_is_spam).unwrap_or(false),
        Value::Null => false,
        Value::Number(n) => n.as_f64().map_or(false, |n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
    }
}

/// Combine a rule verdict with a model verdict into one action.
///
/// A positive rule verdict short-circuits: `model_fn` is not called. A
/// failing model leaves the rule's negative verdict standing.
pub fn orchestrate<R, M>(
    text: &str,
    rule_fn: R,
    model_fn: M,
    model_threshold: f64,
) -> OrchestrateResult
where
    R: FnOnce(&str) -> Value,
    M: FnOnce(&str) -> anyhow::Result<Value>,
{
    let rule_value = rule_fn(text);
    if rule_is_spam(&rule_value) {
        log::debug!("Rule verdict is spam, skipping model");
        return OrchestrateResult::new(true, false, DecisionSource::Rule, rule_value);
    }

    let raw = match model_fn(text) {
        Ok(raw) => raw,
        Err(e) => {
            log::warn!("Spam model failed, trusting rule verdict: {e:#}");
            let mut message = format!("{e:?}");
            if message.is_empty() {
                message = "model failed without a message".to_string();
            }
            let mut result =
                OrchestrateResult::new(false, false, DecisionSource::Fallback, rule_value);
            result
                .extra
                .insert("model_error".to_string(), Value::String(message));
            return result;
        }
    };

    let output = ModelOutput::parse(&raw);
    let spam_label = output.is_spam_label();
    let is_spam = spam_label && output.score.map_or(false, |s| s >= model_threshold);
    #[allow(clippy::float_cmp)]
    let is_borderline = spam_label && output.score == Some(model_threshold);

    let mut result = OrchestrateResult::new(is_spam, is_borderline, DecisionSource::Model, rule_value);
    result.model_label = output.label;
    result.model_score = output.score;
    result.extra.insert("model_threshold".to_string(), json!(model_threshold));
    result
}

/// A `rule_fn` backed by the rule engine: the text is scored as message
/// content and counts as spam when it reaches the spam label.
pub fn rule_verdict(rules: &RuleSet) -> impl Fn(&str) -> Value + '_ {
    move |text: &str| {
        let email = EmailMessage::new("", "", text, Vec::new());
        let result = label_email(rules, &email);
        json!({
            "is_spam": result.label == SpamLabel::Spam,
            "label": result.label,
            "score": result.score,
            "reasons": result.reasons,
        })
    }
}
