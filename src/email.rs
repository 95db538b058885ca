use serde::{Deserialize, Serialize};

/// One message to classify. Missing fields deserialize as empty.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailMessage {
    #[serde(deserialize_with = "null_as_empty")]
    pub sender: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub subject: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub content: String,
    #[serde(deserialize_with = "null_as_empty_vec")]
    pub attachments: Vec<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_empty_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let items = Option::<Vec<Option<String>>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(items.into_iter().flatten().collect())
}

impl EmailMessage {
    pub fn new(
        sender: impl Into<String>,
        subject: impl Into<String>,
        content: impl Into<String>,
        attachments: Vec<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            subject: subject.into(),
            content: content.into(),
            attachments,
        }
    }

    /// Build from optional parts; absent fields become empty strings.
    pub fn from_parts(
        sender: Option<&str>,
        subject: Option<&str>,
        content: Option<&str>,
        attachments: Option<&[String]>,
    ) -> Self {
        Self {
            sender: sender.unwrap_or_default().to_string(),
            subject: subject.unwrap_or_default().to_string(),
            content: content.unwrap_or_default().to_string(),
            attachments: attachments.map(<[String]>::to_vec).unwrap_or_default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sender.is_empty()
            && self.subject.is_empty()
            && self.content.is_empty()
            && self.attachments.is_empty()
    }
}
