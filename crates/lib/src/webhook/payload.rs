//! Slack-compatible incoming-webhook payload.

use serde::{Deserialize, Deserializer};

/// Decoded webhook body: `{ "text", "mrkdwn", "channel", "attachments": [...] }`.
#[derive(Debug, Clone, Deserialize)]
pub struct Payload {
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    /// Slack's `mrkdwn` flag; true when absent.
    #[serde(rename = "mrkdwn", default = "default_true", deserialize_with = "null_as_true")]
    pub use_markdown: bool,
    /// Slack's `channel` override; appended to plain-text messages.
    #[serde(rename = "channel", default, deserialize_with = "null_as_default")]
    pub channel_hint: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub attachments: Vec<Attachment>,
}

impl Default for Payload {
    fn default() -> Self {
        Self {
            text: String::new(),
            use_markdown: true,
            channel_hint: String::new(),
            attachments: Vec::new(),
        }
    }
}

impl Payload {
    /// Decode a JSON request body. Missing fields take their defaults.
    pub fn from_json(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }
}

/// One legacy Slack attachment block.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Attachment {
    #[serde(deserialize_with = "null_as_default")]
    pub pretext: String,
    #[serde(deserialize_with = "null_as_default")]
    pub fallback: String,
    #[serde(deserialize_with = "null_as_default")]
    pub author_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub author_link: String,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub title_link: String,
    #[serde(deserialize_with = "null_as_default")]
    pub text: String,
    /// Field names the sender marked as containing markup (`mrkdwn_in`).
    #[serde(rename = "mrkdwn_in", deserialize_with = "null_as_default")]
    pub markdown_fields: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub image_url: String,
    #[serde(deserialize_with = "null_as_default")]
    pub thumb_url: String,
    /// Unix seconds; Slack senders use both numbers and numeric strings.
    #[serde(deserialize_with = "timestamp")]
    pub ts: Option<i64>,
}

impl Attachment {
    /// Descriptive text: `fallback` supersedes `pretext` when set.
    pub fn description(&self) -> &str {
        if self.fallback.is_empty() {
            &self.pretext
        } else {
            &self.fallback
        }
    }

    /// True when the sender listed `field` in `mrkdwn_in`.
    pub fn is_markdown(&self, field: &str) -> bool {
        self.markdown_fields.iter().any(|f| f == field)
    }

    /// True when the attachment renders anything (title link, title, or descriptive text).
    pub fn has_content(&self) -> bool {
        !self.title_link.is_empty() || !self.title.is_empty() || !self.description().is_empty()
    }
}

fn default_true() -> bool {
    true
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_true<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(true))
}

fn timestamp<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Float(f64),
        Text(String),
    }
    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Int(n)) => Some(n),
        Some(Raw::Float(f)) => Some(f as i64),
        Some(Raw::Text(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .map(|f| f as i64),
        None => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_uses_defaults() {
        let p = Payload::from_json(b"{}").unwrap();
        assert!(p.text.is_empty());
        assert!(p.use_markdown);
        assert!(p.channel_hint.is_empty());
        assert!(p.attachments.is_empty());
    }

    #[test]
    fn decodes_slack_field_names() {
        let body = br##"{
            "text": "hello",
            "mrkdwn": false,
            "channel": "#ops",
            "attachments": [{
                "pretext": "p",
                "fallback": "f",
                "author_name": "ci",
                "title": "Build",
                "title_link": "http://ci",
                "mrkdwn_in": ["pretext", "text"],
                "thumb_url": "http://ci/t.png",
                "ts": 1700000000
            }]
        }"##;
        let p = Payload::from_json(body).unwrap();
        assert_eq!(p.text, "hello");
        assert!(!p.use_markdown);
        assert_eq!(p.channel_hint, "#ops");
        let a = &p.attachments[0];
        assert_eq!(a.author_name, "ci");
        assert_eq!(a.title_link, "http://ci");
        assert!(a.is_markdown("pretext"));
        assert!(!a.is_markdown("fallback"));
        assert_eq!(a.ts, Some(1_700_000_000));
    }

    #[test]
    fn nulls_and_string_timestamps_are_tolerated() {
        let body = br#"{"text": null, "mrkdwn": null, "attachments": [{"title": null, "ts": "1700000000.5"}]}"#;
        let p = Payload::from_json(body).unwrap();
        assert!(p.text.is_empty());
        assert!(p.use_markdown);
        assert_eq!(p.attachments[0].ts, Some(1_700_000_000));
    }

    #[test]
    fn malformed_body_is_an_error() {
        assert!(Payload::from_json(b"{\"text\": ").is_err());
        assert!(Payload::from_json(b"[1, 2]").is_err());
    }

    #[test]
    fn fallback_supersedes_pretext() {
        let a = Attachment {
            pretext: "a".into(),
            fallback: "b".into(),
            ..Default::default()
        };
        assert_eq!(a.description(), "b");
        let a = Attachment {
            pretext: "a".into(),
            ..Default::default()
        };
        assert_eq!(a.description(), "a");
    }

    #[test]
    fn empty_attachment_has_no_content() {
        assert!(!Attachment::default().has_content());
        let a = Attachment {
            title: "t".into(),
            ..Default::default()
        };
        assert!(a.has_content());
    }
}
