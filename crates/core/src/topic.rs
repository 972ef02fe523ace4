//! Topic and FAQ Models
//!
//! Wire representations of the lessons served by the topic API. Every struct
//! here is read-only from the player's point of view: a topic is replaced
//! wholesale each time it is fetched.

use serde::{Deserialize, Deserializer, Serialize};

/// Video played behind the narration when a topic does not name its own clip.
pub const DEFAULT_AVATAR_VIDEO: &str = "/static/media/avatar_loop.mp4";

/// Minimal topic info returned by the list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicSummary {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    pub title: String,
    pub language: String,
}

/// A FAQ reference as nested inside a topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaqSummary {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    pub question: String,
    #[serde(default)]
    pub answer_audio_url: Option<String>,
}

/// A full topic, including the FAQs attached to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    pub title: String,
    pub language: String,
    #[serde(default)]
    pub content_text: String,
    #[serde(default)]
    pub avatar_video_url: Option<String>,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub faqs: Vec<FaqSummary>,
}

impl Topic {
    /// The clip to loop behind the narration.
    pub fn video_url<'a>(&'a self, fallback: &'a str) -> &'a str {
        non_empty(self.avatar_video_url.as_deref()).unwrap_or(fallback)
    }

    /// The narration clip, if the topic has one.
    pub fn narration_url(&self) -> Option<&str> {
        non_empty(self.audio_url.as_deref())
    }

    /// Short badge text for this topic's language.
    pub fn language_label(&self) -> String {
        language_label(&self.language)
    }
}

impl TopicSummary {
    pub fn language_label(&self) -> String {
        language_label(&self.language)
    }
}

/// A FAQ answer as returned by the FAQ endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Faq {
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    pub question: String,
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub answer_audio_url: Option<String>,
    #[serde(default)]
    pub topic_id: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

impl Faq {
    pub fn narration_url(&self) -> Option<&str> {
        non_empty(self.answer_audio_url.as_deref())
    }
}

/// Maps a language code to the badge shown next to a topic.
///
/// Known codes get a fixed label; anything else is shown uppercased.
pub fn language_label(code: &str) -> String {
    match code {
        "en" => "EN".to_string(),
        "hi" => "हिं".to_string(),
        "mixed" => "EN/हिं".to_string(),
        other => other.to_uppercase(),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

// The API hands out opaque string ids, but numeric ids are normalized too.
fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}
