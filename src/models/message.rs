use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::de::{opt_string_or_number, parse_timestamp, value_to_string};
use super::enums::MessageRole;
use crate::i18n::Language;

/// Id of the synthetic greeting message.
pub const WELCOME_MESSAGE_ID: &str = "welcome";

// ═══════════════════════════════════════════
// Canonical message
// ═══════════════════════════════════════════

/// One transcript entry. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub content: String,
    pub role: MessageRole,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

impl Message {
    pub fn user(content: &str) -> Self {
        Self {
            id: format!("user_{}", Uuid::new_v4()),
            content: content.to_string(),
            role: MessageRole::User,
            timestamp: Utc::now(),
            metadata: None,
        }
    }

    pub fn assistant(content: &str, metadata: Option<MessageMetadata>) -> Self {
        Self {
            id: format!("assistant_{}", Uuid::new_v4()),
            content: content.to_string(),
            role: MessageRole::Assistant,
            timestamp: Utc::now(),
            metadata,
        }
    }

    /// Assistant-role message standing in for a failed reply.
    pub fn error(content: &str) -> Self {
        Self {
            id: format!("error_{}", Uuid::new_v4()),
            content: content.to_string(),
            role: MessageRole::Assistant,
            timestamp: Utc::now(),
            metadata: None,
        }
    }

    pub fn welcome(language: Language) -> Self {
        Self {
            id: WELCOME_MESSAGE_ID.to_string(),
            content: language.welcome_message().to_string(),
            role: MessageRole::Assistant,
            timestamp: Utc::now(),
            metadata: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.id.starts_with("error_")
    }

    pub fn is_welcome(&self) -> bool {
        self.id == WELCOME_MESSAGE_ID
    }

    /// Base64 reply audio, when the backend synthesized speech for this message.
    pub fn speech_audio(&self) -> Option<&SpeechData> {
        self.metadata
            .as_ref()
            .and_then(|m| m.speech_data.as_ref())
            .filter(|s| s.audio_data.is_some())
    }
}

// ═══════════════════════════════════════════
// Metadata
// ═══════════════════════════════════════════

/// Structured extras attached to one assistant reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub next_steps: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speech_data: Option<SpeechData>,
}

impl MessageMetadata {
    /// Normalize a backend metadata object. Unknown keys are dropped,
    /// `null`s read as absent, non-string next steps are stringified.
    /// Returns `None` when nothing useful remains.
    pub fn from_wire(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;

        let quote = obj.get("quote").filter(|v| !v.is_null()).cloned();
        let recommendations = array_field(obj, "recommendations");
        let next_steps = array_field(obj, "next_steps")
            .into_iter()
            .map(|v| match v {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect();
        let speech_data = obj.get("speech_data").and_then(SpeechData::from_wire);

        let metadata = Self {
            quote,
            recommendations,
            next_steps,
            speech_data,
        };
        (!metadata.is_empty()).then_some(metadata)
    }

    pub fn is_empty(&self) -> bool {
        self.quote.is_none()
            && self.recommendations.is_empty()
            && self.next_steps.is_empty()
            && self.speech_data.is_none()
    }
}

fn array_field(obj: &Map<String, Value>, key: &str) -> Vec<Value> {
    match obj.get(key) {
        Some(Value::Array(items)) => items.clone(),
        _ => Vec::new(),
    }
}

/// Synthesized speech returned with a reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeechData {
    /// Base64 audio payload (optionally a `data:` URL).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_data: Option<String>,
    /// Audio format or MIME type, e.g. `mp3` or `audio/mpeg`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcription: Option<String>,
}

impl SpeechData {
    fn from_wire(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let text = |keys: &[&str]| keys.iter().find_map(|k| obj.get(*k).and_then(value_to_string));

        let speech = Self {
            audio_data: text(&["audio_data", "audio"]),
            format: text(&["format", "content_type", "audio_format"]),
            transcription: text(&["transcription", "transcript"]),
        };
        (speech.audio_data.is_some() || speech.transcription.is_some()).then_some(speech)
    }
}

// ═══════════════════════════════════════════
// Wire types
// ═══════════════════════════════════════════

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub lead_id: Option<String>,
    pub conversation_stage: String,
    pub provider: String,
}

/// Reply of the chat and voice endpoints. Text arrives as `response` or
/// `message` depending on the backend version.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub lead_id: Option<String>,
    #[serde(default)]
    pub transcription: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

impl ChatReply {
    pub fn text(&self) -> &str {
        self.response
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or(self.message.as_deref())
            .unwrap_or_default()
    }

    pub fn metadata(&self) -> Option<MessageMetadata> {
        self.metadata.as_ref().and_then(MessageMetadata::from_wire)
    }

    /// What the backend heard, for voice replies.
    pub fn transcription(&self) -> Option<String> {
        self.transcription
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| {
                self.metadata()
                    .and_then(|m| m.speech_data)
                    .and_then(|s| s.transcription)
            })
    }
}

/// Body of `GET /api/chat/history/:leadId`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryResponse {
    #[serde(default)]
    pub history: Option<Vec<HistoryMessage>>,
}

/// One stored message as the backend returns it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryMessage {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub role: Option<String>,
    /// ISO text or a Unix epoch number.
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

impl HistoryMessage {
    /// Convert to a canonical message. Deterministic for the same input so
    /// re-hydrating an unchanged history yields an identical transcript.
    pub fn into_message(self, index: usize) -> Message {
        let role = self
            .role
            .as_deref()
            .and_then(|r| r.trim().to_ascii_lowercase().parse().ok())
            .unwrap_or(MessageRole::Assistant);
        let metadata = match role {
            MessageRole::Assistant => self.metadata.as_ref().and_then(MessageMetadata::from_wire),
            _ => None,
        };

        Message {
            id: self.id.unwrap_or_else(|| format!("history_{index}")),
            content: self.content.unwrap_or_default(),
            role,
            timestamp: self
                .timestamp
                .as_deref()
                .and_then(parse_timestamp)
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reply_prefers_response_over_message() {
        let reply: ChatReply =
            serde_json::from_value(json!({"response": "A", "message": "B"})).unwrap();
        assert_eq!(reply.text(), "A");

        let reply: ChatReply = serde_json::from_value(json!({"message": "B"})).unwrap();
        assert_eq!(reply.text(), "B");

        let reply: ChatReply = serde_json::from_value(json!({"response": "", "message": "B"})).unwrap();
        assert_eq!(reply.text(), "B");
    }

    #[test]
    fn reply_accepts_numeric_lead_id() {
        let reply: ChatReply = serde_json::from_value(json!({"message": "x", "lead_id": 17})).unwrap();
        assert_eq!(reply.lead_id.as_deref(), Some("17"));
    }

    #[test]
    fn metadata_normalizes_nulls_and_mixed_next_steps() {
        let meta = MessageMetadata::from_wire(&json!({
            "quote": {"total": 1200},
            "recommendations": null,
            "next_steps": ["Book a demo", {"step": 2}],
            "unrelated": true
        }))
        .unwrap();
        assert_eq!(meta.quote, Some(json!({"total": 1200})));
        assert!(meta.recommendations.is_empty());
        assert_eq!(meta.next_steps, vec!["Book a demo".to_string(), "{\"step\":2}".to_string()]);
        assert!(meta.speech_data.is_none());
    }

    #[test]
    fn empty_metadata_is_none() {
        assert!(MessageMetadata::from_wire(&json!({"quote": null, "next_steps": []})).is_none());
        assert!(MessageMetadata::from_wire(&json!("not an object")).is_none());
    }

    #[test]
    fn transcription_falls_back_to_speech_data() {
        let reply: ChatReply = serde_json::from_value(json!({
            "message": "Sure",
            "metadata": {"speech_data": {"audio_data": "AAAA", "transcription": "Hi there"}}
        }))
        .unwrap();
        assert_eq!(reply.transcription().as_deref(), Some("Hi there"));
    }

    #[test]
    fn history_message_conversion_is_deterministic() {
        let raw = HistoryMessage {
            id: None,
            content: Some("hello".into()),
            role: Some("USER".into()),
            timestamp: Some("not a date".into()),
            metadata: Some(json!({"quote": 1})),
        };
        let a = raw.clone().into_message(3);
        let b = raw.into_message(3);
        assert_eq!(a, b);
        assert_eq!(a.id, "history_3");
        assert_eq!(a.role, MessageRole::User);
        // Metadata only rides on assistant messages.
        assert!(a.metadata.is_none());
    }

    #[test]
    fn history_tolerates_numeric_timestamps() {
        let body: HistoryResponse = serde_json::from_value(json!({"history": [
            {"id": 1, "role": "user", "content": "Hi", "timestamp": 1740823200},
            {"id": 2, "role": "assistant", "content": "Hello", "timestamp": 1740823260000i64},
            {"id": 3, "role": "assistant", "content": 42, "timestamp": null}
        ]}))
        .unwrap();
        let messages: Vec<_> = body
            .history
            .unwrap()
            .into_iter()
            .enumerate()
            .map(|(i, raw)| raw.into_message(i))
            .collect();
        assert_eq!(messages[0].timestamp, parse_timestamp("2025-03-01T10:00:00Z").unwrap());
        assert_eq!(messages[1].timestamp, parse_timestamp("2025-03-01T10:01:00Z").unwrap());
        assert_eq!(messages[2].content, "42");
        assert_eq!(messages[2].timestamp, DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn error_and_welcome_ids() {
        assert!(Message::error("boom").is_error());
        assert!(!Message::user("hi").is_error());
        assert!(Message::welcome(Language::English).is_welcome());
    }

    #[test]
    fn chat_request_serializes_null_lead_id() {
        let req = ChatRequest {
            message: "hi".into(),
            lead_id: None,
            conversation_stage: "discovery".into(),
            provider: "openai".into(),
        };
        let value = serde_json::to_value(&req).unwrap();
        assert!(value["lead_id"].is_null());
        assert_eq!(value["conversation_stage"], "discovery");
    }
}
