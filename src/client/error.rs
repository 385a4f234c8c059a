use serde_json::Value;

use crate::i18n::Language;

/// Failure of one gateway call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Transport(String),
    #[error("Session expired")]
    Unauthorized,
    #[error("Backend returned {status}{}", detail_suffix(.detail))]
    Status { status: u16, detail: Option<String> },
    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized => Some(401),
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Text for the transcript. Client errors (4xx) that carry an
    /// explanation show it verbatim; everything else is generic.
    pub fn user_message(&self, language: Language) -> String {
        match self {
            Self::Unauthorized => language.session_expired().to_string(),
            Self::Status {
                status: 400..=499,
                detail: Some(detail),
            } => detail.clone(),
            _ => language.generic_error().to_string(),
        }
    }

    /// Build a status error from a non-success body, pulling out
    /// `detail`, `message` or `error` when the body is JSON.
    pub fn from_body(status: u16, body: &[u8]) -> Self {
        let detail = serde_json::from_slice::<Value>(body)
            .ok()
            .as_ref()
            .and_then(extract_detail);
        Self::Status { status, detail }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default()
}

fn extract_detail(body: &Value) -> Option<String> {
    ["detail", "message", "error"].iter().find_map(|key| match body.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        // FastAPI validation errors: [{"loc": [...], "msg": "..."}]
        Value::Array(items) => {
            let msgs: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            (!msgs.is_empty()).then(|| msgs.join("; "))
        }
        _ => None,
    })
}
