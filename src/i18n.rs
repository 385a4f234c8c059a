//! UI language: welcome text, starter prompts and the speech language code.

use serde::{Deserialize, Serialize};

/// Languages the sales desk is localized for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    English,
    Japanese,
}

impl Language {
    /// Accepts `en`/`english` and `ja`/`jp`/`japanese` (case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Some(Self::English),
            "ja" | "jp" | "japanese" => Some(Self::Japanese),
            _ => None,
        }
    }

    /// Code sent as the `language` field of voice requests.
    pub fn code(&self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Japanese => "ja",
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            Self::English => Self::Japanese,
            Self::Japanese => Self::English,
        }
    }

    /// Assistant greeting used for a fresh or unrecoverable conversation.
    pub fn welcome_message(&self) -> &'static str {
        match self {
            Self::English => {
                "Hello! I'm your AI-powered B2B sales assistant. I'm here to help you \
                 discover the right technology solutions for your business. \
                 What challenges are you looking to solve today?"
            }
            Self::Japanese => {
                "こんにちは！私はAI搭載のB2B営業アシスタントです。\
                 あなたのビジネスに最適な技術ソリューションを見つけるお手伝いをします。\
                 どんな課題を解決したいですか？"
            }
        }
    }

    /// Shown when a send fails for a reason the backend did not explain.
    pub fn generic_error(&self) -> &'static str {
        match self {
            Self::English => "Sorry, I encountered an error. Please try again.",
            Self::Japanese => "申し訳ありません。エラーが発生しました。もう一度お試しください。",
        }
    }

    /// Shown when the backend rejected the session (HTTP 401).
    pub fn session_expired(&self) -> &'static str {
        match self {
            Self::English => "Your session has expired. Please sign in again.",
            Self::Japanese => "セッションの有効期限が切れました。再度ログインしてください。",
        }
    }
}

/// Prompt suggestion for the empty conversation state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptSuggestion {
    pub text: String,
    pub category: String,
}

fn suggestion(text: &str, category: &str) -> PromptSuggestion {
    PromptSuggestion {
        text: text.into(),
        category: category.into(),
    }
}

/// Starter prompts for a new conversation.
pub fn starter_prompts(language: Language) -> Vec<PromptSuggestion> {
    match language {
        Language::English => vec![
            suggestion("Tell me about your cloud solutions", "products"),
            suggestion("What's your pricing model?", "pricing"),
            suggestion("I need a custom quote", "quote"),
            suggestion("Show me security features", "products"),
        ],
        Language::Japanese => vec![
            suggestion("クラウドソリューションについて教えてください", "products"),
            suggestion("料金体系を教えてください", "pricing"),
            suggestion("カスタム見積もりが必要です", "quote"),
            suggestion("セキュリティ機能を見せてください", "products"),
        ],
    }
}
