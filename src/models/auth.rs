use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::de::opt_string_or_number;
use super::enums::UserRole;

/// The signed-in user as the backend describes it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// Free-form on the wire; see [`User::role_kind`].
    #[serde(default)]
    pub role: String,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub organization_id: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_rate_limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_token_limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences: Option<Value>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<String>,
}

impl User {
    pub fn role_kind(&self) -> Option<UserRole> {
        self.role.parse().ok()
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }
}

/// Partial update for `PUT /api/auth/me`; unset fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub org_type: Option<String>,
    #[serde(default)]
    pub max_users: Option<u64>,
    #[serde(default)]
    pub max_leads: Option<u64>,
    #[serde(default)]
    pub ai_token_limit_monthly: Option<u64>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub settings: Option<Value>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    #[serde(default)]
    pub api_calls_used: u64,
    #[serde(default)]
    pub api_calls_limit: u64,
    #[serde(default)]
    pub ai_tokens_used: u64,
    #[serde(default)]
    pub ai_tokens_limit: u64,
    #[serde(default)]
    pub current_period_start: Option<String>,
    #[serde(default)]
    pub current_period_end: Option<String>,
}

impl UsageStats {
    /// Fraction of the AI token quota consumed, `None` when unlimited.
    pub fn token_usage_ratio(&self) -> Option<f64> {
        (self.ai_tokens_limit > 0).then(|| self.ai_tokens_used as f64 / self.ai_tokens_limit as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    pub user: User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub organization_id: String,
}
