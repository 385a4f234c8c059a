use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::de::{null_as_default, opt_f64_lenient, opt_string_or_number, parse_timestamp};
use super::enums::LeadStatus;

/// Placeholder the backend writes when it has not learned a name yet.
const UNKNOWN_SENTINEL: &str = "Unknown";

pub const NO_MESSAGES_YET: &str = "No messages yet";

/// A lead as returned by `GET /api/leads`. Every field is optional; use
/// [`SessionSummary::from_lead`] to get something displayable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadRecord {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub company_name: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub contact_name: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub industry: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub company_size: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "opt_f64_lenient")]
    pub lead_score: Option<f64>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub last_message: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub last_message_time: Option<String>,
}

impl LeadRecord {
    pub fn status(&self) -> Option<LeadStatus> {
        self.status.as_deref().and_then(|s| s.parse().ok())
    }
}

/// Body of `POST /api/leads`. Blank fields are left out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewLead {
    pub company_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_size: Option<String>,
}

impl NewLead {
    pub fn new(company_name: impl Into<String>) -> Self {
        Self {
            company_name: company_name.into(),
            ..Self::default()
        }
    }

    /// Trim every field and drop the blank optional ones.
    pub fn normalized(&self) -> Self {
        let opt = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Self {
            company_name: self.company_name.trim().to_string(),
            contact_name: opt(&self.contact_name),
            email: opt(&self.email),
            phone: opt(&self.phone),
            industry: opt(&self.industry),
            company_size: opt(&self.company_size),
        }
    }
}

/// What the backend answers to a create: the record itself or `{"lead": …}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CreatedLead {
    Wrapped { lead: LeadRecord },
    Bare(LeadRecord),
}

impl CreatedLead {
    pub fn into_record(self) -> LeadRecord {
        match self {
            Self::Wrapped { lead } | Self::Bare(lead) => lead,
        }
    }
}

/// `GET /api/leads` body. Older backends return a bare array. Items are
/// decoded one by one so a malformed record never hides the rest.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LeadList {
    Wrapped {
        #[serde(default, deserialize_with = "null_as_default")]
        leads: Vec<Value>,
    },
    Bare(Vec<Value>),
}

impl LeadList {
    pub fn into_records(self) -> Vec<LeadRecord> {
        let items = match self {
            Self::Wrapped { leads } => leads,
            Self::Bare(leads) => leads,
        };
        items
            .into_iter()
            .filter_map(|item| match serde_json::from_value(item) {
                Ok(lead) => Some(lead),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping malformed lead record");
                    None
                }
            })
            .collect()
    }
}

// ═══════════════════════════════════════════
// Session summary
// ═══════════════════════════════════════════

/// One entry of the conversation sidebar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    pub title: String,
    pub last_message: String,
    /// `None` when the backend sent no parsable timestamp; sorts last.
    pub timestamp: Option<DateTime<Utc>>,
}

fn known_name(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != UNKNOWN_SENTINEL)
}

impl SessionSummary {
    /// Normalize a lead record. Records without an id cannot be selected
    /// and are dropped.
    pub fn from_lead(lead: &LeadRecord) -> Option<Self> {
        let id = lead.id.clone()?;

        let title = known_name(lead.company_name.as_deref())
            .or_else(|| known_name(lead.contact_name.as_deref()))
            .map(str::to_string)
            .unwrap_or_else(|| fallback_title(&id));

        let last_message = lead
            .last_message
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(NO_MESSAGES_YET)
            .to_string();

        let timestamp = lead
            .last_message_time
            .as_deref()
            .and_then(parse_timestamp)
            .or_else(|| lead.created_at.as_deref().and_then(parse_timestamp));

        Some(Self {
            id,
            title,
            last_message,
            timestamp,
        })
    }

    /// Case-insensitive substring match on title or last message.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        query.is_empty()
            || self.title.to_lowercase().contains(&query)
            || self.last_message.to_lowercase().contains(&query)
    }
}

/// `Chat <last 6 chars of id>`.
fn fallback_title(id: &str) -> String {
    let chars: Vec<char> = id.chars().collect();
    let tail: String = chars[chars.len().saturating_sub(6)..].iter().collect();
    format!("Chat {tail}")
}

// ═══════════════════════════════════════════
// Pipeline stats
// ═══════════════════════════════════════════

/// Header counters for the lead list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadStats {
    pub total: usize,
    pub qualified: usize,
    pub in_pipeline: usize,
    pub closed_won: usize,
}

impl LeadStats {
    pub fn from_leads(leads: &[LeadRecord]) -> Self {
        leads.iter().fold(
            Self {
                total: leads.len(),
                ..Self::default()
            },
            |mut stats, lead| {
                match lead.status() {
                    Some(LeadStatus::Qualified) => stats.qualified += 1,
                    Some(LeadStatus::ClosedWon) => stats.closed_won += 1,
                    _ => {}
                }
                if lead.status().is_some_and(|s| s.is_in_pipeline()) {
                    stats.in_pipeline += 1;
                }
                stats
            },
        )
    }
}
