//! Session directory: the sidebar list of conversations (one per lead).
//!
//! Holds the normalized, recency-sorted summaries, the active selection and
//! a selection generation counter. Every selection change bumps the
//! generation so the conversation controller knows to re-hydrate.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tokio::sync::Notify;

use crate::client::{ClientError, SalesApi};
use crate::models::{LeadRecord, LeadStats, LeadStatus, NewLead, SessionSummary};

/// Relative timestamps switch to a plain date after this many days.
const RELATIVE_DAYS_LIMIT: i64 = 7;

// ═══════════════════════════════════════════════════════════
// Refresh signal
// ═══════════════════════════════════════════════════════════

/// "Something changed, reload the list." Raised by the controllers after a
/// reply arrives; awaited by whoever owns the directory.
///
/// A request made while nobody is waiting is kept, so it is never lost.
#[derive(Debug, Default)]
pub struct RefreshSignal {
    notify: Notify,
    requests: AtomicU64,
}

impl RefreshSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.notify.notify_one();
    }

    pub async fn notified(&self) {
        self.notify.notified().await;
    }

    /// Total requests so far.
    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::SeqCst)
    }
}

// ═══════════════════════════════════════════════════════════
// Directory
// ═══════════════════════════════════════════════════════════

/// Result of a selection change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// `None` for a new, unbound chat.
    pub lead_id: Option<String>,
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub removed: bool,
    /// The deleted chat was the active one; the selection is now unbound.
    pub unbound_active: bool,
}

#[derive(Debug, Default)]
struct DirectoryState {
    leads: Vec<LeadRecord>,
    sessions: Vec<SessionSummary>,
    active: Option<String>,
    generation: u64,
    loaded: bool,
}

pub struct SessionDirectory<A: SalesApi> {
    api: Arc<A>,
    state: Mutex<DirectoryState>,
    refresh: Arc<RefreshSignal>,
}

impl<A: SalesApi> SessionDirectory<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            state: Mutex::new(DirectoryState::default()),
            refresh: Arc::new(RefreshSignal::new()),
        }
    }

    pub fn refresh_signal(&self) -> Arc<RefreshSignal> {
        self.refresh.clone()
    }

    // The lock only guards plain data, so a poisoned guard is still usable.
    fn state(&self) -> MutexGuard<'_, DirectoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fetch leads and rebuild the list. On failure the previous list is
    /// kept and the error returned.
    pub async fn load_sessions(&self) -> Result<Vec<SessionSummary>, ClientError> {
        let leads = match self.api.list_leads().await {
            Ok(leads) => leads,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load sessions, keeping previous list");
                return Err(e);
            }
        };

        let sessions = summarize(&leads);
        tracing::debug!(leads = leads.len(), sessions = sessions.len(), "Sessions loaded");

        let mut state = self.state();
        state.leads = leads;
        state.sessions = sessions.clone();
        state.loaded = true;
        Ok(sessions)
    }

    /// Create a lead on the backend, then reload the list. A failed reload
    /// is logged; the lead still exists.
    pub async fn create_lead(&self, lead: &NewLead) -> Result<LeadRecord, ClientError> {
        let created = self.api.create_lead(&lead.normalized()).await.map_err(|e| {
            tracing::warn!(error = %e, "Failed to create lead");
            e
        })?;
        tracing::info!(lead_id = created.id.as_deref().unwrap_or(""), "Lead created");

        if let Err(e) = self.load_sessions().await {
            tracing::debug!(error = %e, "Lead list stale after create");
        }
        Ok(created)
    }

    pub fn sessions(&self) -> Vec<SessionSummary> {
        self.state().sessions.clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.state().loaded
    }

    /// Case-insensitive match on title or last message; empty query
    /// returns everything.
    pub fn filter(&self, query: &str) -> Vec<SessionSummary> {
        self.state()
            .sessions
            .iter()
            .filter(|s| s.matches(query))
            .cloned()
            .collect()
    }

    /// Lead table view: match company, contact or email, optionally by status.
    pub fn filter_leads(&self, query: &str, status: Option<LeadStatus>) -> Vec<LeadRecord> {
        let query = query.trim().to_lowercase();
        let contains = |field: &Option<String>| {
            field
                .as_deref()
                .is_some_and(|v| v.to_lowercase().contains(&query))
        };
        self.state()
            .leads
            .iter()
            .filter(|lead| {
                query.is_empty()
                    || contains(&lead.company_name)
                    || contains(&lead.contact_name)
                    || contains(&lead.email)
            })
            .filter(|lead| status.is_none() || lead.status() == status)
            .cloned()
            .collect()
    }

    pub fn stats(&self) -> LeadStats {
        LeadStats::from_leads(&self.state().leads)
    }

    pub fn active_session_id(&self) -> Option<String> {
        self.state().active.clone()
    }

    pub fn generation(&self) -> u64 {
        self.state().generation
    }

    pub fn start_new_chat(&self) -> Selection {
        let mut state = self.state();
        state.active = None;
        state.generation += 1;
        Selection {
            lead_id: None,
            generation: state.generation,
        }
    }

    /// Switch to an existing chat. Reselecting the active chat still bumps
    /// the generation and forces a re-hydrate.
    pub fn select_chat(&self, lead_id: &str) -> Selection {
        let mut state = self.state();
        state.active = Some(lead_id.to_string());
        state.generation += 1;
        Selection {
            lead_id: state.active.clone(),
            generation: state.generation,
        }
    }

    /// Record that the conversation controller bound a new chat to a lead.
    /// Does not bump the generation: the transcript is already current.
    pub fn note_bound(&self, lead_id: &str) {
        let mut state = self.state();
        if state.active.is_none() {
            state.active = Some(lead_id.to_string());
        }
    }

    /// Remove locally. The backend keeps the lead.
    pub fn delete_chat(&self, lead_id: &str) -> DeleteOutcome {
        let mut state = self.state();
        let before = state.sessions.len();
        state.sessions.retain(|s| s.id != lead_id);
        let removed = state.sessions.len() != before;

        let unbound_active = state.active.as_deref() == Some(lead_id);
        if unbound_active {
            state.active = None;
            state.generation += 1;
        }
        DeleteOutcome {
            removed,
            unbound_active,
        }
    }
}

/// Normalize and sort newest first; undated entries go last.
fn summarize(leads: &[LeadRecord]) -> Vec<SessionSummary> {
    let mut sessions: Vec<SessionSummary> =
        leads.iter().filter_map(SessionSummary::from_lead).collect();
    sessions.sort_by(|a, b| match (a.timestamp, b.timestamp) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    sessions
}

/// Sidebar timestamp: `5m ago`, `3h ago`, `2d ago`, then `2025-01-31`.
pub fn format_relative(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(timestamp);
    let minutes = elapsed.num_minutes().max(0);
    let hours = elapsed.num_hours().max(0);
    let days = elapsed.num_days().max(0);

    if minutes < 60 {
        format!("{minutes}m ago")
    } else if hours < 24 {
        format!("{hours}h ago")
    } else if days < RELATIVE_DAYS_LIMIT {
        format!("{days}d ago")
    } else {
        timestamp.format("%Y-%m-%d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockSalesApi;
    use chrono::TimeZone;
    use serde_json::json;

    fn leads() -> Vec<LeadRecord> {
        serde_json::from_value(json!([
            {"id": "old", "company_name": "Globex", "last_message_time": "2025-01-01T10:00:00Z", "status": "qualified"},
            {"id": "undated", "contact_name": "Jo", "status": "new"},
            {"id": "new", "company_name": "Acme", "last_message": "Pricing for 50 seats",
             "last_message_time": "2025-03-01T10:00:00Z", "status": "closed_won", "email": "ops@acme.io"},
            {"company_name": "No id"},
            {"id": "mid", "company_name": "Unknown", "created_at": "2025-02-01 09:30:00", "status": "proposal"}
        ]))
        .unwrap()
    }

    fn directory() -> (SessionDirectory<MockSalesApi>, Arc<MockSalesApi>) {
        let api = Arc::new(MockSalesApi::new());
        api.set_leads(Ok(leads()));
        (SessionDirectory::new(api.clone()), api)
    }

    #[tokio::test]
    async fn load_sorts_newest_first_with_undated_last() {
        let (dir, _) = directory();
        let sessions = dir.load_sessions().await.unwrap();
        let ids: Vec<&str> = sessions.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "mid", "old", "undated"]);
        assert_eq!(sessions[1].title, "Chat mid");
        assert!(dir.is_loaded());
    }

    #[tokio::test]
    async fn failed_load_keeps_previous_list() {
        let (dir, api) = directory();
        dir.load_sessions().await.unwrap();

        api.set_leads(Err(ClientError::Transport("down".into())));
        assert!(dir.load_sessions().await.is_err());
        assert_eq!(dir.sessions().len(), 4);
    }

    #[tokio::test]
    async fn filter_matches_title_or_last_message() {
        let (dir, _) = directory();
        dir.load_sessions().await.unwrap();
        assert_eq!(dir.filter("").len(), 4);
        assert_eq!(dir.filter("ACME")[0].id, "new");
        assert_eq!(dir.filter("50 seats")[0].id, "new");
        assert!(dir.filter("initech").is_empty());
    }

    #[tokio::test]
    async fn lead_filter_and_stats() {
        let (dir, _) = directory();
        dir.load_sessions().await.unwrap();

        assert_eq!(dir.filter_leads("acme.io", None).len(), 1);
        assert_eq!(dir.filter_leads("", Some(LeadStatus::Proposal)).len(), 1);

        let stats = dir.stats();
        assert_eq!(stats.total, 5);
        assert_eq!(stats.qualified, 1);
        assert_eq!(stats.in_pipeline, 2);
        assert_eq!(stats.closed_won, 1);
    }

    #[tokio::test]
    async fn created_lead_reloads_the_list() {
        let (dir, api) = directory();
        dir.load_sessions().await.unwrap();

        let mut with_new = leads();
        with_new.push(serde_json::from_value(json!({
            "id": "new-lead", "company_name": "Initech", "last_message_time": "2025-04-01T00:00:00Z"
        }))
        .unwrap());
        api.set_leads(Ok(with_new));

        let lead = NewLead {
            contact_name: Some(" ".into()),
            industry: Some("Software".into()),
            ..NewLead::new(" Initech ")
        };
        let created = dir.create_lead(&lead).await.unwrap();
        assert_eq!(created.id.as_deref(), Some("new-lead"));

        let sent = &api.created_leads()[0];
        assert_eq!(sent.company_name, "Initech");
        assert_eq!(sent.contact_name, None);
        assert_eq!(dir.sessions()[0].title, "Initech");
        assert_eq!(dir.stats().total, 6);
    }

    #[tokio::test]
    async fn failed_create_leaves_list_alone() {
        let (dir, api) = directory();
        dir.load_sessions().await.unwrap();
        api.push_create(Err(ClientError::Status {
            status: 422,
            detail: Some("company_name is required".into()),
        }));
        api.set_leads(Ok(Vec::new()));

        let err = dir.create_lead(&NewLead::default()).await.unwrap_err();
        assert_eq!(err.status(), Some(422));
        assert_eq!(dir.sessions().len(), 4);
    }

    #[test]
    fn selection_bumps_generation() {
        let (dir, _) = directory();
        let first = dir.select_chat("a");
        let again = dir.select_chat("a");
        assert!(again.generation > first.generation);
        assert_eq!(dir.active_session_id().as_deref(), Some("a"));

        let fresh = dir.start_new_chat();
        assert_eq!(fresh.lead_id, None);
        assert!(fresh.generation > again.generation);
    }

    #[tokio::test]
    async fn delete_unbinds_active_chat() {
        let (dir, _) = directory();
        dir.load_sessions().await.unwrap();
        dir.select_chat("new");

        let outcome = dir.delete_chat("new");
        assert_eq!(
            outcome,
            DeleteOutcome {
                removed: true,
                unbound_active: true
            }
        );
        assert!(dir.active_session_id().is_none());
        assert_eq!(dir.sessions().len(), 3);

        assert!(!dir.delete_chat("nope").removed);
    }

    #[test]
    fn bound_chat_becomes_active_without_new_generation() {
        let (dir, _) = directory();
        let selection = dir.start_new_chat();
        dir.note_bound("lead-9");
        assert_eq!(dir.active_session_id().as_deref(), Some("lead-9"));
        assert_eq!(dir.generation(), selection.generation);
    }

    #[test]
    fn relative_formatting() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        let at = |mins: i64| now - chrono::TimeDelta::minutes(mins);
        assert_eq!(format_relative(at(5), now), "5m ago");
        assert_eq!(format_relative(at(180), now), "3h ago");
        assert_eq!(format_relative(at(2 * 24 * 60), now), "2d ago");
        assert_eq!(format_relative(at(30 * 24 * 60), now), "2025-02-08");
        assert_eq!(format_relative(now + chrono::TimeDelta::minutes(5), now), "0m ago");
    }

    #[tokio::test]
    async fn refresh_request_is_not_lost() {
        let signal = RefreshSignal::new();
        signal.request();
        tokio::time::timeout(std::time::Duration::from_secs(1), signal.notified())
            .await
            .expect("stored permit should wake the waiter");
        assert_eq!(signal.requests(), 1);
    }
}
