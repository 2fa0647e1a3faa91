//! Per-session search state
//!
//! The results pages are driven from state rather than from the URL: the
//! anchor, filters and keywords of the caller's last request are kept here
//! and mutated by the remove-filter links.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::filters::{Facet, FilterSet};
use crate::model::SearchMode;

/// Opaque session key carried in the session cookie
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Accept a cookie value if it looks like one we issued
    pub fn parse(value: &str) -> Option<Self> {
        Uuid::parse_str(value).ok().map(|u| Self(u.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything the results pages need to re-run a search
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchState {
    pub mode: Option<SearchMode>,
    /// Place id from the geocoder
    pub location: Option<String>,
    pub provider_id: Option<String>,
    pub school_id: Option<String>,
    pub filters: FilterSet,
}

impl SearchState {
    /// Anchor id for a mode
    pub fn anchor(&self, mode: SearchMode) -> Option<&str> {
        match mode {
            SearchMode::Location => self.location.as_deref(),
            SearchMode::Provider => self.provider_id.as_deref(),
            SearchMode::School => self.school_id.as_deref(),
        }
    }

    pub fn set_anchor(&mut self, mode: SearchMode, id: String) {
        match mode {
            SearchMode::Location => self.location = Some(id),
            SearchMode::Provider => self.provider_id = Some(id),
            SearchMode::School => self.school_id = Some(id),
        }
    }
}

#[async_trait]
pub trait FilterStateStore: Send + Sync {
    /// Stored state, or the empty state for an unknown session
    async fn load(&self, session: &SessionId) -> SearchState;

    async fn save(&self, session: &SessionId, state: SearchState);

    /// Drop exactly one code from one facet
    async fn remove(&self, session: &SessionId, facet: Facet, code: &str);

    /// Drop every facet selection and the radius; keywords survive
    async fn clear_all(&self, session: &SessionId);

    async fn clear_keywords(&self, session: &SessionId);
}

/// Sessions idle longer than this are forgotten
pub const DEFAULT_SESSION_IDLE: Duration = Duration::from_secs(4 * 60 * 60);

/// Most sessions kept at once; the least recently used goes first
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

#[derive(Debug)]
struct SessionEntry {
    state: SearchState,
    last_seen: Instant,
}

/// Process-local store; state is lost on restart.
///
/// Entries expire after an idle period, and the map never holds more than
/// `max_sessions` entries.
#[derive(Debug)]
pub struct MemoryFilterStore {
    sessions: RwLock<HashMap<SessionId, SessionEntry>>,
    idle_timeout: Duration,
    max_sessions: usize,
}

impl Default for MemoryFilterStore {
    fn default() -> Self {
        Self::with_limits(DEFAULT_SESSION_IDLE, DEFAULT_MAX_SESSIONS)
    }
}

impl MemoryFilterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(idle_timeout: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout,
            max_sessions: max_sessions.max(1),
        }
    }

    /// Live (unexpired) session count
    pub async fn session_count(&self) -> usize {
        self.sessions
            .read()
            .await
            .values()
            .filter(|entry| entry.last_seen.elapsed() < self.idle_timeout)
            .count()
    }

    async fn update(&self, session: &SessionId, f: impl FnOnce(&mut SearchState)) {
        let mut sessions = self.sessions.write().await;
        if let Some(entry) = sessions.get_mut(session) {
            if entry.last_seen.elapsed() < self.idle_timeout {
                f(&mut entry.state);
                entry.last_seen = Instant::now();
            }
        }
    }

    fn evict(&self, sessions: &mut HashMap<SessionId, SessionEntry>, keep: &SessionId) {
        let before = sessions.len();
        sessions.retain(|_, entry| entry.last_seen.elapsed() < self.idle_timeout);

        while sessions.len() >= self.max_sessions && !sessions.contains_key(keep) {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_seen)
                .map(|(id, _)| id.clone());
            match oldest {
                Some(id) => {
                    sessions.remove(&id);
                }
                None => break,
            }
        }

        if sessions.len() < before {
            debug!(evicted = before - sessions.len(), live = sessions.len(), "Evicted sessions");
        }
    }
}

#[async_trait]
impl FilterStateStore for MemoryFilterStore {
    async fn load(&self, session: &SessionId) -> SearchState {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(session) {
            Some(entry) if entry.last_seen.elapsed() < self.idle_timeout => {
                entry.last_seen = Instant::now();
                entry.state.clone()
            }
            _ => SearchState::default(),
        }
    }

    async fn save(&self, session: &SessionId, state: SearchState) {
        let mut sessions = self.sessions.write().await;
        self.evict(&mut sessions, session);
        sessions.insert(
            session.clone(),
            SessionEntry {
                state,
                last_seen: Instant::now(),
            },
        );
    }

    async fn remove(&self, session: &SessionId, facet: Facet, code: &str) {
        self.update(session, |state| state.filters = state.filters.without(facet, code))
            .await;
    }

    async fn clear_all(&self, session: &SessionId) {
        self.update(session, |state| state.filters = state.filters.without_facets())
            .await;
    }

    async fn clear_keywords(&self, session: &SessionId) {
        self.update(session, |state| state.filters = state.filters.without_keywords())
            .await;
    }
}
