//! Process-wide session state keyed by session id.
//!
//! Sessions are checked out as owned values and committed back whole, so a
//! turn never holds the lock while scoring or calling the extractor. Two
//! overlapping turns on one session resolve last-write-wins.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::constants::{PREFERENCE_HISTORY_LIMIT, TRANSCRIPT_LIMIT};
use crate::dialog::{DialogStep, GuidedDialog};
use crate::extractor::Exchange;
use crate::preferences::Preferences;
use crate::refine::RecommendationSet;

/// Where a session is in its conversation.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum SessionPhase {
    /// Free-text turns routed to the extractor.
    #[default]
    Free,
    /// Inside the guided question flow.
    Guided(GuidedDialog),
    /// Recommendations have been shown; further turns refine them.
    Results,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Guided(dialog) => dialog.step().as_str(),
            Self::Results => DialogStep::Results.as_str(),
        }
    }

    pub fn is_results(&self) -> bool {
        match self {
            Self::Results => true,
            Self::Guided(dialog) => dialog.is_complete(),
            Self::Free => false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Session {
    pub id: String,
    pub preferences: Preferences,
    /// Earlier preference snapshots, oldest first.
    pub history: Vec<Preferences>,
    /// Prices of the most recent non-empty recommendation set.
    pub last_prices: Vec<f64>,
    pub phase: SessionPhase,
    pub transcript: Vec<Exchange>,
    last_active: Instant,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            preferences: Preferences::default(),
            history: Vec::new(),
            last_prices: Vec::new(),
            phase: SessionPhase::Free,
            transcript: Vec::new(),
            last_active: Instant::now(),
        }
    }

    /// Replace the current preferences, keeping the old value as a snapshot.
    pub fn record_preferences(&mut self, next: Preferences) {
        if next == self.preferences {
            return;
        }
        let prev = std::mem::replace(&mut self.preferences, next);
        self.history.push(prev);
        if self.history.len() > PREFERENCE_HISTORY_LIMIT {
            let excess = self.history.len() - PREFERENCE_HISTORY_LIMIT;
            self.history.drain(..excess);
        }
    }

    pub fn record_exchange(&mut self, user: &str, assistant: &str) {
        self.transcript.push(Exchange {
            user: user.to_string(),
            assistant: assistant.to_string(),
        });
        if self.transcript.len() > TRANSCRIPT_LIMIT {
            let excess = self.transcript.len() - TRANSCRIPT_LIMIT;
            self.transcript.drain(..excess);
        }
    }

    /// Remember a recommendation set. Empty sets leave the price history
    /// alone so a later "cheaper" still has something to undercut.
    pub fn record_results(&mut self, set: &RecommendationSet) {
        if !set.is_empty() {
            self.last_prices = set.prices();
        }
    }

    /// Back to defaults, keeping the id.
    pub fn reset(&mut self) {
        *self = Self::new(std::mem::take(&mut self.id));
    }

    pub fn idle_for(&self) -> Duration {
        self.last_active.elapsed()
    }
}

pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

/// Thread-safe session map with optional idle expiry.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    idle_timeout: Option<Duration>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sessions idle longer than `timeout` are dropped on the next access.
    pub fn with_idle_timeout(timeout: Option<Duration>) -> Self {
        Self {
            sessions: RwLock::default(),
            idle_timeout: timeout,
        }
    }

    /// The session for `id`, or a fresh one when the id is absent, unknown,
    /// or expired. Fresh sessions get a new id and are not stored until
    /// committed.
    pub fn checkout(&self, id: Option<&str>) -> Session {
        self.purge_idle();
        id.and_then(|id| self.get(id))
            .unwrap_or_else(|| Session::new(new_session_id()))
    }

    pub fn get(&self, id: &str) -> Option<Session> {
        let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
        sessions.get(id).cloned()
    }

    /// Store `session`, replacing whatever was there.
    pub fn commit(&self, mut session: Session) {
        session.last_active = Instant::now();
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.insert(session.id.clone(), session);
    }

    /// Reset a session's preferences, prices, transcript and phase.
    /// Returns false when no such session exists.
    pub fn restart(&self, id: &str) -> bool {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        match sessions.get_mut(id) {
            Some(session) => {
                session.reset();
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, id: &str) -> bool {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop sessions idle past the timeout. No-op without a timeout.
    pub fn purge_idle(&self) -> usize {
        let Some(timeout) = self.idle_timeout else {
            return 0;
        };
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        let before = sessions.len();
        sessions.retain(|_, s| s.idle_for() <= timeout);
        let purged = before - sessions.len();
        if purged > 0 {
            tracing::debug!(purged, "expired idle sessions");
        }
        purged
    }
}
