//! Thread-safe session storage using DashMap

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::interval;
use tracing::info;

use crate::config::BotConfig;
use crate::language::Language;

use super::types::Session;

/// In-memory session store for LINE users
#[derive(Clone)]
pub struct InMemorySessionStore {
    sessions: Arc<DashMap<String, Session>>,
    max_exchanges: usize,
    session_timeout_secs: u64,
    default_language: Language,
}

impl InMemorySessionStore {
    /// Create a new session store
    pub fn new() -> Self {
        Self::with_settings(10, 3600, Language::Th)
    }

    /// Create with custom settings
    pub fn with_settings(max_exchanges: usize, session_timeout_secs: u64, default_language: Language) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            max_exchanges,
            session_timeout_secs,
            default_language,
        }
    }

    pub fn from_config(config: &BotConfig) -> Self {
        Self::with_settings(
            config.max_conversation_history,
            config.session_timeout_secs,
            Language::from_code_or_default(&config.default_language),
        )
    }

    /// Get or create a session for a user
    pub fn get_or_create(&self, user_id: &str) -> Session {
        self.sessions
            .entry(user_id.to_string())
            .or_insert_with(|| Session::new(user_id, self.default_language, self.max_exchanges))
            .clone()
    }

    /// Get a session if it exists
    pub fn get(&self, user_id: &str) -> Option<Session> {
        self.sessions.get(user_id).map(|s| s.clone())
    }

    /// Current language for a user (default for unknown users)
    pub fn language(&self, user_id: &str) -> Language {
        self.sessions
            .get(user_id)
            .map(|s| s.language)
            .unwrap_or(self.default_language)
    }

    pub fn set_language(&self, user_id: &str, language: Language) {
        self.sessions
            .entry(user_id.to_string())
            .or_insert_with(|| Session::new(user_id, self.default_language, self.max_exchanges))
            .set_language(language);
    }

    /// Remember an exchange for a user
    pub fn add_exchange(&self, user_id: &str, user_message: &str, bot_response: &str) {
        self.sessions
            .entry(user_id.to_string())
            .or_insert_with(|| Session::new(user_id, self.default_language, self.max_exchanges))
            .add_exchange(user_message, bot_response);
    }

    /// Clear a user's history
    pub fn clear(&self, user_id: &str) -> bool {
        if let Some(mut session) = self.sessions.get_mut(user_id) {
            session.clear();
            true
        } else {
            false
        }
    }

    /// Remove a session entirely
    pub fn remove(&self, user_id: &str) -> Option<Session> {
        self.sessions.remove(user_id).map(|(_, s)| s)
    }

    /// Get session count
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Start a background task to clean up expired sessions
    pub fn start_cleanup_task(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = interval(Duration::from_secs(300));
            loop {
                interval.tick().await;
                self.cleanup_expired();
            }
        })
    }

    /// Drop sessions idle longer than the timeout
    pub fn cleanup_expired(&self) -> usize {
        let now = chrono::Utc::now();
        // Timeouts beyond what chrono can represent never expire
        let timeout = i64::try_from(self.session_timeout_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX);
        let before = self.sessions.len();

        self.sessions.retain(|_, session| now - session.updated_at <= timeout);

        let removed = before.saturating_sub(self.sessions.len());
        if removed > 0 {
            info!("Cleaned up {} expired sessions", removed);
        }
        removed
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}
