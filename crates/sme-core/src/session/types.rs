//! Session types

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::language::Language;
use crate::llm::ChatMessage;

/// One user message and the bot's answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    pub user: String,
    pub assistant: String,
}

/// Per-user conversation memory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// LINE user id
    pub user_id: String,
    /// Most recent exchanges, oldest first
    pub exchanges: VecDeque<Exchange>,
    /// Reply language for this user
    pub language: Language,
    /// Number of exchanges kept
    pub max_exchanges: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a new session for a user
    pub fn new(user_id: impl Into<String>, language: Language, max_exchanges: usize) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            exchanges: VecDeque::new(),
            language,
            max_exchanges,
            created_at: now,
            updated_at: now,
        }
    }

    /// Remember an exchange, dropping the oldest beyond the limit
    pub fn add_exchange(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        self.exchanges.push_back(Exchange {
            user: user.into(),
            assistant: assistant.into(),
        });
        while self.exchanges.len() > self.max_exchanges {
            self.exchanges.pop_front();
        }
        self.touch();
    }

    /// Clear all exchanges (the language preference is kept)
    pub fn clear(&mut self) {
        self.exchanges.clear();
        self.touch();
    }

    pub fn set_language(&mut self, language: Language) {
        self.language = language;
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// History as alternating user/assistant chat messages
    pub fn history(&self) -> Vec<ChatMessage> {
        self.exchanges
            .iter()
            .flat_map(|e| [ChatMessage::user(&e.user), ChatMessage::assistant(&e.assistant)])
            .collect()
    }

    /// Number of stored messages (two per exchange)
    pub fn message_count(&self) -> usize {
        self.exchanges.len() * 2
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_creation() {
        let session = Session::new("U123", Language::Th, 10);
        assert_eq!(session.user_id, "U123");
        assert!(session.is_empty());
        assert_eq!(session.language, Language::Th);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut session = Session::new("U123", Language::En, 2);
        session.add_exchange("q1", "a1");
        session.add_exchange("q2", "a2");
        session.add_exchange("q3", "a3");

        assert_eq!(session.exchanges.len(), 2);
        assert_eq!(session.message_count(), 4);

        let history = session.history();
        assert_eq!(history[0].text_content(), "q2");
        assert_eq!(history[1].role, "assistant");
        assert_eq!(history[3].text_content(), "a3");
    }

    #[test]
    fn test_clear_keeps_language() {
        let mut session = Session::new("U123", Language::Th, 10);
        session.set_language(Language::Ja);
        session.add_exchange("q", "a");
        session.clear();
        assert!(session.is_empty());
        assert_eq!(session.language, Language::Ja);
    }
}
