//! Response cache for fast-path answers

use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

use crate::language::Language;

/// Longest input forwarded to the model, in characters
pub const MAX_INPUT_CHARS: usize = 4000;

#[derive(Debug, Clone)]
struct CacheEntry {
    response: String,
    inserted_at: Instant,
}

/// TTL cache keyed by language and normalized message
#[derive(Debug)]
pub struct ResponseCache {
    entries: DashMap<(Language, String), CacheEntry>,
    ttl: Duration,
    capacity: usize,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(1000, Duration::from_secs(3600))
    }
}

impl ResponseCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// Trim, lowercase and collapse whitespace
    pub fn normalize(message: &str) -> String {
        message.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
    }

    pub fn get(&self, language: Language, message: &str) -> Option<String> {
        let key = (language, Self::normalize(message));
        let entry = self.entries.get(&key)?;
        if entry.inserted_at.elapsed() > self.ttl {
            drop(entry);
            self.entries.remove(&key);
            return None;
        }
        debug!("Response cache hit");
        Some(entry.response.clone())
    }

    pub fn insert(&self, language: Language, message: &str, response: impl Into<String>) {
        let key = (language, Self::normalize(message));
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.evict_oldest();
        }
        self.entries.insert(
            key,
            CacheEntry {
                response: response.into(),
                inserted_at: Instant::now(),
            },
        );
    }

    fn evict_oldest(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|e| e.value().inserted_at)
            .map(|e| e.key().clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }

    /// Remove expired entries, returning how many were dropped
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| e.inserted_at.elapsed() <= self.ttl);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Cut `text` to at most `max_chars` characters
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
