//! SQLite log store
//!
//! Writes never block the caller: `log_*` methods hand the insert to
//! `spawn_blocking` and only report failures. In console-only mode no
//! database is opened and conversations are written to the tracing output.

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{Duration, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info, warn};

use crate::cache::truncate_chars;
use crate::config::DatabaseConfig;
use crate::error::{Error, Result};

use super::types::*;

/// Database health as reported by `/health`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseStatus {
    Healthy,
    Unhealthy,
    Disabled,
}

impl DatabaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseStatus::Healthy => "healthy",
            DatabaseStatus::Unhealthy => "unhealthy",
            DatabaseStatus::Disabled => "disabled",
        }
    }
}

/// Conversation, webhook and system log storage
#[derive(Clone)]
pub struct LogStore {
    conn: Option<Arc<Mutex<Connection>>>,
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn cutoff_timestamp(days: i64) -> String {
    (Utc::now() - Duration::days(days)).to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl LogStore {
    /// Open (or create) the database file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        debug!("Opening log database at: {}", path.display());
        let conn = Connection::open(path)?;
        let store = Self::with_connection(conn)?;
        info!("LogStore initialized at {}", path.display());
        Ok(store)
    }

    /// In-memory database (useful for testing)
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    /// Store without a database
    pub fn console_only() -> Self {
        Self { conn: None }
    }

    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        if config.console_only {
            info!("Console-only logging enabled, database disabled");
            return Ok(Self::console_only());
        }
        Self::open(&config.path)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        init_tables(&conn)?;
        Ok(Self {
            conn: Some(Arc::new(Mutex::new(conn))),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.conn.is_some()
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Option<Result<T>> {
        let conn = self.conn.as_ref()?;
        Some(match conn.lock() {
            Ok(guard) => f(&guard),
            Err(_) => Err(Error::Other("log database lock poisoned".to_string())),
        })
    }

    fn spawn_write<F>(&self, what: &'static str, write: F)
    where
        F: FnOnce(&Connection) -> rusqlite::Result<usize> + Send + 'static,
    {
        let Some(conn) = self.conn.clone() else {
            return;
        };

        let task = move || {
            let result = match conn.lock() {
                Ok(guard) => write(&guard).map_err(Error::from),
                Err(_) => Err(Error::Other("log database lock poisoned".to_string())),
            };
            if let Err(e) = result {
                warn!("Failed to write {}: {}", what, e);
            }
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(task);
            }
            Err(_) => task(),
        }
    }

    // ---------------------------------------------------------------------
    // writes
    // ---------------------------------------------------------------------

    /// Insert a conversation row synchronously
    pub fn insert_conversation(&self, record: &NewConversation) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            insert_conversation(conn, record)?;
            Ok(conn.last_insert_rowid())
        })
        .transpose()
    }

    /// Insert a webhook event row synchronously
    pub fn insert_webhook_event(&self, record: &NewWebhookEvent) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            insert_webhook_event(conn, record)?;
            Ok(conn.last_insert_rowid())
        })
        .transpose()
    }

    /// Insert a system log row synchronously
    pub fn insert_system_log(&self, record: &NewSystemLog) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            insert_system_log(conn, record)?;
            Ok(conn.last_insert_rowid())
        })
        .transpose()
    }

    /// Record a conversation without waiting
    pub fn log_conversation(&self, record: NewConversation) {
        if !self.is_enabled() {
            info!(
                "Conversation [{}] {} ({}): {} -> {}",
                record.language,
                truncate_chars(&record.user_id, 10),
                record.message_type.as_str(),
                truncate_chars(&record.user_message, 50),
                truncate_chars(&record.bot_response, 50)
            );
            return;
        }
        self.spawn_write("conversation", move |conn| insert_conversation(conn, &record));
    }

    /// Record a webhook event without waiting
    pub fn log_webhook_event(&self, record: NewWebhookEvent) {
        self.spawn_write("webhook event", move |conn| insert_webhook_event(conn, &record));
    }

    /// Record a system log row without waiting
    pub fn log_system(&self, record: NewSystemLog) {
        self.spawn_write("system log", move |conn| insert_system_log(conn, &record));
    }

    // ---------------------------------------------------------------------
    // reads
    // ---------------------------------------------------------------------

    /// Dashboard statistics over the last `days` days
    pub fn stats(&self, days: i64) -> Result<Stats> {
        let since = cutoff_timestamp(days.max(0));
        self.with_conn(|conn| query_stats(conn, &since))
            .unwrap_or_else(|| Ok(Stats::default()))
    }

    pub fn conversations(&self, page: u32, per_page: u32) -> Result<Page<ConversationRow>> {
        self.with_conn(|conn| {
            paginate(
                conn,
                "SELECT COUNT(*) FROM conversations",
                "SELECT id, user_id, user_name, message_type, user_message, bot_response,
                        file_name, file_type, language, response_time_ms, created_at
                 FROM conversations ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2",
                None,
                page,
                per_page,
                |row| {
                    Ok(ConversationRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        user_name: row.get(2)?,
                        message_type: row.get(3)?,
                        user_message: row.get(4)?,
                        bot_response: row.get(5)?,
                        file_name: row.get(6)?,
                        file_type: row.get(7)?,
                        language: row.get(8)?,
                        response_time_ms: row.get(9)?,
                        created_at: row.get(10)?,
                    })
                },
            )
        })
        .unwrap_or_else(|| Ok(Page::empty(page, per_page)))
    }

    pub fn webhook_events(&self, page: u32, per_page: u32) -> Result<Page<WebhookEventRow>> {
        self.with_conn(|conn| {
            paginate(
                conn,
                "SELECT COUNT(*) FROM webhook_events",
                "SELECT id, event_type, user_id, source_type, source_id, message_id, processed,
                        processing_time_ms, error_message, created_at
                 FROM webhook_events ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2",
                None,
                page,
                per_page,
                |row| {
                    Ok(WebhookEventRow {
                        id: row.get(0)?,
                        event_type: row.get(1)?,
                        user_id: row.get(2)?,
                        source_type: row.get(3)?,
                        source_id: row.get(4)?,
                        message_id: row.get(5)?,
                        processed: row.get(6)?,
                        processing_time_ms: row.get(7)?,
                        error_message: row.get(8)?,
                        created_at: row.get(9)?,
                    })
                },
            )
        })
        .unwrap_or_else(|| Ok(Page::empty(page, per_page)))
    }

    /// System logs, optionally filtered by level (`None` = all levels)
    pub fn system_logs(&self, page: u32, per_page: u32, level: Option<&str>) -> Result<Page<SystemLogRow>> {
        let level = level.map(str::to_uppercase);
        self.with_conn(|conn| {
            let map_row = system_log_row;
            match level.as_deref() {
                Some(level) => paginate(
                    conn,
                    "SELECT COUNT(*) FROM system_logs WHERE level = ?1",
                    "SELECT id, level, message, user_id, error_details, created_at
                     FROM system_logs WHERE level = ?3
                     ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2",
                    Some(level),
                    page,
                    per_page,
                    map_row,
                ),
                None => paginate(
                    conn,
                    "SELECT COUNT(*) FROM system_logs",
                    "SELECT id, level, message, user_id, error_details, created_at
                     FROM system_logs ORDER BY created_at DESC, id DESC LIMIT ?1 OFFSET ?2",
                    None,
                    page,
                    per_page,
                    map_row,
                ),
            }
        })
        .unwrap_or_else(|| Ok(Page::empty(page, per_page)))
    }

    /// Probe the database with a trivial query
    pub fn health(&self) -> DatabaseStatus {
        match self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        }) {
            None => DatabaseStatus::Disabled,
            Some(Ok(())) => DatabaseStatus::Healthy,
            Some(Err(e)) => {
                warn!("Database health check failed: {}", e);
                DatabaseStatus::Unhealthy
            }
        }
    }

    /// Delete rows older than `days` days from every table
    pub fn cleanup_older_than(&self, days: i64) -> Result<usize> {
        let cutoff = cutoff_timestamp(days);
        self.with_conn(|conn| {
            let mut removed = 0;
            for table in ["conversations", "webhook_events", "system_logs"] {
                removed += conn.execute(
                    &format!("DELETE FROM {} WHERE created_at < ?1", table),
                    params![cutoff],
                )?;
            }
            if removed > 0 {
                info!("Removed {} log rows older than {} days", removed, days);
            }
            Ok(removed)
        })
        .unwrap_or(Ok(0))
    }
}

fn system_log_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SystemLogRow> {
    Ok(SystemLogRow {
        id: row.get(0)?,
        level: row.get(1)?,
        message: row.get(2)?,
        user_id: row.get(3)?,
        error_details: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn init_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS conversations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            user_name TEXT,
            message_type TEXT NOT NULL,
            user_message TEXT,
            bot_response TEXT,
            file_name TEXT,
            file_type TEXT,
            language TEXT NOT NULL DEFAULT 'th',
            response_time_ms INTEGER,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_conversations_user_created
            ON conversations(user_id, created_at);

        CREATE TABLE IF NOT EXISTS system_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            level TEXT NOT NULL,
            message TEXT NOT NULL,
            user_id TEXT,
            error_details TEXT,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS webhook_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_type TEXT NOT NULL,
            user_id TEXT,
            source_type TEXT,
            source_id TEXT,
            message_id TEXT,
            processed INTEGER NOT NULL DEFAULT 0,
            processing_time_ms INTEGER,
            error_message TEXT,
            created_at TEXT NOT NULL
        );",
    )?;
    Ok(())
}

fn insert_conversation(conn: &Connection, r: &NewConversation) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO conversations (user_id, user_name, message_type, user_message, bot_response,
                                    file_name, file_type, language, response_time_ms, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            r.user_id,
            r.user_name,
            r.message_type.as_str(),
            r.user_message,
            r.bot_response,
            r.file_name,
            r.file_type,
            r.language.code(),
            r.response_time_ms,
            now_timestamp(),
        ],
    )
}

fn insert_webhook_event(conn: &Connection, r: &NewWebhookEvent) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO webhook_events (event_type, user_id, source_type, source_id, message_id,
                                     processed, processing_time_ms, error_message, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            r.event_type,
            r.user_id,
            r.source_type,
            r.source_id,
            r.message_id,
            r.processed,
            r.processing_time_ms,
            r.error_message,
            now_timestamp(),
        ],
    )
}

fn insert_system_log(conn: &Connection, r: &NewSystemLog) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO system_logs (level, message, user_id, error_details, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![r.level, r.message, r.user_id, r.error_details, now_timestamp()],
    )
}

/// Run a count query and a page query. `filter` binds `?1` in the count
/// query and `?3` in the page query.
fn paginate<T>(
    conn: &Connection,
    count_sql: &str,
    page_sql: &str,
    filter: Option<&str>,
    page: u32,
    per_page: u32,
    map_row: impl FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
) -> Result<Page<T>> {
    let limit = i64::from(per_page);
    let offset = i64::from(page.saturating_sub(1)) * limit;

    let total: i64 = match filter {
        Some(f) => conn.query_row(count_sql, params![f], |row| row.get(0))?,
        None => conn.query_row(count_sql, [], |row| row.get(0))?,
    };

    let mut stmt = conn.prepare(page_sql)?;
    let items = match filter {
        Some(f) => stmt
            .query_map(params![limit, offset, f], map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?,
        None => stmt
            .query_map(params![limit, offset], map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?,
    };

    Ok(Page {
        items,
        page,
        per_page,
        total,
    })
}

fn count_since(conn: &Connection, sql: &str, since: &str) -> Result<i64> {
    Ok(conn.query_row(sql, params![since], |row| row.get(0))?)
}

fn group_since(conn: &Connection, sql: &str, since: &str) -> Result<Vec<(String, i64)>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params![since], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn query_stats(conn: &Connection, since: &str) -> Result<Stats> {
    let avg: Option<f64> = conn
        .query_row(
            "SELECT AVG(processing_time_ms) FROM webhook_events
             WHERE created_at >= ?1 AND processing_time_ms IS NOT NULL",
            params![since],
            |row| row.get(0),
        )
        .optional()?
        .flatten();

    let summary = StatsSummary {
        total_conversations: count_since(
            conn,
            "SELECT COUNT(*) FROM conversations WHERE created_at >= ?1",
            since,
        )?,
        total_users: count_since(
            conn,
            "SELECT COUNT(DISTINCT user_id) FROM conversations WHERE created_at >= ?1",
            since,
        )?,
        total_webhooks: count_since(
            conn,
            "SELECT COUNT(*) FROM webhook_events WHERE created_at >= ?1",
            since,
        )?,
        error_count: count_since(
            conn,
            "SELECT COUNT(*) FROM system_logs WHERE created_at >= ?1 AND level IN ('ERROR', 'WARN', 'WARNING')",
            since,
        )?,
        avg_response_time: (avg.unwrap_or(0.0) * 100.0).round() / 100.0,
    };

    let message_types = group_since(
        conn,
        "SELECT message_type, COUNT(*) FROM conversations WHERE created_at >= ?1 GROUP BY message_type",
        since,
    )?;
    let languages = group_since(
        conn,
        "SELECT language, COUNT(*) FROM conversations WHERE created_at >= ?1 GROUP BY language",
        since,
    )?;
    let file_types = group_since(
        conn,
        "SELECT file_type, COUNT(*) FROM conversations
         WHERE created_at >= ?1 AND file_type IS NOT NULL GROUP BY file_type",
        since,
    )?;
    let daily_activity = group_since(
        conn,
        "SELECT substr(created_at, 1, 10) AS day, COUNT(*) FROM conversations
         WHERE created_at >= ?1 GROUP BY day ORDER BY day",
        since,
    )?
    .into_iter()
    .map(|(date, count)| DailyCount { date, count })
    .collect();

    Ok(Stats {
        summary,
        message_types: message_types.into_iter().collect(),
        languages: languages.into_iter().collect(),
        file_types: file_types.into_iter().collect(),
        daily_activity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Language;
    use tempfile::TempDir;

    fn conversation(user: &str, kind: MessageType, lang: Language) -> NewConversation {
        NewConversation::new(user, kind, "question", "answer", lang)
    }

    #[test]
    fn test_insert_and_page_conversations() -> Result<()> {
        let store = LogStore::in_memory()?;
        for i in 0..25 {
            store.insert_conversation(&conversation(&format!("U{}", i), MessageType::Text, Language::Th))?;
        }

        let first = store.conversations(1, 10)?;
        assert_eq!(first.total, 25);
        assert_eq!(first.pages(), 3);
        assert_eq!(first.items.len(), 10);
        assert_eq!(first.items[0].user_id, "U24");

        let last = store.conversations(3, 10)?;
        assert_eq!(last.items.len(), 5);
        Ok(())
    }

    #[test]
    fn test_stats() -> Result<()> {
        let store = LogStore::in_memory()?;
        store.insert_conversation(&conversation("U1", MessageType::Text, Language::Th))?;
        store.insert_conversation(&conversation("U1", MessageType::Image, Language::Th))?;
        store.insert_conversation(
            &conversation("U2", MessageType::File, Language::En).file("a.pdf", "pdf"),
        )?;
        store.insert_webhook_event(&NewWebhookEvent {
            event_type: "message".to_string(),
            processed: true,
            processing_time_ms: Some(100),
            ..Default::default()
        })?;
        store.insert_webhook_event(&NewWebhookEvent {
            event_type: "follow".to_string(),
            processed: true,
            processing_time_ms: Some(201),
            ..Default::default()
        })?;
        store.insert_system_log(&NewSystemLog {
            level: "ERROR".to_string(),
            message: "boom".to_string(),
            user_id: None,
            error_details: None,
        })?;

        let stats = store.stats(7)?;
        assert_eq!(stats.summary.total_conversations, 3);
        assert_eq!(stats.summary.total_users, 2);
        assert_eq!(stats.summary.total_webhooks, 2);
        assert_eq!(stats.summary.error_count, 1);
        assert!((stats.summary.avg_response_time - 150.5).abs() < f64::EPSILON);
        assert_eq!(stats.message_types.get("image"), Some(&1));
        assert_eq!(stats.languages.get("th"), Some(&2));
        assert_eq!(stats.file_types.get("pdf"), Some(&1));
        assert_eq!(stats.daily_activity.len(), 1);
        assert_eq!(stats.daily_activity[0].count, 3);
        Ok(())
    }

    #[test]
    fn test_system_log_level_filter() -> Result<()> {
        let store = LogStore::in_memory()?;
        for level in ["ERROR", "WARN", "ERROR"] {
            store.insert_system_log(&NewSystemLog {
                level: level.to_string(),
                message: "m".to_string(),
                user_id: Some("U1".to_string()),
                error_details: None,
            })?;
        }

        assert_eq!(store.system_logs(1, 20, None)?.total, 3);
        let errors = store.system_logs(1, 20, Some("error"))?;
        assert_eq!(errors.total, 2);
        assert!(errors.items.iter().all(|l| l.level == "ERROR"));
        Ok(())
    }

    #[test]
    fn test_webhook_events_roundtrip() -> Result<()> {
        let store = LogStore::in_memory()?;
        store.insert_webhook_event(&NewWebhookEvent {
            event_type: "message".to_string(),
            user_id: Some("U1".to_string()),
            source_type: Some("user".to_string()),
            message_id: Some("m1".to_string()),
            processed: false,
            error_message: Some("failed".to_string()),
            ..Default::default()
        })?;

        let page = store.webhook_events(1, 20)?;
        assert_eq!(page.items.len(), 1);
        assert!(!page.items[0].processed);
        assert_eq!(page.items[0].error_message.as_deref(), Some("failed"));
        Ok(())
    }

    #[test]
    fn test_cleanup_older_than() -> Result<()> {
        let store = LogStore::in_memory()?;
        store.insert_conversation(&conversation("U1", MessageType::Text, Language::Th))?;
        assert_eq!(store.cleanup_older_than(30)?, 0);
        assert_eq!(store.cleanup_older_than(-1)?, 1);
        Ok(())
    }

    #[test]
    fn test_console_only_store() -> Result<()> {
        let store = LogStore::console_only();
        assert!(!store.is_enabled());
        assert_eq!(store.health(), DatabaseStatus::Disabled);
        assert_eq!(store.insert_conversation(&conversation("U1", MessageType::Text, Language::Th))?, None);
        assert_eq!(store.conversations(1, 20)?.total, 0);
        store.log_conversation(conversation("U1234567890abc", MessageType::Text, Language::Th));
        Ok(())
    }

    #[test]
    fn test_open_creates_file() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("nested").join("bot.db");
        let store = LogStore::open(&path)?;
        assert!(path.exists());
        assert_eq!(store.health(), DatabaseStatus::Healthy);
        Ok(())
    }

    #[tokio::test]
    async fn test_fire_and_forget_write() -> Result<()> {
        let store = LogStore::in_memory()?;
        store.log_conversation(conversation("U1", MessageType::Text, Language::En));

        for _ in 0..50 {
            if store.conversations(1, 20)?.total == 1 {
                return Ok(());
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("conversation was never written");
    }
}
