//! Log row types

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::language::Language;

/// Kind of logged conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Text,
    Image,
    File,
    System,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Text => "text",
            MessageType::Image => "image",
            MessageType::File => "file",
            MessageType::System => "system",
        }
    }
}

/// New conversation row
#[derive(Debug, Clone)]
pub struct NewConversation {
    pub user_id: String,
    pub user_name: Option<String>,
    pub message_type: MessageType,
    pub user_message: String,
    pub bot_response: String,
    pub file_name: Option<String>,
    pub file_type: Option<String>,
    pub language: Language,
    pub response_time_ms: Option<i64>,
}

impl NewConversation {
    pub fn new(
        user_id: impl Into<String>,
        message_type: MessageType,
        user_message: impl Into<String>,
        bot_response: impl Into<String>,
        language: Language,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            user_name: None,
            message_type,
            user_message: user_message.into(),
            bot_response: bot_response.into(),
            file_name: None,
            file_type: None,
            language,
            response_time_ms: None,
        }
    }

    pub fn user_name(mut self, name: Option<String>) -> Self {
        self.user_name = name;
        self
    }

    pub fn file(mut self, name: impl Into<String>, file_type: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self.file_type = Some(file_type.into());
        self
    }

    pub fn response_time_ms(mut self, ms: i64) -> Self {
        self.response_time_ms = Some(ms);
        self
    }
}

/// New webhook event row
#[derive(Debug, Clone, Default)]
pub struct NewWebhookEvent {
    pub event_type: String,
    pub user_id: Option<String>,
    pub source_type: Option<String>,
    pub source_id: Option<String>,
    pub message_id: Option<String>,
    pub processed: bool,
    pub processing_time_ms: Option<i64>,
    pub error_message: Option<String>,
}

/// New system log row
#[derive(Debug, Clone)]
pub struct NewSystemLog {
    pub level: String,
    pub message: String,
    pub user_id: Option<String>,
    pub error_details: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRow {
    pub id: i64,
    pub user_id: String,
    pub user_name: Option<String>,
    pub message_type: String,
    pub user_message: Option<String>,
    pub bot_response: Option<String>,
    pub file_name: Option<String>,
    pub file_type: Option<String>,
    pub language: String,
    pub response_time_ms: Option<i64>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEventRow {
    pub id: i64,
    pub event_type: String,
    pub user_id: Option<String>,
    pub source_type: Option<String>,
    pub source_id: Option<String>,
    pub message_id: Option<String>,
    pub processed: bool,
    pub processing_time_ms: Option<i64>,
    pub error_message: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemLogRow {
    pub id: i64,
    pub level: String,
    pub message: String,
    pub user_id: Option<String>,
    pub error_details: Option<String>,
    pub created_at: String,
}

/// One page of rows, newest first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn empty(page: u32, per_page: u32) -> Self {
        Self {
            items: Vec::new(),
            page,
            per_page,
            total: 0,
        }
    }

    /// Number of pages (at least zero)
    pub fn pages(&self) -> i64 {
        if self.per_page == 0 {
            return 0;
        }
        let per_page = i64::from(self.per_page);
        (self.total + per_page - 1) / per_page
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsSummary {
    pub total_conversations: i64,
    pub total_users: i64,
    pub total_webhooks: i64,
    pub error_count: i64,
    /// Mean webhook processing time in milliseconds
    pub avg_response_time: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: String,
    pub count: i64,
}

/// Dashboard statistics for a trailing window of days
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Stats {
    pub summary: StatsSummary,
    pub message_types: BTreeMap<String, i64>,
    pub languages: BTreeMap<String, i64>,
    pub file_types: BTreeMap<String, i64>,
    pub daily_activity: Vec<DailyCount>,
}
