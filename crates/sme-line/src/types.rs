//! LINE Messaging API types

use serde::{Deserialize, Serialize};

/// LINE user profile
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineProfile {
    pub display_name: String,
    pub user_id: String,
    #[serde(default)]
    pub picture_url: Option<String>,
    #[serde(default)]
    pub status_message: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

/// Message payload of a `message` event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineMessage {
    #[serde(rename = "type")]
    pub message_type: String,
    pub id: String,
    #[serde(default)]
    pub text: Option<String>,
    /// Set for `file` messages
    #[serde(default)]
    pub file_name: Option<String>,
    /// Set for `file` messages, in bytes
    #[serde(default)]
    pub file_size: Option<u64>,
}

/// LINE source (user, group, or room)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineSource {
    #[serde(rename = "type")]
    pub source_type: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub room_id: Option<String>,
}

impl LineSource {
    /// Group, room or user id, whichever identifies the chat
    pub fn chat_id(&self) -> Option<&str> {
        self.group_id
            .as_deref()
            .or(self.room_id.as_deref())
            .or(self.user_id.as_deref())
    }
}

/// Postback payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinePostback {
    pub data: String,
}

/// LINE event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub reply_token: Option<String>,
    #[serde(default)]
    pub timestamp: i64,
    pub source: LineSource,
    #[serde(default)]
    pub message: Option<LineMessage>,
    #[serde(default)]
    pub postback: Option<LinePostback>,
}

impl LineEvent {
    pub fn user_id(&self) -> Option<&str> {
        self.source.user_id.as_deref()
    }
}

/// Webhook request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookBody {
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub events: Vec<LineEvent>,
}

/// Reply message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyMessage {
    #[serde(rename = "replyToken")]
    pub reply_token: String,
    pub messages: Vec<MessageContent>,
}

/// Push message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushMessage {
    pub to: String,
    pub messages: Vec<MessageContent>,
}

/// Message content
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
#[serde(rename_all = "lowercase")]
pub enum MessageContent {
    Text { text: String },
}

impl MessageContent {
    pub fn text(text: impl Into<String>) -> Self {
        MessageContent::Text { text: text.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_webhook_body() {
        let json = r#"{
            "destination": "Uxxxxxxxx",
            "events": [
                {
                    "type": "message",
                    "replyToken": "reply-1",
                    "timestamp": 1700000000000,
                    "source": {"type": "user", "userId": "U123"},
                    "message": {"type": "file", "id": "m1", "fileName": "report.pdf", "fileSize": 2048}
                },
                {
                    "type": "postback",
                    "replyToken": "reply-2",
                    "timestamp": 1700000000001,
                    "source": {"type": "group", "groupId": "G1", "userId": "U123"},
                    "postback": {"data": "action=buy"}
                }
            ]
        }"#;

        let body: WebhookBody = serde_json::from_str(json).unwrap();
        assert_eq!(body.events.len(), 2);

        let file = &body.events[0];
        assert_eq!(file.user_id(), Some("U123"));
        let message = file.message.as_ref().unwrap();
        assert_eq!(message.file_name.as_deref(), Some("report.pdf"));
        assert_eq!(message.file_size, Some(2048));

        let postback = &body.events[1];
        assert_eq!(postback.postback.as_ref().unwrap().data, "action=buy");
        assert_eq!(postback.source.chat_id(), Some("G1"));
    }

    #[test]
    fn test_reply_serialization() {
        let reply = ReplyMessage {
            reply_token: "token".to_string(),
            messages: vec![MessageContent::text("hi")],
        };
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["replyToken"], "token");
        assert_eq!(json["messages"][0]["type"], "text");
        assert_eq!(json["messages"][0]["text"], "hi");
    }

    #[test]
    fn test_profile_parsing() {
        let profile: LineProfile =
            serde_json::from_str(r#"{"displayName": "Somchai", "userId": "U1", "pictureUrl": "https://x"}"#)
                .unwrap();
        assert_eq!(profile.display_name, "Somchai");
        assert_eq!(profile.picture_url.as_deref(), Some("https://x"));
    }
}
