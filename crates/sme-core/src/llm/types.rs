//! Azure OpenAI chat completion types

use base64::Engine;
use serde::{Deserialize, Serialize};

/// Chat message (system / user / assistant)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: ChatContent,
}

impl ChatMessage {
    /// Create a system message
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: ChatContent::Text(text.into()),
        }
    }

    /// Create a user message with text
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: ChatContent::Text(text.into()),
        }
    }

    /// Create a user message with text and one image
    pub fn user_with_image(text: impl Into<String>, image: &ImageSource) -> Self {
        Self {
            role: "user".to_string(),
            content: ChatContent::Parts(vec![
                ContentPart::Text { text: text.into() },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: image.to_data_url(),
                    },
                },
            ]),
        }
    }

    /// Create an assistant message with text
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: ChatContent::Text(text.into()),
        }
    }

    /// Get text content from message
    pub fn text_content(&self) -> String {
        match &self.content {
            ChatContent::Text(text) => text.clone(),
            ChatContent::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::ImageUrl { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// Check if message contains an image
    pub fn has_image(&self) -> bool {
        matches!(&self.content, ChatContent::Parts(parts)
            if parts.iter().any(|p| matches!(p, ContentPart::ImageUrl { .. })))
    }
}

/// Message content: plain string or multimodal parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// Multimodal content part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

/// Base64 image payload for multimodal input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSource {
    pub media_type: String,
    pub data: String,
}

impl ImageSource {
    /// Supported image media types
    pub const MEDIA_TYPE_PNG: &'static str = "image/png";
    pub const MEDIA_TYPE_JPEG: &'static str = "image/jpeg";
    pub const MEDIA_TYPE_GIF: &'static str = "image/gif";
    pub const MEDIA_TYPE_WEBP: &'static str = "image/webp";

    /// Create an image source from raw bytes (encodes to base64)
    pub fn from_bytes(media_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            media_type: media_type.into(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    /// Create from raw bytes, detecting the media type from magic bytes
    pub fn sniff(bytes: &[u8]) -> Self {
        Self::from_bytes(Self::detect_media_type(bytes), bytes)
    }

    /// Detect the media type from the first bytes, JPEG when unknown
    pub fn detect_media_type(bytes: &[u8]) -> &'static str {
        if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
            Self::MEDIA_TYPE_PNG
        } else if bytes.starts_with(b"GIF8") {
            Self::MEDIA_TYPE_GIF
        } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Self::MEDIA_TYPE_WEBP
        } else {
            Self::MEDIA_TYPE_JPEG
        }
    }

    /// Decode base64 data to bytes
    pub fn decode(&self) -> Option<Vec<u8>> {
        base64::engine::general_purpose::STANDARD.decode(&self.data).ok()
    }

    /// Convert to a data URL
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }
}

/// Chat completion request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Chat completion response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl ChatCompletionResponse {
    /// Text of the first choice, if any
    pub fn first_text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatChoice {
    #[serde(default)]
    pub index: u32,
    pub message: ResponseMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
}

/// Token usage information
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Builder for chat completion requests
#[derive(Debug, Clone)]
pub struct ChatRequestBuilder {
    system: Option<String>,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

impl Default for ChatRequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatRequestBuilder {
    pub fn new() -> Self {
        Self {
            system: None,
            messages: vec![],
            max_tokens: 1000,
            temperature: 0.7,
        }
    }

    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn message(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }

    pub fn messages(mut self, messages: impl IntoIterator<Item = ChatMessage>) -> Self {
        self.messages.extend(messages);
        self
    }

    pub fn user(mut self, text: impl Into<String>) -> Self {
        self.messages.push(ChatMessage::user(text));
        self
    }

    pub fn build(self) -> ChatCompletionRequest {
        let mut messages = Vec::with_capacity(self.messages.len() + 1);
        if let Some(system) = self.system {
            messages.push(ChatMessage::system(system));
        }
        messages.extend(self.messages);

        ChatCompletionRequest {
            messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}
