//! LINE event handler
//!
//! Turns webhook events into Azure OpenAI calls and LINE replies.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use sme_core::cache::{truncate_chars, MAX_INPUT_CHARS};
use sme_core::llm::{ChatCompletionRequest, ChatMessage, ImageSource};
use sme_core::prompts::{self, ErrorKind, PromptKind};
use sme_core::storage::{MessageType, NewConversation, NewWebhookEvent};
use sme_core::{
    AzureOpenAiClient, ComplexityRouter, InMemorySessionStore, Language, LogStore, RateLimiter,
    ResponseCache, Route,
};

use crate::api::LineApiClient;
use crate::error::Result;
use crate::files::{self, FileError};
use crate::types::{LineEvent, LineMessage};

/// Configuration for the message handler
#[derive(Clone, Debug)]
pub struct HandlerConfig {
    /// Maximum characters per LINE text message
    pub max_message_length: usize,
    /// Completion budget for image and file analysis
    pub image_max_tokens: u32,
    pub file_max_tokens: u32,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            max_message_length: 5000,
            image_max_tokens: 1000,
            file_max_tokens: 1500,
        }
    }
}

/// Who an event came from and where to answer
struct EventContext<'a> {
    user_id: &'a str,
    chat_id: &'a str,
    reply_token: Option<&'a str>,
}

/// Message handler for LINE
pub struct MessageHandler {
    api_client: LineApiClient,
    llm: Arc<AzureOpenAiClient>,
    sessions: Arc<InMemorySessionStore>,
    rate_limiter: RateLimiter,
    cache: Arc<ResponseCache>,
    router: ComplexityRouter,
    log_store: LogStore,
    config: HandlerConfig,
}

impl MessageHandler {
    /// Create a new message handler with default limits
    pub fn new(
        api_client: LineApiClient,
        llm: Arc<AzureOpenAiClient>,
        sessions: Arc<InMemorySessionStore>,
        log_store: LogStore,
    ) -> Self {
        Self {
            api_client,
            llm,
            sessions,
            rate_limiter: RateLimiter::new(),
            cache: Arc::new(ResponseCache::default()),
            router: ComplexityRouter::new(),
            log_store,
            config: HandlerConfig::default(),
        }
    }

    pub fn with_rate_limiter(mut self, rate_limiter: RateLimiter) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    pub fn with_cache(mut self, cache: Arc<ResponseCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_config(mut self, config: HandlerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    /// Process one webhook event and record it in `webhook_events`
    pub async fn process_event(&self, event: &LineEvent) -> Result<()> {
        let started = Instant::now();
        let result = self.dispatch(event).await;
        let elapsed = started.elapsed().as_millis() as i64;

        if let Err(e) = &result {
            error!(
                user_id = event.user_id().unwrap_or_default(),
                error_details = %e,
                "Failed to process {} event",
                event.event_type
            );
        }

        self.log_store.log_webhook_event(NewWebhookEvent {
            event_type: event.event_type.clone(),
            user_id: event.user_id().map(str::to_string),
            source_type: Some(event.source.source_type.clone()),
            source_id: event.source.chat_id().map(str::to_string),
            message_id: event.message.as_ref().map(|m| m.id.clone()),
            processed: result.is_ok(),
            processing_time_ms: Some(elapsed),
            error_message: result.as_ref().err().map(|e| e.to_string()),
        });

        result
    }

    async fn dispatch(&self, event: &LineEvent) -> Result<()> {
        let Some(user_id) = event.user_id() else {
            debug!("Ignoring {} event without a user id", event.event_type);
            return Ok(());
        };

        let ctx = EventContext {
            user_id,
            chat_id: event.source.chat_id().unwrap_or(user_id),
            reply_token: event.reply_token.as_deref(),
        };

        match event.event_type.as_str() {
            "message" => match &event.message {
                Some(message) => self.handle_message(&ctx, message).await,
                None => Ok(()),
            },
            "follow" => self.handle_follow(&ctx).await,
            "unfollow" => {
                info!("User unfollowed: {}", user_id);
                self.sessions.remove(user_id);
                Ok(())
            }
            "postback" => {
                let data = event.postback.as_ref().map(|p| p.data.as_str()).unwrap_or_default();
                info!("Postback from {}: {}", user_id, data);
                Ok(())
            }
            other => {
                debug!("Ignoring event type: {}", other);
                Ok(())
            }
        }
    }

    async fn handle_message(&self, ctx: &EventContext<'_>, message: &LineMessage) -> Result<()> {
        match message.message_type.as_str() {
            "text" => {
                let content = message.text.as_deref().unwrap_or_default().trim();
                if content.is_empty() {
                    return Ok(());
                }
                if content.starts_with('/') {
                    return self.handle_command(ctx, content).await;
                }
                self.handle_text(ctx, content).await
            }
            "image" => self.handle_image(ctx, &message.id).await,
            "file" => self.handle_file(ctx, message).await,
            other => {
                debug!("Unsupported message type: {}", other);
                let language = self.sessions.language(ctx.user_id);
                self.send_reply(ctx, prompts::error_message(language, ErrorKind::UnsupportedMessage))
                    .await
            }
        }
    }

    /// Handle commands
    async fn handle_command(&self, ctx: &EventContext<'_>, content: &str) -> Result<()> {
        let mut parts = content.split_whitespace();
        let command = parts.next().unwrap_or_default().to_lowercase();
        let language = self.sessions.language(ctx.user_id);

        match command.as_str() {
            "/help" => self.send_reply(ctx, prompts::help_message(language)).await,
            "/lang" => match parts.next() {
                None => self.send_reply(ctx, &prompts::language_menu()).await,
                Some(code) => match Language::from_code(code) {
                    Some(selected) => {
                        self.sessions.set_language(ctx.user_id, selected);
                        info!("User {} switched language to {}", ctx.user_id, selected.code());
                        self.send_reply(ctx, prompts::language_updated(selected)).await
                    }
                    None => self.send_reply(ctx, prompts::UNSUPPORTED_LANGUAGE).await,
                },
            },
            "/clear" => {
                self.sessions.clear(ctx.user_id);
                self.send_reply(ctx, prompts::history_cleared(language)).await
            }
            "/status" => {
                let history_len = self
                    .sessions
                    .get(ctx.user_id)
                    .map(|s| s.message_count())
                    .unwrap_or(0);
                self.send_reply(ctx, &prompts::status_message(language, history_len))
                    .await
            }
            _ => {
                // Unknown command, treat as regular message
                let clean_content = content.trim_start_matches('/').trim();
                if clean_content.is_empty() {
                    return Ok(());
                }
                self.handle_text(ctx, clean_content).await
            }
        }
    }

    /// Text message: rate limit, language, route, cache, model, reply
    async fn handle_text(&self, ctx: &EventContext<'_>, content: &str) -> Result<()> {
        let current = self.sessions.language(ctx.user_id);

        if !self.rate_limiter.check(ctx.user_id).await {
            return self
                .send_reply(ctx, prompts::error_message(current, ErrorKind::RateLimited))
                .await;
        }

        let language = match Language::detect(content) {
            Some(detected) => {
                if detected != current {
                    self.sessions.set_language(ctx.user_id, detected);
                }
                detected
            }
            None => current,
        };

        let started = Instant::now();
        let input = truncate_chars(content, MAX_INPUT_CHARS);
        let route = self.router.classify(input);
        debug!("Routing message from {} via {}", ctx.user_id, route.as_str());

        let cached = match route {
            Route::FastPath => self.cache.get(language, input),
            Route::FullPipeline => None,
        };

        let response = match cached {
            Some(hit) => hit,
            None => {
                let request = self.text_request(ctx.user_id, language, route, input);
                match self.llm.chat(&request).await {
                    Ok(text) => {
                        if route == Route::FastPath {
                            self.cache.insert(language, input, text.as_str());
                        }
                        text
                    }
                    Err(e) => {
                        error!(user_id = ctx.user_id, error_details = %e, "Azure OpenAI call failed");
                        return self
                            .send_reply(ctx, prompts::error_message(language, ErrorKind::OpenAiError))
                            .await;
                    }
                }
            }
        };

        self.send_reply(ctx, &response).await?;
        self.sessions.add_exchange(ctx.user_id, input, &response);

        let record = NewConversation::new(ctx.user_id, MessageType::Text, content, response, language)
            .response_time_ms(started.elapsed().as_millis() as i64);
        self.log_conversation(record).await;

        Ok(())
    }

    fn text_request(&self, user_id: &str, language: Language, route: Route, input: &str) -> ChatCompletionRequest {
        let mut builder = self
            .llm
            .request_builder()
            .system(prompts::system_prompt(language, PromptKind::Conversation))
            .max_tokens(route.max_tokens());

        if route.uses_history() {
            if let Some(session) = self.sessions.get(user_id) {
                builder = builder.messages(session.history());
            }
        }

        builder.user(input).build()
    }

    /// Image message: download, sniff, multimodal request
    async fn handle_image(&self, ctx: &EventContext<'_>, message_id: &str) -> Result<()> {
        let language = self.sessions.language(ctx.user_id);
        let started = Instant::now();

        let bytes = match self.api_client.get_message_content(message_id).await {
            Ok(bytes) if !bytes.is_empty() => bytes,
            Ok(_) => {
                warn!("Empty image content for message {}", message_id);
                return self
                    .send_reply(ctx, prompts::error_message(language, ErrorKind::InvalidImage))
                    .await;
            }
            Err(e) => {
                error!(user_id = ctx.user_id, error_details = %e, "Failed to download image");
                return self
                    .send_reply(ctx, prompts::error_message(language, ErrorKind::InvalidImage))
                    .await;
            }
        };

        let image = ImageSource::sniff(&bytes);
        debug!("Image {} is {} ({} bytes)", message_id, image.media_type, bytes.len());

        let request = self
            .llm
            .request_builder()
            .system(prompts::system_prompt(language, PromptKind::ImageAnalysis))
            .max_tokens(self.config.image_max_tokens)
            .message(ChatMessage::user_with_image(
                prompts::default_image_request(language),
                &image,
            ))
            .build();

        let response = match self.llm.chat(&request).await {
            Ok(text) => text,
            Err(e) => {
                error!(user_id = ctx.user_id, error_details = %e, "Image analysis failed");
                return self
                    .send_reply(ctx, prompts::error_message(language, ErrorKind::OpenAiError))
                    .await;
            }
        };

        self.send_reply(ctx, &response).await?;

        let record = NewConversation::new(ctx.user_id, MessageType::Image, "[Image uploaded]", response, language)
            .response_time_ms(started.elapsed().as_millis() as i64);
        self.log_conversation(record).await;

        Ok(())
    }

    /// File message: validate, download, extract, summarize
    async fn handle_file(&self, ctx: &EventContext<'_>, message: &LineMessage) -> Result<()> {
        let language = self.sessions.language(ctx.user_id);
        let started = Instant::now();
        let file_name = message.file_name.as_deref().unwrap_or("file");

        // Reject early on the size LINE reports, before downloading
        if let Err(e) = files::validate(file_name, message.file_size.unwrap_or(0)) {
            return self.reply_file_error(ctx, language, file_name, &e).await;
        }

        let bytes = match self.api_client.get_message_content(&message.id).await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(user_id = ctx.user_id, error_details = %e, "Failed to download file {}", file_name);
                return self
                    .send_reply(ctx, prompts::error_message(language, ErrorKind::ProcessingError))
                    .await;
            }
        };

        let content = match extract_off_runtime(file_name, bytes).await {
            Ok(text) => files::truncate_content(&text),
            Err(e) => return self.reply_file_error(ctx, language, file_name, &e).await,
        };

        let prompt = prompts::file_prompt(file_name, &content, prompts::default_file_request(language));
        let request = self
            .llm
            .request_builder()
            .system(prompts::system_prompt(language, PromptKind::FileAnalysis))
            .max_tokens(self.config.file_max_tokens)
            .user(prompt)
            .build();

        let response = match self.llm.chat(&request).await {
            Ok(text) => text,
            Err(e) => {
                error!(user_id = ctx.user_id, error_details = %e, "File analysis failed");
                return self
                    .send_reply(ctx, prompts::error_message(language, ErrorKind::OpenAiError))
                    .await;
            }
        };

        self.send_reply(ctx, &response).await?;

        let record = NewConversation::new(
            ctx.user_id,
            MessageType::File,
            format!("[File uploaded: {}]", file_name),
            response,
            language,
        )
        .file(file_name, files::file_type(file_name).unwrap_or_default())
        .response_time_ms(started.elapsed().as_millis() as i64);
        self.log_conversation(record).await;

        Ok(())
    }

    async fn reply_file_error(
        &self,
        ctx: &EventContext<'_>,
        language: Language,
        file_name: &str,
        err: &FileError,
    ) -> Result<()> {
        warn!(user_id = ctx.user_id, "Rejected file {}: {}", file_name, err);
        let kind = match err {
            FileError::TooLarge(_) => ErrorKind::FileTooLarge,
            FileError::Unsupported(_) => ErrorKind::UnsupportedFile,
            FileError::InvalidEncoding | FileError::Extraction(_) => ErrorKind::ProcessingError,
        };
        self.send_reply(ctx, prompts::error_message(language, kind)).await
    }

    async fn handle_follow(&self, ctx: &EventContext<'_>) -> Result<()> {
        let name = self
            .display_name(ctx.user_id)
            .await
            .unwrap_or_else(|| "there".to_string());
        info!("New follower: {}", ctx.user_id);

        let language = self.sessions.language(ctx.user_id);
        self.send_reply(ctx, &prompts::welcome_message(language, &name)).await
    }

    /// Display name from the profile API; failures are not fatal
    async fn display_name(&self, user_id: &str) -> Option<String> {
        match self.api_client.get_profile(user_id).await {
            Ok(profile) => Some(profile.display_name),
            Err(e) => {
                debug!("Could not fetch profile for {}: {}", user_id, e);
                None
            }
        }
    }

    async fn log_conversation(&self, record: NewConversation) {
        let record = if self.log_store.is_enabled() {
            let name = self.display_name(&record.user_id).await;
            record.user_name(name)
        } else {
            record
        };
        self.log_store.log_conversation(record);
    }

    /// Send a reply, pushing whatever does not fit in the reply call
    async fn send_reply(&self, ctx: &EventContext<'_>, text: &str) -> Result<()> {
        let chunks = split_message(text, self.config.max_message_length);
        let Some((first, rest)) = chunks.split_first() else {
            return Ok(());
        };

        let Some(token) = ctx.reply_token else {
            return self.api_client.push_messages(ctx.chat_id, &chunks).await;
        };

        if let Err(e) = self.api_client.reply_message(token, first).await {
            warn!("Reply failed, falling back to push: {}", e);
            return self.api_client.push_messages(ctx.chat_id, &chunks).await;
        }

        if !rest.is_empty() {
            tokio::time::sleep(Duration::from_millis(100)).await;
            self.api_client.push_messages(ctx.chat_id, rest).await?;
        }

        Ok(())
    }
}

/// Parse the file on the blocking pool; a panicking parser becomes an extraction error
async fn extract_off_runtime(file_name: &str, bytes: Vec<u8>) -> std::result::Result<String, FileError> {
    let name = file_name.to_string();
    tokio::task::spawn_blocking(move || files::extract_text(&name, &bytes))
        .await
        .unwrap_or_else(|e| Err(FileError::Extraction(format!("extraction task failed: {}", e))))
}

/// Split text into chunks of at most `max_chars` characters, preferring
/// paragraph, line, sentence and word boundaries
pub fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    const BREAKS: [&str; 5] = ["\n\n", "\n", "。", ". ", " "];
    let max_chars = max_chars.max(1);

    let mut chunks = Vec::new();
    let mut remaining = text.trim();

    while !remaining.is_empty() {
        let limit = match remaining.char_indices().nth(max_chars) {
            Some((idx, _)) => idx,
            None => {
                chunks.push(remaining.to_string());
                break;
            }
        };

        let window = &remaining[..limit];
        let break_point = BREAKS
            .iter()
            .find_map(|sep| window.rfind(sep).map(|i| i + sep.len()))
            .unwrap_or(limit);

        let piece = remaining[..break_point].trim_end();
        if !piece.is_empty() {
            chunks.push(piece.to_string());
        }
        remaining = remaining[break_point..].trim_start();
    }

    chunks
}
