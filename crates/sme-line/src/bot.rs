//! LINE Bot implementation
//!
//! Wires the LINE client, Azure OpenAI client, session store and limits into
//! a webhook router.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use sme_core::{
    AzureOpenAiClient, Config, InMemorySessionStore, LogStore, RateLimitConfig, RateLimiter, ResponseCache,
};

use crate::api::LineApiClient;
use crate::error::{LineError, Result};
use crate::handler::{HandlerConfig, MessageHandler};
use crate::webhook::{create_webhook_router, WebhookState};

/// How often rate limiter windows and cached answers are swept
const HOUSEKEEPING_INTERVAL: Duration = Duration::from_secs(300);

/// LINE Bot for Thai SMEs
pub struct LineBot {
    channel_secret: String,
    handler: Arc<MessageHandler>,
    session_store: Arc<InMemorySessionStore>,
    rate_limiter: RateLimiter,
    cache: Arc<ResponseCache>,
}

impl LineBot {
    /// Create a new LINE bot from the loaded configuration
    pub fn new(config: &Config, log_store: LogStore) -> Result<Self> {
        if config.line.channel_secret.is_empty() {
            return Err(LineError::ChannelSecretNotConfigured);
        }

        let api_client = LineApiClient::new(&config.line)?;
        let llm = Arc::new(AzureOpenAiClient::new(&config.azure)?);
        Ok(Self::with_client(config, api_client, llm, log_store))
    }

    /// Create with explicit clients
    pub fn with_client(
        config: &Config,
        api_client: LineApiClient,
        llm: Arc<AzureOpenAiClient>,
        log_store: LogStore,
    ) -> Self {
        let session_store = Arc::new(InMemorySessionStore::from_config(&config.bot));
        let rate_limiter = RateLimiter::with_config(RateLimitConfig::from(&config.bot));
        let cache = Arc::new(ResponseCache::default());

        let handler = MessageHandler::new(api_client, llm, session_store.clone(), log_store)
            .with_rate_limiter(rate_limiter.clone())
            .with_cache(cache.clone())
            .with_config(HandlerConfig::default());

        Self {
            channel_secret: config.line.channel_secret.clone(),
            handler: Arc::new(handler),
            session_store,
            rate_limiter,
            cache,
        }
    }

    /// Get the session store
    pub fn session_store(&self) -> Arc<InMemorySessionStore> {
        self.session_store.clone()
    }

    pub fn handler(&self) -> Arc<MessageHandler> {
        self.handler.clone()
    }

    /// Webhook routes (`GET`/`POST /webhook`)
    pub fn router(&self) -> axum::Router {
        create_webhook_router(WebhookState {
            channel_secret: self.channel_secret.clone(),
            handler: self.handler.clone(),
        })
    }

    /// Spawn session expiry and limiter/cache sweeps
    pub fn start_background_tasks(&self) -> Vec<tokio::task::JoinHandle<()>> {
        let sessions = self.session_store.clone().start_cleanup_task();

        let rate_limiter = self.rate_limiter.clone();
        let cache = self.cache.clone();
        let housekeeping = tokio::spawn(async move {
            let mut interval = tokio::time::interval(HOUSEKEEPING_INTERVAL);
            loop {
                interval.tick().await;
                rate_limiter.cleanup().await;
                let purged = cache.purge_expired();
                if purged > 0 {
                    info!("Purged {} expired cached responses", purged);
                }
            }
        });

        vec![sessions, housekeeping]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sme_core::{AzureConfig, LineConfig};

    fn create_test_config() -> Config {
        Config {
            line: LineConfig {
                channel_access_token: "token".to_string(),
                channel_secret: "secret".to_string(),
                ..LineConfig::default()
            },
            azure: AzureConfig {
                api_key: "key".to_string(),
                endpoint: "https://example.openai.azure.com".to_string(),
                ..AzureConfig::default()
            },
            ..Config::default()
        }
    }

    #[test]
    fn test_bot_creation_fails_without_secret() {
        let mut config = create_test_config();
        config.line.channel_secret.clear();

        let result = LineBot::new(&config, LogStore::console_only());
        assert!(matches!(result, Err(LineError::ChannelSecretNotConfigured)));
    }

    #[test]
    fn test_bot_creation_fails_without_token() {
        let mut config = create_test_config();
        config.line.channel_access_token.clear();

        let result = LineBot::new(&config, LogStore::console_only());
        assert!(matches!(result, Err(LineError::AccessTokenNotConfigured)));
    }

    #[tokio::test]
    async fn test_bot_uses_bot_settings() {
        let mut config = create_test_config();
        config.bot.max_conversation_history = 1;

        let bot = LineBot::new(&config, LogStore::console_only()).unwrap();
        let sessions = bot.session_store();
        sessions.add_exchange("U1", "q1", "a1");
        sessions.add_exchange("U1", "q2", "a2");
        assert_eq!(sessions.get("U1").unwrap().exchanges.len(), 1);

        let tasks = bot.start_background_tasks();
        assert_eq!(tasks.len(), 2);
        for task in tasks {
            task.abort();
        }
    }
}
