//! sme-core: Thai SME LINE Bot Core Library
//!
//! Azure OpenAI との通信、会話メモリ、言語判定、プロンプト、
//! レート制限・サーキットブレーカー、SQLite ログストアのコア機能を提供します。

pub mod cache;
pub mod config;
pub mod error;
pub mod language;
pub mod llm;
pub mod prompts;
pub mod resilience;
pub mod routing;
pub mod session;
pub mod storage;

pub use cache::ResponseCache;
pub use config::{AzureConfig, BotConfig, Config, DatabaseConfig, LineConfig, ServerConfig};
pub use error::{Error, Result};
pub use language::Language;
pub use llm::{AzureOpenAiClient, ChatMessage, ChatRequestBuilder, ImageSource};
pub use resilience::{CircuitBreaker, CircuitState, RateLimitConfig, RateLimiter};
pub use routing::{ComplexityRouter, Route};
pub use session::{InMemorySessionStore, Session};
pub use storage::{DatabaseStatus, LogStore, SystemLogLayer};
