//! Configuration management
//!
//! 設定は以下の優先順位で読み込まれます:
//! 1. 環境変数
//! 2. sme-bot.toml 設定ファイル
//! 3. デフォルト値
//!
//! 設定ファイル内では `${VAR_NAME}` 形式で環境変数を展開できます。

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// Default config file looked up by [`Config::load`]
pub const CONFIG_FILE: &str = "sme-bot.toml";

/// LINE Messaging API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineConfig {
    /// Channel access token (Bearer token for the messaging API)
    pub channel_access_token: String,
    /// Channel secret (HMAC key for webhook signatures)
    pub channel_secret: String,
    /// Messaging API base URL
    #[serde(default = "default_line_api_base")]
    pub api_base_url: String,
    /// Content (data) API base URL
    #[serde(default = "default_line_data_base")]
    pub data_base_url: String,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            channel_access_token: String::new(),
            channel_secret: String::new(),
            api_base_url: default_line_api_base(),
            data_base_url: default_line_data_base(),
        }
    }
}

/// Azure OpenAI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureConfig {
    /// API key sent in the `api-key` header
    pub api_key: String,
    /// Resource endpoint, e.g. `https://my-resource.openai.azure.com`
    pub endpoint: String,
    /// Deployment name
    #[serde(default = "default_deployment")]
    pub deployment: String,
    /// REST API version
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Request timeout in seconds
    #[serde(default = "default_azure_timeout")]
    pub timeout_secs: u64,
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: String::new(),
            deployment: default_deployment(),
            api_version: default_api_version(),
            timeout_secs: default_azure_timeout(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind host
    #[serde(default = "default_host")]
    pub host: String,
    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bearer key protecting `/api/*`. None = open.
    pub admin_api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            admin_api_key: None,
        }
    }
}

/// Log database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    #[serde(default = "default_db_path")]
    pub path: String,
    /// Skip the database and only write conversation logs to the console
    #[serde(default)]
    pub console_only: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            console_only: false,
        }
    }
}

/// Conversation behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Messages a user may send per window
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_user: u32,
    /// Rate limit window in seconds
    #[serde(default = "default_rate_window")]
    pub rate_limit_window_secs: u64,
    /// Exchanges kept per user for prompting
    #[serde(default = "default_history")]
    pub max_conversation_history: usize,
    /// Idle seconds before a session is dropped
    #[serde(default = "default_session_timeout")]
    pub session_timeout_secs: u64,
    /// Language used before anything is detected
    #[serde(default = "default_language")]
    pub default_language: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            rate_limit_per_user: default_rate_limit(),
            rate_limit_window_secs: default_rate_window(),
            max_conversation_history: default_history(),
            session_timeout_secs: default_session_timeout(),
            default_language: default_language(),
        }
    }
}

/// Main configuration for the bot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub line: LineConfig,
    #[serde(default)]
    pub azure: AzureConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub bot: BotConfig,
}

fn default_line_api_base() -> String {
    "https://api.line.me".to_string()
}

fn default_line_data_base() -> String {
    "https://api-data.line.me".to_string()
}

fn default_deployment() -> String {
    "gpt-4.1-nano".to_string()
}

fn default_api_version() -> String {
    "2024-02-01".to_string()
}

fn default_azure_timeout() -> u64 {
    30
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_db_path() -> String {
    "data/sme-bot.db".to_string()
}

fn default_rate_limit() -> u32 {
    10
}

fn default_rate_window() -> u64 {
    60
}

fn default_history() -> usize {
    10
}

fn default_session_timeout() -> u64 {
    3600
}

fn default_language() -> String {
    "th".to_string()
}

impl Config {
    /// 文字列内の `${VAR_NAME}` を環境変数の値に置換する
    ///
    /// 環境変数が存在しない場合は空文字列になります。
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::new();
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next();

                let mut var_name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    var_name.push(c);
                }

                if let Ok(env_value) = std::env::var(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// TOML 設定ファイルから設定を読み込む
    ///
    /// 設定ファイル内の `${VAR_NAME}` は環境変数の値に置換され、
    /// その後、環境変数で上書きされます。
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let toml_content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let mut cfg = Self::from_toml_str(&toml_content)?;
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    /// Parse TOML text (after `${VAR}` expansion) without env overrides
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let expanded = Self::expand_env_vars(content);
        toml::from_str(&expanded).map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// デフォルトパスから設定を読み込む
    ///
    /// `./sme-bot.toml` があればそれを使い、なければ環境変数のみ。
    pub fn load() -> Result<Self> {
        if Path::new(CONFIG_FILE).exists() {
            return Self::from_toml_file(CONFIG_FILE);
        }
        Self::from_env()
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    /// 環境変数で設定を上書きする
    fn apply_env_overrides(&mut self) {
        fn non_empty(name: &str) -> Option<String> {
            std::env::var(name).ok().filter(|v| !v.is_empty())
        }

        fn parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
            non_empty(name).and_then(|v| v.trim().parse().ok())
        }

        fn flag(name: &str) -> Option<bool> {
            non_empty(name).map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        }

        // LINE
        if let Some(token) = non_empty("LINE_CHANNEL_ACCESS_TOKEN") {
            self.line.channel_access_token = token;
        }
        if let Some(secret) = non_empty("LINE_CHANNEL_SECRET") {
            self.line.channel_secret = secret;
        }
        if let Some(url) = non_empty("LINE_API_BASE_URL") {
            self.line.api_base_url = url;
        }
        if let Some(url) = non_empty("LINE_DATA_BASE_URL") {
            self.line.data_base_url = url;
        }

        // Azure OpenAI
        if let Some(key) = non_empty("AZURE_OPENAI_API_KEY") {
            self.azure.api_key = key;
        }
        if let Some(endpoint) = non_empty("AZURE_OPENAI_ENDPOINT") {
            self.azure.endpoint = endpoint;
        }
        if let Some(deployment) =
            non_empty("AZURE_OPENAI_DEPLOYMENT").or_else(|| non_empty("AZURE_OPENAI_DEPLOYMENT_NAME"))
        {
            self.azure.deployment = deployment;
        }
        if let Some(version) = non_empty("AZURE_OPENAI_API_VERSION") {
            self.azure.api_version = version;
        }
        if let Some(timeout) = parsed("AZURE_OPENAI_TIMEOUT_SECS") {
            self.azure.timeout_secs = timeout;
        }

        // Server
        if let Some(host) = non_empty("HOST") {
            self.server.host = host;
        }
        if let Some(port) = parsed("PORT") {
            self.server.port = port;
        }
        if let Some(key) = non_empty("ADMIN_API_KEY") {
            self.server.admin_api_key = Some(key);
        }

        // Database
        if let Some(path) = non_empty("DATABASE_PATH") {
            self.database.path = path;
        }
        if let Some(console_only) = flag("CONSOLE_ONLY_LOGGING") {
            self.database.console_only = console_only;
        }

        // Bot
        if let Some(limit) = parsed("RATE_LIMIT_PER_USER") {
            self.bot.rate_limit_per_user = limit;
        }
        if let Some(window) = parsed("RATE_LIMIT_WINDOW_SECS") {
            self.bot.rate_limit_window_secs = window;
        }
        if let Some(history) = parsed("MAX_CONVERSATION_HISTORY") {
            self.bot.max_conversation_history = history;
        }
        if let Some(timeout) = parsed("SESSION_TIMEOUT_SECS") {
            self.bot.session_timeout_secs = timeout;
        }
        if let Some(language) = non_empty("DEFAULT_LANGUAGE") {
            self.bot.default_language = language.to_lowercase();
        }
    }

    /// Names of required settings that are still empty
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.line.channel_access_token.is_empty() {
            missing.push("LINE_CHANNEL_ACCESS_TOKEN");
        }
        if self.line.channel_secret.is_empty() {
            missing.push("LINE_CHANNEL_SECRET");
        }
        if self.azure.api_key.is_empty() {
            missing.push("AZURE_OPENAI_API_KEY");
        }
        if self.azure.endpoint.is_empty() {
            missing.push("AZURE_OPENAI_ENDPOINT");
        }
        missing
    }

    /// Fail when any required setting is missing
    pub fn validate(&self) -> Result<()> {
        let missing = self.missing_required();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::Config(format!(
                "Missing required environment variables: {}",
                missing.join(", ")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.azure.deployment, "gpt-4.1-nano");
        assert_eq!(config.azure.api_version, "2024-02-01");
        assert_eq!(config.database.path, "data/sme-bot.db");
        assert!(!config.database.console_only);
        assert_eq!(config.bot.max_conversation_history, 10);
        assert_eq!(config.bot.default_language, "th");
        assert_eq!(config.line.api_base_url, "https://api.line.me");
    }

    #[test]
    fn test_missing_required() {
        let mut config = Config::default();
        assert_eq!(config.missing_required().len(), 4);
        assert!(config.validate().is_err());

        config.line.channel_access_token = "token".to_string();
        config.line.channel_secret = "secret".to_string();
        config.azure.api_key = "key".to_string();
        config.azure.endpoint = "https://example.openai.azure.com".to_string();
        assert!(config.missing_required().is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_expand_env_vars() {
        unsafe {
            std::env::set_var("SME_BOT_TEST_VAR", "test_value");
        }

        let result = Config::expand_env_vars("prefix_${SME_BOT_TEST_VAR}_suffix");
        assert_eq!(result, "prefix_test_value_suffix");

        let result = Config::expand_env_vars("prefix_${SME_BOT_NONEXISTENT_VAR}_suffix");
        assert_eq!(result, "prefix__suffix");

        unsafe {
            std::env::remove_var("SME_BOT_TEST_VAR");
        }
    }

    #[test]
    fn test_expand_env_vars_passthrough() {
        assert_eq!(Config::expand_env_vars("no_vars_here"), "no_vars_here");
        assert_eq!(Config::expand_env_vars("${}_content"), "_content");
        assert_eq!(Config::expand_env_vars("price: $5"), "price: $5");
    }

    #[test]
    fn test_toml_config_parsing() {
        let toml_content = r#"
[line]
channel_access_token = "line_token"
channel_secret = "line_secret"

[azure]
api_key = "azure_key"
endpoint = "https://example.openai.azure.com"
deployment = "gpt-4o-mini"

[server]
port = 8080
admin_api_key = "admin"

[database]
path = "/tmp/bot.db"
console_only = true

[bot]
rate_limit_per_user = 3
default_language = "en"
"#;

        let config = Config::from_toml_str(toml_content).unwrap();
        assert_eq!(config.line.channel_access_token, "line_token");
        assert_eq!(config.line.data_base_url, "https://api-data.line.me");
        assert_eq!(config.azure.deployment, "gpt-4o-mini");
        assert_eq!(config.azure.api_version, "2024-02-01");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.admin_api_key.as_deref(), Some("admin"));
        assert!(config.database.console_only);
        assert_eq!(config.bot.rate_limit_per_user, 3);
        assert_eq!(config.bot.rate_limit_window_secs, 60);
        assert_eq!(config.bot.default_language, "en");
    }

    #[test]
    fn test_toml_partial_sections() {
        let config = Config::from_toml_str("[server]\nport = 9000\n").unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert!(config.line.channel_secret.is_empty());
    }

    #[test]
    fn test_toml_invalid() {
        let result = Config::from_toml_str("[server\nport = ");
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
