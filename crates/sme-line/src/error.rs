//! エラー型定義 (sme-line)

use thiserror::Error;

/// sme-line のエラー型
#[derive(Error, Debug)]
pub enum LineError {
    #[error("LINE API error: {0}")]
    ApiError(String),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Channel secret not configured")]
    ChannelSecretNotConfigured,

    #[error("Channel access token not configured")]
    AccessTokenNotConfigured,

    #[error(transparent)]
    Core(#[from] sme_core::Error),
}

/// Result 型エイリアス
pub type Result<T> = std::result::Result<T, LineError>;
