//! sme-line: LINE Official Account webhook for Thai SMEs
//!
//! LINE Messaging API の Webhook を受け取り、テキスト・画像・ファイルを
//! Azure OpenAI に渡して返信します。署名検証、ファイル抽出、返信分割を実装します。

pub mod api;
pub mod bot;
pub mod error;
pub mod files;
pub mod handler;
pub mod types;
pub mod webhook;

pub use bot::LineBot;
pub use error::{LineError, Result};
pub use handler::MessageHandler;
