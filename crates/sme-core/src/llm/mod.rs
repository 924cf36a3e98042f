//! Azure OpenAI client and types

mod client;
mod types;

pub use client::AzureOpenAiClient;
pub use types::*;
