//! # genbridge-azure
//!
//! Azure OpenAI chat completions behind the genbridge [`ContentGenerator`] trait.
//!
//! The adapter translates the host's Gemini-style requests into chat completions
//! calls against a single deployment and translates responses back:
//!
//! - every turn becomes one plain-text message, with function calls and
//!   responses rendered as text
//! - declared functions are forwarded as `function` tools
//! - streamed `text/event-stream` bodies are decoded incrementally into
//!   response fragments, see [`ToolCallMode`] for how tool calls are assembled
//! - token counting is a local estimate and embeddings are unsupported
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use genbridge_azure::{AzureOpenAIClient, AzureOpenAIConfig};
//! use genbridge_core::{Content, ContentGenerator, GenerateContentRequest};
//!
//! # async fn run() -> genbridge_core::Result<()> {
//! let config = AzureOpenAIConfig::new("https://my-resource.openai.azure.com", "my-api-key");
//! let client = AzureOpenAIClient::new(config)?;
//!
//! let request = GenerateContentRequest::new("any-model", vec![Content::user().with_text("Hi")]);
//! let mut stream = client.generate_content_stream(request, "prompt-1").await?;
//! while let Some(fragment) = stream.next().await {
//!     print!("{}", fragment?.text());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! [`ContentGenerator`]: genbridge_core::ContentGenerator

mod client;
mod config;
mod convert;
mod streaming;
mod token_count;
mod wire;

pub use client::{API_VERSION, AzureOpenAIClient};
pub use config::{
    API_KEY_ENV, AzureOpenAIConfig, DEFAULT_DEPLOYMENT, DEFAULT_MAX_TOKENS, DEPLOYMENT_ENV,
    ENDPOINT_ENV, ToolCallMode,
};
pub use token_count::estimate_tokens;
