//! # genbridge-core
//!
//! Provider-agnostic content generation types for genbridge.
//!
//! ## Overview
//!
//! A host talks to every model provider through the same vocabulary:
//!
//! - [`GenerateContentRequest`] - ordered [`Content`] turns made of [`Part`]s,
//!   plus optional [`GenerateContentConfig`] (system instruction, sampling, tools)
//! - [`GenerateContentResponse`] - role-tagged [`Candidate`]s with a normalized
//!   [`FinishReason`] and optional [`UsageMetadata`]
//! - [`ContentGenerator`] - the capability trait a provider adapter implements
//! - [`BridgeError`] / [`Result`] - unified error handling
//!
//! ## Quick Start
//!
//! ```rust
//! use genbridge_core::{Content, GenerateContentRequest};
//!
//! let request = GenerateContentRequest::new(
//!     "gemini-2.5-pro",
//!     vec![Content::user().with_text("Hello")],
//! )
//! .with_system_instruction("Answer in one sentence.");
//!
//! assert_eq!(request.contents.len(), 1);
//! ```

pub mod error;
pub mod generator;
pub mod model;
pub mod stream;
pub mod types;

pub use error::{BridgeError, Result};
pub use generator::{ContentGenerator, ResponseStream};
pub use model::{
    Candidate, ContentEmbedding, CountTokensRequest, CountTokensResponse, EmbedContentRequest,
    EmbedContentResponse, FinishReason, GenerateContentConfig, GenerateContentRequest,
    GenerateContentResponse, SystemInstruction, UsageMetadata,
};
pub use stream::aggregate_stream;
pub use types::{Content, FunctionCall, FunctionDeclaration, FunctionResponse, Part, Role, Tool};
