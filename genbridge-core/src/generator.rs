use crate::Result;
use crate::model::{
    CountTokensRequest, CountTokensResponse, EmbedContentRequest, EmbedContentResponse,
    GenerateContentRequest, GenerateContentResponse,
};
use async_trait::async_trait;
use futures::stream::Stream;
use std::pin::Pin;

pub type ResponseStream = Pin<Box<dyn Stream<Item = Result<GenerateContentResponse>> + Send>>;

/// The capability set a host expects from every model provider.
///
/// `prompt_id` is a host-side correlation id. Implementations record it for
/// tracing and must not let it influence the request they send.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate_content(
        &self,
        request: GenerateContentRequest,
        prompt_id: &str,
    ) -> Result<GenerateContentResponse>;

    /// Returns a lazy, finite stream of response fragments from a single provider call.
    async fn generate_content_stream(
        &self,
        request: GenerateContentRequest,
        prompt_id: &str,
    ) -> Result<ResponseStream>;

    async fn count_tokens(&self, request: CountTokensRequest) -> Result<CountTokensResponse>;

    async fn embed_content(&self, request: EmbedContentRequest) -> Result<EmbedContentResponse>;
}
