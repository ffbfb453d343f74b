//! Azure OpenAI chat completions client.

use crate::config::{AzureOpenAIConfig, ToolCallMode};
use crate::convert;
use crate::streaming::decode_stream;
use crate::token_count::estimate_tokens;
use crate::wire::{ChatCompletionRequest, ChatCompletionResponse};
use async_trait::async_trait;
use genbridge_core::{
    BridgeError, ContentGenerator, CountTokensRequest, CountTokensResponse, EmbedContentRequest,
    EmbedContentResponse, GenerateContentRequest, GenerateContentResponse, Result, ResponseStream,
};
use genbridge_telemetry::model_call_span;
use reqwest::Client;
use tracing::Instrument;

/// REST API version sent with every call.
pub const API_VERSION: &str = "2024-10-21";

/// Azure OpenAI client bound to one deployment.
///
/// The host's requested model name is ignored; every call goes to the
/// configured deployment. Calls are never retried.
///
/// # Example
///
/// ```rust,no_run
/// use genbridge_azure::{AzureOpenAIClient, AzureOpenAIConfig};
/// use genbridge_core::{Content, ContentGenerator, GenerateContentRequest};
///
/// # async fn run() -> genbridge_core::Result<()> {
/// let client = AzureOpenAIClient::new(AzureOpenAIConfig::from_env()?)?;
/// let contents = vec![Content::user().with_text("Hi")];
/// let request = GenerateContentRequest::new("gemini-2.5-pro", contents);
/// let response = client.generate_content(request, "prompt-1").await?;
/// println!("{}", response.text());
/// # Ok(())
/// # }
/// ```
pub struct AzureOpenAIClient {
    client: Client,
    endpoint: String,
    api_key: String,
    deployment: String,
    max_tokens: u32,
    tool_call_mode: ToolCallMode,
}

impl AzureOpenAIClient {
    pub fn new(config: AzureOpenAIConfig) -> Result<Self> {
        if config.endpoint.trim().is_empty() {
            return Err(BridgeError::Config("endpoint must not be empty".to_string()));
        }
        if config.api_key.is_empty() {
            return Err(BridgeError::Config("api_key must not be empty".to_string()));
        }

        let client = Client::builder()
            .build()
            .map_err(|e| BridgeError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            deployment: config.deployment,
            max_tokens: config.max_tokens,
            tool_call_mode: config.tool_call_mode,
        })
    }

    pub fn deployment(&self) -> &str {
        &self.deployment
    }

    pub fn tool_call_mode(&self) -> ToolCallMode {
        self.tool_call_mode
    }

    fn api_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={API_VERSION}",
            self.endpoint, self.deployment
        )
    }

    /// POST the body and fail on any non-2xx status.
    async fn send(&self, body: &ChatCompletionRequest) -> Result<reqwest::Response> {
        tracing::debug!(
            deployment = %self.deployment,
            messages = body.messages.len(),
            tools = body.tools.as_ref().map_or(0, Vec::len),
            stream = body.stream.unwrap_or(false),
            "sending Azure OpenAI chat completions request"
        );

        let response = self
            .client
            .post(self.api_url())
            .header("api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| BridgeError::Transport(format!("Azure OpenAI request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BridgeError::Api {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
                body,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl ContentGenerator for AzureOpenAIClient {
    async fn generate_content(
        &self,
        request: GenerateContentRequest,
        prompt_id: &str,
    ) -> Result<GenerateContentResponse> {
        let span = model_call_span(&self.deployment, prompt_id, false);
        async move {
            let body = convert::build_request(&self.deployment, self.max_tokens, &request, false);
            let response = self.send(&body).await?;
            let payload: ChatCompletionResponse = response.json().await.map_err(|e| {
                BridgeError::Transport(format!("Failed to read Azure OpenAI response: {e}"))
            })?;
            convert::parse_response(payload)
        }
        .instrument(span)
        .await
    }

    async fn generate_content_stream(
        &self,
        request: GenerateContentRequest,
        prompt_id: &str,
    ) -> Result<ResponseStream> {
        let span = model_call_span(&self.deployment, prompt_id, true);
        async move {
            let body = convert::build_request(&self.deployment, self.max_tokens, &request, true);
            let response = self.send(&body).await?;
            Ok(decode_stream(response.bytes_stream(), self.tool_call_mode))
        }
        .instrument(span)
        .await
    }

    async fn count_tokens(&self, request: CountTokensRequest) -> Result<CountTokensResponse> {
        let total_tokens = estimate_tokens(&request.contents)?;
        Ok(CountTokensResponse { total_tokens })
    }

    async fn embed_content(&self, _request: EmbedContentRequest) -> Result<EmbedContentResponse> {
        Err(BridgeError::Unsupported(
            "Embeddings are not supported by the Azure OpenAI adapter".to_string(),
        ))
    }
}
