//! Configuration types for the Azure OpenAI adapter.

use genbridge_core::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Deployment used when none is configured.
pub const DEFAULT_DEPLOYMENT: &str = "gpt-4o";

/// Response-length ceiling sent as `max_tokens` when none is configured.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

pub const ENDPOINT_ENV: &str = "AZURE_OPENAI_ENDPOINT";
pub const API_KEY_ENV: &str = "AZURE_OPENAI_API_KEY";
pub const DEPLOYMENT_ENV: &str = "AZURE_OPENAI_DEPLOYMENT";

/// How streamed tool-call fragments become function-call parts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallMode {
    /// Emit a call only when one chunk carries its name and complete arguments.
    /// Calls whose arguments are split across chunks are dropped.
    #[default]
    PerChunk,
    /// Accumulate fragments per tool-call slot and emit each call once its
    /// arguments parse as JSON.
    ///
    /// Slots are keyed by the fragment's `index` (falling back to its position
    /// in the chunk), not by call id: providers send the id only on the first
    /// fragment of a call.
    Accumulate,
}

/// Configuration for an Azure OpenAI deployment.
///
/// # Example
///
/// ```rust
/// use genbridge_azure::{AzureOpenAIConfig, ToolCallMode};
///
/// let config = AzureOpenAIConfig::new("https://my-resource.openai.azure.com", "my-api-key")
///     .with_deployment("gpt-4o-mini")
///     .with_tool_call_mode(ToolCallMode::Accumulate);
/// assert_eq!(config.deployment, "gpt-4o-mini");
/// ```
#[derive(Clone, Serialize, Deserialize)]
pub struct AzureOpenAIConfig {
    /// Resource endpoint, e.g. `https://my-resource.openai.azure.com`.
    pub endpoint: String,
    pub api_key: String,
    #[serde(default = "default_deployment")]
    pub deployment: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub tool_call_mode: ToolCallMode,
}

fn default_deployment() -> String {
    DEFAULT_DEPLOYMENT.to_string()
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

impl AzureOpenAIConfig {
    /// Create a config for the default deployment.
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            deployment: default_deployment(),
            max_tokens: DEFAULT_MAX_TOKENS,
            tool_call_mode: ToolCallMode::default(),
        }
    }

    /// Resolve the config from `AZURE_OPENAI_ENDPOINT`, `AZURE_OPENAI_API_KEY`
    /// and the optional `AZURE_OPENAI_DEPLOYMENT`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |name: &str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| BridgeError::Config(format!("missing required env var: {name}")))
        };

        let mut config = Self::new(required(ENDPOINT_ENV)?, required(API_KEY_ENV)?);
        if let Some(deployment) = lookup(DEPLOYMENT_ENV).filter(|d| !d.trim().is_empty()) {
            config.deployment = deployment;
        }
        Ok(config)
    }

    pub fn with_deployment(mut self, deployment: impl Into<String>) -> Self {
        self.deployment = deployment.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_tool_call_mode(mut self, mode: ToolCallMode) -> Self {
        self.tool_call_mode = mode;
        self
    }
}

impl fmt::Debug for AzureOpenAIConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureOpenAIConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("deployment", &self.deployment)
            .field("max_tokens", &self.max_tokens)
            .field("tool_call_mode", &self.tool_call_mode)
            .finish()
    }
}
