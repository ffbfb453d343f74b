use crate::types::{Content, Part, Role, Tool};
use serde::{Deserialize, Deserializer, Serialize, de};
use serde_json::Value;

/// System instruction in any of the shapes the host accepts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SystemInstruction {
    Text(String),
    Content(Content),
    Part(Part),
}

// Objects with a `parts` key are contents, every other object is a single part.
// A content's role is kept only when it is a host role; hosts often send
// `"role": "system"` here and the provider never sees it anyway.
impl<'de> Deserialize<'de> for SystemInstruction {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::String(text) => Ok(SystemInstruction::Text(text)),
            Value::Object(mut object) if object.contains_key("parts") => {
                let parts: Option<Vec<Part>> =
                    serde_json::from_value(object.remove("parts").unwrap_or(Value::Null))
                        .map_err(de::Error::custom)?;
                let role = object
                    .remove("role")
                    .and_then(|role| serde_json::from_value::<Role>(role).ok())
                    .unwrap_or_default();
                Ok(SystemInstruction::Content(Content { role, parts: parts.unwrap_or_default() }))
            }
            other => {
                serde_json::from_value(other)
                    .map(SystemInstruction::Part)
                    .map_err(de::Error::custom)
            }
        }
    }
}

impl SystemInstruction {
    /// The instruction's text, or `None` when it carries no non-empty text.
    pub fn text(&self) -> Option<String> {
        let text = match self {
            SystemInstruction::Text(text) => text.clone(),
            SystemInstruction::Content(content) => {
                content.parts.iter().filter_map(Part::text).collect::<Vec<_>>().join("\n")
            }
            SystemInstruction::Part(part) => part.text()?.to_string(),
        };
        if text.is_empty() { None } else { Some(text) }
    }
}

impl From<&str> for SystemInstruction {
    fn from(text: &str) -> Self {
        SystemInstruction::Text(text.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<SystemInstruction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    /// Model requested by the host. Adapters bound to a fixed deployment ignore it.
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub contents: Vec<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<GenerateContentConfig>,
}

impl GenerateContentRequest {
    pub fn new(model: impl Into<String>, contents: Vec<Content>) -> Self {
        Self { model: model.into(), contents, config: None }
    }

    /// Set the generation config.
    pub fn with_config(mut self, config: GenerateContentConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<SystemInstruction>) -> Self {
        self.config.get_or_insert_with(Default::default).system_instruction =
            Some(instruction.into());
        self
    }

    pub fn with_tools(mut self, tools: Vec<Tool>) -> Self {
        self.config.get_or_insert_with(Default::default).tools = Some(tools);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinishReason {
    Stop,
    MaxTokens,
    Safety,
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub candidates_token_count: u32,
    #[serde(default)]
    pub total_token_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Content,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
    #[serde(default)]
    pub index: u32,
}

impl Candidate {
    pub fn new(parts: Vec<Part>, finish_reason: FinishReason, index: u32) -> Self {
        Self {
            content: Content { role: Role::Model, parts },
            finish_reason: Some(finish_reason),
            index,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_metadata: Option<UsageMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
}

impl GenerateContentResponse {
    pub fn new(candidate: Candidate) -> Self {
        Self { candidates: vec![candidate], ..Default::default() }
    }

    /// Concatenated text of the first candidate.
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .map(|c| c.content.parts.iter().filter_map(Part::text).collect())
            .unwrap_or_default()
    }

    /// Function calls of the first candidate, in order.
    pub fn function_calls(&self) -> Vec<&crate::types::FunctionCall> {
        self.candidates
            .first()
            .map(|c| c.content.parts.iter().filter_map(Part::as_function_call).collect())
            .unwrap_or_default()
    }

    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.candidates.first().and_then(|c| c.finish_reason)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountTokensRequest {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub contents: Vec<Content>,
}

impl From<&GenerateContentRequest> for CountTokensRequest {
    fn from(request: &GenerateContentRequest) -> Self {
        Self { model: request.model.clone(), contents: request.contents.clone() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountTokensResponse {
    pub total_tokens: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedContentRequest {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub contents: Vec<Content>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentEmbedding {
    pub values: Vec<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbedContentResponse {
    #[serde(default)]
    pub embeddings: Vec<ContentEmbedding>,
}
