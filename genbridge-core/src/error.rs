#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("API error: {status} {status_text} - {body}")]
    Api { status: u16, status_text: String, body: String },

    #[error("Unexpected response: no choices in provider response")]
    EmptyResponse,

    #[error("Invalid arguments for function call '{name}': {source}")]
    FunctionArguments {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unsupported feature: {0}")]
    Unsupported(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
