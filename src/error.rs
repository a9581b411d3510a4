use thiserror::Error;

pub type EncoderResult<T> = Result<T, EncoderError>;

/// Failures a delivery can run into on its way through the encoder.
///
/// The `Display` text is what ends up in `Job::error` and in the failure
/// notification, so variants carry the underlying message verbatim.
#[derive(Debug, Error)]
pub enum EncoderError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("transfer error: {0}")]
    Transfer(String),

    #[error("tool error: {0}")]
    Tool(String),

    #[error("cleanup error: {0}")]
    Cleanup(String),

    #[error("notify error: {0}")]
    Notify(String),

    #[error("broker error: {0}")]
    Broker(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0} not found")]
    NotFound(String),
}

impl EncoderError {
    pub fn transfer(msg: impl Into<String>) -> Self {
        Self::Transfer(msg.into())
    }

    pub fn tool(msg: impl Into<String>) -> Self {
        Self::Tool(msg.into())
    }

    /// Short tag used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            EncoderError::Parse(_) => "parse",
            EncoderError::Validation(_) => "validation",
            EncoderError::Persistence(_) => "persistence",
            EncoderError::Transfer(_) => "transfer",
            EncoderError::Tool(_) => "tool",
            EncoderError::Cleanup(_) => "cleanup",
            EncoderError::Notify(_) => "notify",
            EncoderError::Broker(_) => "broker",
            EncoderError::Config(_) => "config",
            EncoderError::NotFound(_) => "not_found",
        }
    }
}

impl From<serde_json::Error> for EncoderError {
    fn from(e: serde_json::Error) -> Self {
        EncoderError::Parse(e.to_string())
    }
}

impl From<validator::ValidationErrors> for EncoderError {
    fn from(e: validator::ValidationErrors) -> Self {
        EncoderError::Validation(e.to_string())
    }
}
