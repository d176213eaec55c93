use async_trait::async_trait;
use std::fmt;

pub mod gemini;

pub use gemini::GeminiClient;

/// One part of a generation request
#[derive(Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),

    /// Binary payload sent inline, e.g. recorded or uploaded audio
    InlineData { mime_type: String, data: Vec<u8> },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text(text.into())
    }

    pub fn inline(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        ContentPart::InlineData {
            mime_type: mime_type.into(),
            data,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentPart::Text(text) => Some(text),
            ContentPart::InlineData { .. } => None,
        }
    }
}

impl fmt::Debug for ContentPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentPart::Text(text) => f.debug_tuple("Text").field(&text.len()).finish(),
            ContentPart::InlineData { mime_type, data } => f
                .debug_struct("InlineData")
                .field("mime_type", mime_type)
                .field("bytes", &data.len())
                .finish(),
        }
    }
}

/// Caller-side routing between a fast model and a higher quality one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelProfile {
    /// Used for transcription
    Fast,

    /// Used for rewriting and improvement
    Quality,
}

/// Harm categories whose filters are switched off on every call.
///
/// Spoken source audio trips these filters spuriously, so every request carries
/// the same policy.
pub const DISABLED_HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

pub const SAFETY_THRESHOLD: &str = "BLOCK_NONE";

/// Errors that can occur while calling the generative backend
#[derive(thiserror::Error, Debug)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("request timed out")]
    Timeout,

    #[error("backend returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("failed to parse backend response: {0}")]
    Parse(String),

    #[error("request was blocked by the backend: {0}")]
    Blocked(String),

    #[error("backend returned an empty response")]
    EmptyResponse,

    #[error("backend is not configured: {0}")]
    NotConfigured(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            BackendError::Timeout
        } else {
            BackendError::Request(e.to_string())
        }
    }
}

/// A text generation service that accepts mixed text and binary parts
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    async fn generate(
        &self,
        profile: ModelProfile,
        parts: Vec<ContentPart>,
    ) -> Result<String, BackendError>;
}
