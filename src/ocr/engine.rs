use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Text recognised in one image
#[derive(Debug, Clone, PartialEq)]
pub struct OcrText {
    pub text: String,
    /// Mean word confidence in [0, 1], when the engine reports one
    pub confidence: Option<f32>,
}

impl OcrText {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence.clamp(0.0, 1.0));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum OcrError {
    #[error("OCR engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Could not read image {path}: {message}")]
    Unreadable { path: String, message: String },

    #[error("OCR timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("OCR failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Extracts text from the image at `path`. An image without legible text
    /// yields an empty [`OcrText`], not an error.
    async fn extract(&self, path: &Path) -> Result<OcrText, OcrError>;

    fn name(&self) -> &str;
}

/// Normalises raw OCR output: collapses whitespace, maps `|` to `I` and
/// drops non-printable characters.
pub fn clean_text(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('|', "I")
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}
