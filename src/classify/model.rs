use super::vocabulary::SubjectVocabulary;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One candidate returned by a subject model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectScore {
    pub label: String,
    pub score: f32,
}

impl SubjectScore {
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ClassificationError {
    #[error("Classification model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Invalid model response: {0}")]
    InvalidResponse(String),

    #[error("Classification timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Model returned no usable subject candidates")]
    NoCandidates,
}

/// Text classification model over a fixed subject vocabulary
#[async_trait]
pub trait SubjectModel: Send + Sync {
    /// Scores `text` against every subject. Scores are expected in [0, 1];
    /// the order of the returned list carries no meaning.
    async fn score(
        &self,
        text: &str,
        vocabulary: &SubjectVocabulary,
    ) -> Result<Vec<SubjectScore>, ClassificationError>;

    fn name(&self) -> &str;

    fn model_info(&self) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedModel;

    #[async_trait]
    impl SubjectModel for FixedModel {
        async fn score(
            &self,
            _text: &str,
            _vocabulary: &SubjectVocabulary,
        ) -> Result<Vec<SubjectScore>, ClassificationError> {
            Ok(vec![SubjectScore::new("art", 1.0)])
        }

        fn name(&self) -> &str {
            "FixedModel"
        }
    }

    #[tokio::test]
    async fn test_model_trait() {
        let model = FixedModel;
        let scores = model.score("x", &SubjectVocabulary::builtin()).await.unwrap();
        assert_eq!(scores, vec![SubjectScore::new("art", 1.0)]);
        assert_eq!(model.name(), "FixedModel");
        assert!(model.model_info().is_none());
    }
}
