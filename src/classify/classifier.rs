//! Confidence-gated subject classification
//!
//! The classifier normalises OCR text, asks a [`SubjectModel`] for scores and
//! turns the best candidate into a [`ClassificationVerdict`]. A verdict is
//! decided only when the top score reaches the caller's [`Threshold`];
//! everything else lands in [`UNCATEGORIZED`].

use super::model::{ClassificationError, SubjectModel, SubjectScore};
use super::vocabulary::{SubjectVocabulary, UNCATEGORIZED};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub const MIN_THRESHOLD: f32 = 0.1;
pub const MAX_THRESHOLD: f32 = 0.9;
pub const DEFAULT_THRESHOLD: f32 = 0.3;

const DEFAULT_CLASSIFY_TIMEOUT: Duration = Duration::from_secs(60);
const MIN_WORD_CHARS: usize = 3;

#[derive(Debug, Clone, Copy, Error, PartialEq)]
#[error("Confidence threshold {0} is outside [0.1, 0.9]")]
pub struct InvalidThreshold(pub f32);

/// Minimum top score for a decided classification, always in [0.1, 0.9]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Threshold(f32);

impl Threshold {
    pub fn new(value: f32) -> Result<Self, InvalidThreshold> {
        if value.is_finite() && (MIN_THRESHOLD..=MAX_THRESHOLD).contains(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidThreshold(value))
        }
    }

    pub fn value(self) -> f32 {
        self.0
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self(DEFAULT_THRESHOLD)
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl<'de> Deserialize<'de> for Threshold {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f32::deserialize(deserializer)?;
        Threshold::new(value).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationVerdict {
    pub subject: String,
    pub confidence: f32,
    /// True only when `confidence` reached the threshold and `subject`
    /// belongs to the vocabulary
    pub decided: bool,
}

impl ClassificationVerdict {
    pub fn uncategorized(confidence: f32) -> Self {
        Self {
            subject: UNCATEGORIZED.to_string(),
            confidence,
            decided: false,
        }
    }

    fn from_top(label: &str, score: f32, threshold: Threshold) -> Self {
        if score >= threshold.value() {
            Self {
                subject: label.to_string(),
                confidence: score,
                decided: true,
            }
        } else {
            Self::uncategorized(score)
        }
    }
}

/// How a verdict was reached
#[derive(Debug, Clone, PartialEq)]
pub enum ClassificationOutcome {
    /// OCR produced nothing to classify; the model was not consulted
    NoText(ClassificationVerdict),
    /// The model scored the text; the verdict may or may not be decided
    Scored(ClassificationVerdict),
    /// The model failed; the note is treated as uncategorized
    ModelFailed {
        verdict: ClassificationVerdict,
        error: ClassificationError,
    },
}

impl ClassificationOutcome {
    pub fn verdict(&self) -> &ClassificationVerdict {
        match self {
            Self::NoText(verdict) | Self::Scored(verdict) => verdict,
            Self::ModelFailed { verdict, .. } => verdict,
        }
    }

    pub fn into_verdict(self) -> ClassificationVerdict {
        match self {
            Self::NoText(verdict) | Self::Scored(verdict) => verdict,
            Self::ModelFailed { verdict, .. } => verdict,
        }
    }

    pub fn error(&self) -> Option<&ClassificationError> {
        match self {
            Self::ModelFailed { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Scored, but the top candidate did not reach the threshold
    pub fn is_below_threshold(&self) -> bool {
        matches!(self, Self::Scored(verdict) if !verdict.decided)
    }
}

pub struct ConfidenceClassifier {
    model: Arc<dyn SubjectModel>,
    vocabulary: Arc<SubjectVocabulary>,
    timeout: Duration,
}

impl ConfidenceClassifier {
    pub fn new(model: Arc<dyn SubjectModel>, vocabulary: Arc<SubjectVocabulary>) -> Self {
        Self {
            model,
            vocabulary,
            timeout: DEFAULT_CLASSIFY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn vocabulary(&self) -> &SubjectVocabulary {
        &self.vocabulary
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Classifies `text`. Never fails: model errors become an uncategorized
    /// verdict carried in [`ClassificationOutcome::ModelFailed`].
    pub async fn classify(&self, text: &str, threshold: Threshold) -> ClassificationOutcome {
        let normalized = normalize_text(text);
        if normalized.is_empty() {
            debug!("No classifiable text, skipping model");
            return ClassificationOutcome::NoText(ClassificationVerdict::uncategorized(0.0));
        }

        let scored =
            match tokio::time::timeout(self.timeout, self.model.score(&normalized, &self.vocabulary))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(ClassificationError::Timeout {
                    seconds: self.timeout.as_secs(),
                }),
            };

        let candidates = match scored {
            Ok(candidates) => candidates,
            Err(error) => {
                warn!(model = self.model.name(), error = %error, "Subject model failed");
                return ClassificationOutcome::ModelFailed {
                    verdict: ClassificationVerdict::uncategorized(0.0),
                    error,
                };
            }
        };

        match select_top(&candidates, &self.vocabulary) {
            Some((label, score)) => {
                let verdict = ClassificationVerdict::from_top(label, score, threshold);
                debug!(
                    top = label,
                    score,
                    threshold = threshold.value(),
                    decided = verdict.decided,
                    "Classified note"
                );
                ClassificationOutcome::Scored(verdict)
            }
            None => ClassificationOutcome::ModelFailed {
                verdict: ClassificationVerdict::uncategorized(0.0),
                error: ClassificationError::NoCandidates,
            },
        }
    }
}

impl fmt::Debug for ConfidenceClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfidenceClassifier")
            .field("model", &self.model.name())
            .field("subjects", &self.vocabulary.len())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Picks the highest scoring vocabulary label. Ties go to the label that
/// comes first in the vocabulary; unknown labels and non-finite scores are
/// ignored and scores are clamped to [0, 1].
pub fn select_top<'v>(
    candidates: &[SubjectScore],
    vocabulary: &'v SubjectVocabulary,
) -> Option<(&'v str, f32)> {
    let mut best: Option<(&'v str, f32)> = None;

    for label in vocabulary.labels() {
        let score = candidates
            .iter()
            .filter(|c| c.label == label && c.score.is_finite())
            .map(|c| c.score.clamp(0.0, 1.0))
            .fold(None, |acc: Option<f32>, s| Some(acc.map_or(s, |a| a.max(s))));

        if let Some(score) = score {
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((label, score));
            }
        }
    }

    for candidate in candidates {
        if !vocabulary.contains(&candidate.label) {
            debug!(label = %candidate.label, "Ignoring label outside the vocabulary");
        }
    }

    best
}

fn noise_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[^\w\s.,!?;:()\[\]{}-]").expect("valid regex")
    })
}

/// Lowercases text, strips symbols outside ordinary punctuation and drops
/// words shorter than three characters
pub fn normalize_text(text: &str) -> String {
    let stripped = noise_pattern().replace_all(text, " ");
    stripped
        .to_lowercase()
        .split_whitespace()
        .filter(|word| word.chars().count() >= MIN_WORD_CHARS)
        .collect::<Vec<_>>()
        .join(" ")
}
