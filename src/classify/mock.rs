use super::model::{ClassificationError, SubjectModel, SubjectScore};
use super::vocabulary::SubjectVocabulary;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

type ScriptedResult = Result<Vec<SubjectScore>, ClassificationError>;

/// Scripted subject model for tests
///
/// Responses are picked in this order: the first rule whose keyword occurs in
/// the text, then the queue, then the default scores.
pub struct MockModel {
    rules: Mutex<Vec<(String, ScriptedResult)>>,
    queue: Mutex<VecDeque<ScriptedResult>>,
    default: Option<Vec<SubjectScore>>,
    delay: Duration,
    calls: AtomicUsize,
}

fn to_scores(scores: &[(&str, f32)]) -> Vec<SubjectScore> {
    scores
        .iter()
        .map(|(label, score)| SubjectScore::new(*label, *score))
        .collect()
}

impl MockModel {
    pub fn new() -> Self {
        Self {
            rules: Mutex::new(Vec::new()),
            queue: Mutex::new(VecDeque::new()),
            default: None,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// Scores returned when no rule or queued response applies
    pub fn with_scores(mut self, scores: &[(&str, f32)]) -> Self {
        self.default = Some(to_scores(scores));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Returns `scores` whenever the normalised text contains `keyword`
    pub fn when_contains(&self, keyword: impl Into<String>, scores: &[(&str, f32)]) {
        self.rules
            .lock()
            .unwrap()
            .push((keyword.into().to_lowercase(), Ok(to_scores(scores))));
    }

    pub fn fail_when_contains(&self, keyword: impl Into<String>, error: ClassificationError) {
        self.rules
            .lock()
            .unwrap()
            .push((keyword.into().to_lowercase(), Err(error)));
    }

    pub fn add_response(&self, scores: &[(&str, f32)]) {
        self.queue.lock().unwrap().push_back(Ok(to_scores(scores)));
    }

    pub fn add_error(&self, error: ClassificationError) {
        self.queue.lock().unwrap().push_back(Err(error));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubjectModel for MockModel {
    async fn score(
        &self,
        text: &str,
        _vocabulary: &SubjectVocabulary,
    ) -> Result<Vec<SubjectScore>, ClassificationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let rule = self
            .rules
            .lock()
            .unwrap()
            .iter()
            .find(|(keyword, _)| text.contains(keyword.as_str()))
            .map(|(_, result)| result.clone());
        if let Some(result) = rule {
            return result;
        }

        if let Some(result) = self.queue.lock().unwrap().pop_front() {
            return result;
        }

        self.default.clone().ok_or_else(|| {
            ClassificationError::ModelUnavailable("MockModel: no response scripted".to_string())
        })
    }

    fn name(&self) -> &str {
        "mock-model"
    }
}

impl std::fmt::Debug for MockModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockModel").field("calls", &self.calls()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rule_queue_default_order() {
        let vocab = SubjectVocabulary::builtin();
        let model = MockModel::new().with_scores(&[("art", 0.5)]);
        model.when_contains("Photosynthesis", &[("biology", 0.9)]);
        model.add_response(&[("history", 0.7)]);

        let rule = model.score("photosynthesis in leaves", &vocab).await.unwrap();
        let queued = model.score("treaty of versailles", &vocab).await.unwrap();
        let fallback = model.score("anything", &vocab).await.unwrap();

        assert_eq!(rule, vec![SubjectScore::new("biology", 0.9)]);
        assert_eq!(queued, vec![SubjectScore::new("history", 0.7)]);
        assert_eq!(fallback, vec![SubjectScore::new("art", 0.5)]);
        assert_eq!(model.calls(), 3);
    }

    #[tokio::test]
    async fn test_unscripted_fails() {
        let model = MockModel::new();
        let result = model.score("text", &SubjectVocabulary::builtin()).await;
        assert!(matches!(result, Err(ClassificationError::ModelUnavailable(_))));
    }
}
