//! Offline keyword-overlap subject model
//!
//! Builds a keyword set per subject from its label and description and
//! scores text by the share of keyword hits each subject collects. Scores
//! form a distribution over the vocabulary, so a note split evenly between
//! two subjects scores about 0.5 for each.

use super::model::{ClassificationError, SubjectModel, SubjectScore};
use super::vocabulary::SubjectVocabulary;
use async_trait::async_trait;
use std::collections::HashSet;

const STOPWORDS: &[&str] = &["and", "the", "for", "with", "from", "into", "about"];

pub struct KeywordModel {
    extra_keywords: Vec<(String, Vec<String>)>,
}

impl KeywordModel {
    pub fn new() -> Self {
        Self {
            extra_keywords: Vec::new(),
        }
    }

    /// Adds keywords for `label` on top of the ones derived from its description
    pub fn with_keywords<I, S>(mut self, label: impl Into<String>, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = keywords
            .into_iter()
            .flat_map(|k| tokenize(k.as_ref()).collect::<Vec<_>>())
            .collect();
        self.extra_keywords.push((label.into(), words));
        self
    }

    fn keywords_for(&self, label: &str, description: &str) -> HashSet<String> {
        let mut keywords: HashSet<String> = tokenize(&label.replace('_', " ")).collect();
        keywords.extend(tokenize(description));
        for (extra_label, words) in &self.extra_keywords {
            if extra_label == label {
                keywords.extend(words.iter().cloned());
            }
        }
        keywords
    }
}

impl Default for KeywordModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubjectModel for KeywordModel {
    async fn score(
        &self,
        text: &str,
        vocabulary: &SubjectVocabulary,
    ) -> Result<Vec<SubjectScore>, ClassificationError> {
        let words: Vec<String> = tokenize(text).collect();

        let hits: Vec<(String, usize)> = vocabulary
            .iter()
            .map(|subject| {
                let keywords = self.keywords_for(&subject.label, &subject.description);
                let count = words.iter().filter(|w| keywords.contains(*w)).count();
                (subject.label.clone(), count)
            })
            .collect();

        let total: usize = hits.iter().map(|(_, count)| count).sum();
        Ok(hits
            .into_iter()
            .map(|(label, count)| {
                let score = if total == 0 {
                    0.0
                } else {
                    count as f32 / total as f32
                };
                SubjectScore::new(label, score)
            })
            .collect())
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

/// Lowercase alphabetic stems, with a trailing plural `s` removed
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 3)
        .map(|w| w.to_lowercase())
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .map(|w| stem(&w))
}

fn stem(word: &str) -> String {
    if word.len() > 4 && word.ends_with('s') && !word.ends_with("ss") {
        word[..word.len() - 1].to_string()
    } else {
        word.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::select_top;

    #[tokio::test]
    async fn test_physics_note() {
        let vocab = SubjectVocabulary::builtin();
        let scores = KeywordModel::new()
            .score("newton forces and motion energy thermodynamics", &vocab)
            .await
            .unwrap();

        assert_eq!(scores.len(), vocab.len());
        let (label, score) = select_top(&scores, &vocab).unwrap();
        assert_eq!(label, "physics");
        assert!(score > 0.5);
    }

    #[tokio::test]
    async fn test_scores_form_distribution() {
        let vocab = SubjectVocabulary::builtin();
        let scores = KeywordModel::new()
            .score("algebra calculus genetics cells", &vocab)
            .await
            .unwrap();

        let total: f32 = scores.iter().map(|s| s.score).sum();
        assert!((total - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_no_hits_scores_zero() {
        let vocab = SubjectVocabulary::builtin();
        let scores = KeywordModel::new().score("xyzzy plugh", &vocab).await.unwrap();
        assert!(scores.iter().all(|s| s.score == 0.0));
    }

    #[tokio::test]
    async fn test_extra_keywords() {
        let vocab = SubjectVocabulary::builtin();
        let model = KeywordModel::new().with_keywords("music", ["sonata", "fugue"]);

        let scores = model.score("bach fugue", &vocab).await.unwrap();

        assert_eq!(select_top(&scores, &vocab), Some(("music", 1.0)));
    }

    #[tokio::test]
    async fn test_custom_subject_scored_from_description() {
        let mut vocab = SubjectVocabulary::builtin();
        vocab
            .add_subject("robotics", "actuators, sensors, kinematics, servo motors")
            .unwrap();

        let scores = KeywordModel::new()
            .score("servo actuators wired to sensors", &vocab)
            .await
            .unwrap();

        assert_eq!(scores.len(), 21);
        assert_eq!(select_top(&scores, &vocab), Some(("robotics", 1.0)));
    }

    #[test]
    fn test_stem() {
        assert_eq!(stem("equations"), "equation");
        assert_eq!(stem("physics"), "physic");
        assert_eq!(stem("class"), "class");
        assert_eq!(stem("gas"), "gas");
    }
}
