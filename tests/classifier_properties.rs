//! Threshold behaviour of the confidence classifier

use notefiler::classify::{
    ClassificationOutcome, ConfidenceClassifier, MockModel, SubjectVocabulary, Threshold,
    UNCATEGORIZED,
};
use std::sync::Arc;
use yare::parameterized;

fn classifier(scores: &[(&str, f32)]) -> ConfidenceClassifier {
    ConfidenceClassifier::new(
        Arc::new(MockModel::new().with_scores(scores)),
        Arc::new(SubjectVocabulary::builtin()),
    )
}

async fn decided_at(classifier: &ConfidenceClassifier, threshold: f32) -> bool {
    let outcome = classifier
        .classify("some readable handwriting", Threshold::new(threshold).unwrap())
        .await;
    outcome.verdict().decided
}

#[parameterized(
    clear_winner = { &[("physics", 0.82), ("chemistry", 0.41)] },
    borderline = { &[("history", 0.5), ("geography", 0.5)] },
    weak = { &[("biology", 0.25)] },
    at_minimum = { &[("art", 0.1)] },
    at_maximum = { &[("music", 0.9)] },
)]
#[test_macro(tokio::test)]
async fn test_threshold_monotonicity(scores: &[(&str, f32)]) {
    let classifier = classifier(scores);
    let thresholds = [0.1, 0.2, 0.3, 0.45, 0.5, 0.6, 0.75, 0.9];

    for (i, &low) in thresholds.iter().enumerate() {
        for &high in &thresholds[i + 1..] {
            if decided_at(&classifier, high).await {
                assert!(
                    decided_at(&classifier, low).await,
                    "decided at {} but not at {}",
                    high,
                    low
                );
            }
        }
    }
}

#[parameterized(
    score_well_above = { 0.3, true, "physics" },
    score_just_below = { 0.82, false, UNCATEGORIZED },
    score_well_below = { 0.9, false, UNCATEGORIZED },
)]
#[test_macro(tokio::test)]
async fn test_verdict_against_threshold(threshold: f32, decided: bool, subject: &str) {
    let classifier = classifier(&[("physics", 0.8), ("chemistry", 0.41)]);

    let outcome = classifier
        .classify("lecture notes", Threshold::new(threshold).unwrap())
        .await;

    assert!(matches!(outcome, ClassificationOutcome::Scored(_)));
    let verdict = outcome.verdict();
    assert_eq!(verdict.decided, decided);
    assert_eq!(verdict.subject, subject);
    assert!((verdict.confidence - 0.8).abs() < 1e-6);
}

#[tokio::test]
async fn test_empty_text_never_decides() {
    let classifier = classifier(&[("physics", 0.99)]);

    for threshold in [0.1, 0.3, 0.9] {
        let outcome = classifier
            .classify("   \n\t ", Threshold::new(threshold).unwrap())
            .await;
        assert!(matches!(outcome, ClassificationOutcome::NoText(_)));
        assert_eq!(outcome.verdict().subject, UNCATEGORIZED);
        assert_eq!(outcome.verdict().confidence, 0.0);
    }
}
