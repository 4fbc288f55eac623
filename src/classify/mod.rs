//! Subject classification of OCR text

mod classifier;
mod keyword;
mod llm;
mod mock;
mod model;
mod vocabulary;

pub use classifier::{
    normalize_text, select_top, ClassificationOutcome, ClassificationVerdict,
    ConfidenceClassifier, InvalidThreshold, Threshold, DEFAULT_THRESHOLD, MAX_THRESHOLD,
    MIN_THRESHOLD,
};
pub use keyword::KeywordModel;
pub use llm::{parse_scores, LlmModel};
pub use mock::MockModel;
pub use model::{ClassificationError, SubjectModel, SubjectScore};
pub use vocabulary::{
    read_subjects_file, Subject, SubjectVocabulary, VocabularyError, UNCATEGORIZED,
};
