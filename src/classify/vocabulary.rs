use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Subject assigned when classification is not decided
pub const UNCATEGORIZED: &str = "uncategorized";

const BUILTIN_SUBJECTS: &[(&str, &str)] = &[
    ("mathematics", "mathematical equations, formulas, calculations, algebra, calculus, geometry, trigonometry, statistics"),
    ("physics", "physical laws, mechanics, thermodynamics, electromagnetism, quantum physics, forces, energy, motion"),
    ("chemistry", "chemical reactions, molecular structures, periodic table, organic chemistry, inorganic chemistry, biochemistry"),
    ("biology", "living organisms, cells, genetics, evolution, anatomy, physiology, ecology, microbiology"),
    ("computer_science", "programming, algorithms, data structures, software development, computer systems, databases, networks"),
    ("history", "historical events, dates, people, civilizations, wars, political movements, cultural developments"),
    ("literature", "books, authors, poems, novels, literary analysis, writing, storytelling, language arts"),
    ("geography", "maps, countries, cities, physical features, climate, population, cultural geography"),
    ("economics", "economic theories, markets, supply and demand, financial concepts, business, trade, money"),
    ("psychology", "human behavior, mental processes, cognitive psychology, social psychology, neuroscience"),
    ("philosophy", "philosophical concepts, logic, ethics, metaphysics, epistemology, moral reasoning"),
    ("art", "artistic techniques, art history, visual arts, design, creativity, aesthetics, cultural expression"),
    ("music", "musical theory, instruments, composers, musical notation, rhythm, harmony, musical history"),
    ("medicine", "medical terminology, anatomy, diseases, treatments, healthcare, pharmacology, clinical practice"),
    ("engineering", "technical design, mechanical systems, electrical engineering, civil engineering, materials science"),
    ("astronomy", "celestial objects, space, planets, stars, galaxies, cosmology, astrophysics"),
    ("linguistics", "language structure, grammar, phonetics, syntax, semantics, language families, communication"),
    ("political_science", "government, politics, political systems, international relations, public policy, governance"),
    ("sociology", "social structures, human societies, social behavior, cultural patterns, social institutions"),
    ("environmental_science", "environmental issues, ecology, sustainability, climate change, natural resources, conservation"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub label: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VocabularyError {
    #[error("Subject vocabulary is empty")]
    Empty,

    #[error("Invalid subject label {0:?}: use lowercase letters, digits and underscores")]
    InvalidLabel(String),

    #[error("Subject label {0:?} is reserved")]
    Reserved(String),

    #[error("Duplicate subject label {0:?}")]
    Duplicate(String),

    #[error("Cannot read subjects file {path}: {message}")]
    Read { path: String, message: String },

    #[error("Invalid subjects file {path}: {message}")]
    Parse { path: String, message: String },
}

/// Fixed, ordered set of subjects a note can be filed under
///
/// The order is canonical: it breaks ties between equally scored subjects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectVocabulary {
    subjects: Vec<Subject>,
}

impl SubjectVocabulary {
    pub fn new<I, L, D>(subjects: I) -> Result<Self, VocabularyError>
    where
        I: IntoIterator<Item = (L, D)>,
        L: Into<String>,
        D: Into<String>,
    {
        let mut vocabulary = Self { subjects: Vec::new() };
        for (label, description) in subjects {
            vocabulary.add_subject(label, description)?;
        }

        if vocabulary.is_empty() {
            return Err(VocabularyError::Empty);
        }
        Ok(vocabulary)
    }

    /// Built-in subjects followed by those listed in `subjects_file`, if any
    pub fn load(subjects_file: Option<&Path>) -> Result<Self, VocabularyError> {
        let mut vocabulary = Self::builtin();
        if let Some(path) = subjects_file {
            for subject in read_subjects_file(path)? {
                vocabulary.add_subject(subject.label, subject.description)?;
            }
        }
        Ok(vocabulary)
    }

    /// Appends a subject; existing subjects keep their place in the order
    pub fn add_subject(
        &mut self,
        label: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<(), VocabularyError> {
        let label = label.into();
        if label.is_empty()
            || !label
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(VocabularyError::InvalidLabel(label));
        }
        if label == UNCATEGORIZED {
            return Err(VocabularyError::Reserved(label));
        }
        if self.contains(&label) {
            return Err(VocabularyError::Duplicate(label));
        }

        self.subjects.push(Subject {
            label,
            description: description.into(),
        });
        Ok(())
    }

    /// The twenty academic subjects notefiler ships with
    pub fn builtin() -> Self {
        Self {
            subjects: BUILTIN_SUBJECTS
                .iter()
                .map(|(label, description)| Subject {
                    label: label.to_string(),
                    description: description.to_string(),
                })
                .collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Subject> {
        self.subjects.iter()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.subjects.iter().map(|s| s.label.as_str())
    }

    pub fn position(&self, label: &str) -> Option<usize> {
        self.subjects.iter().position(|s| s.label == label)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.position(label).is_some()
    }

    pub fn description(&self, label: &str) -> Option<&str> {
        self.subjects
            .iter()
            .find(|s| s.label == label)
            .map(|s| s.description.as_str())
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }
}

/// Reads extra subjects from a YAML (or JSON) list of `label`/`description`
/// entries:
///
/// ```yaml
/// - label: organic_chemistry
///   description: functional groups, reaction mechanisms, synthesis
/// ```
pub fn read_subjects_file(path: &Path) -> Result<Vec<Subject>, VocabularyError> {
    let raw = std::fs::read_to_string(path).map_err(|e| VocabularyError::Read {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    serde_yaml::from_str(&raw).map_err(|e| VocabularyError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

impl Default for SubjectVocabulary {
    fn default() -> Self {
        Self::builtin()
    }
}
