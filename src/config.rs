//! Configuration management for notefiler
//!
//! Settings are loaded from environment variables with sensible defaults and
//! can be overridden by command-line flags before validation.
//!
//! # Environment Variables
//!
//! ## Notefiler Configuration
//! - `NOTEFILER_THRESHOLD`: Confidence threshold in [0.1, 0.9] - default: "0.3"
//! - `NOTEFILER_WORKERS`: Concurrent notes in flight (1-64) - default: "4"
//! - `NOTEFILER_STORE`: Destination store (local|drive) - default: "local"
//! - `NOTEFILER_STORE_DIR`: Directory backing the local store - default: platform data dir + "notefiler"
//! - `NOTEFILER_DRIVE_TOKEN`: Google Drive OAuth access token
//! - `NOTEFILER_DRIVE_TOKEN_FILE`: File holding the access token
//! - `NOTEFILER_ROOT_ID`: Folder id the base folder is placed under - default: store root
//! - `NOTEFILER_CLASSIFIER`: Subject model (keyword|llm) - default: "keyword"
//! - `NOTEFILER_SUBJECTS_FILE`: YAML list of extra subjects appended to the built-in ones
//! - `NOTEFILER_PROVIDER`: LLM provider for the llm classifier - default: "ollama"
//! - `NOTEFILER_MODEL`: LLM model name - default: "qwen2.5:7b"
//! - `NOTEFILER_TESSERACT`: Path to the tesseract binary - default: "tesseract"
//! - `NOTEFILER_OCR_LANGUAGE`: Tesseract language pack - default: "eng"
//! - `NOTEFILER_REQUEST_TIMEOUT`: Remote request timeout in seconds - default: "30"
//! - `NOTEFILER_OCR_TIMEOUT`: OCR timeout per note in seconds - default: "120"
//! - `NOTEFILER_CLASSIFY_TIMEOUT`: Classification timeout per note in seconds - default: "60"
//! - `NOTEFILER_RETRY_ATTEMPTS`: Attempts per remote operation - default: "4"
//! - `NOTEFILER_RETRY_BACKOFF_MS`: Initial retry backoff - default: "500"
//! - `NOTEFILER_LOG_LEVEL`: Logging level - default: "info"
//!
//! ## GenAI Provider Configuration
//! API keys for the llm classifier are read directly by the genai library
//! (`OPENAI_API_KEY`, `ANTHROPIC_API_KEY`, `GEMINI_API_KEY`, ...). Ollama uses
//! `OLLAMA_HOST`, and `NOTEFILER_API_BASE_URL` overrides any provider endpoint.
//!
//! # Example
//!
//! ```no_run
//! use notefiler::NotefilerConfig;
//!
//! let mut config = NotefilerConfig::default();
//! config.workers = 8;
//! config.validate().expect("Invalid configuration");
//! ```

use crate::classify::{SubjectVocabulary, Threshold, VocabularyError, DEFAULT_THRESHOLD};
use crate::store::RetryPolicy;
use genai::adapter::AdapterKind;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_WORKERS: usize = 4;
const MAX_WORKERS: usize = 64;
const DEFAULT_MODEL: &str = "qwen2.5:7b";
const DEFAULT_TESSERACT: &str = "tesseract";
const DEFAULT_OCR_LANGUAGE: &str = "eng";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_OCR_TIMEOUT_SECS: u64 = 120;
const DEFAULT_CLASSIFY_TIMEOUT_SECS: u64 = 60;
const DEFAULT_RETRY_ATTEMPTS: u32 = 4;
const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;
const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(10);

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Confidence threshold {0} is outside [0.1, 0.9]")]
    InvalidThreshold(f32),

    #[error("Invalid store: {0}. Valid options: local, drive")]
    InvalidStore(String),

    #[error("Invalid classifier: {0}. Valid options: keyword, llm")]
    InvalidClassifier(String),

    #[error("Invalid provider: {0}. Valid options: ollama, openai, anthropic, gemini, xai, groq")]
    InvalidProvider(String),

    /// Drive store selected without any way to authenticate
    #[error("Drive store needs NOTEFILER_DRIVE_TOKEN or NOTEFILER_DRIVE_TOKEN_FILE")]
    MissingDriveToken,

    #[error("Invalid subjects: {0}")]
    InvalidSubjects(#[from] VocabularyError),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Where organized notes are written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Local,
    Drive,
}

impl StoreKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StoreKind::Local => "local",
            StoreKind::Drive => "drive",
        }
    }
}

impl FromStr for StoreKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(StoreKind::Local),
            "drive" | "gdrive" => Ok(StoreKind::Drive),
            _ => Err(ConfigError::InvalidStore(s.to_string())),
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which subject model scores note text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierKind {
    Keyword,
    Llm,
}

impl ClassifierKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ClassifierKind::Keyword => "keyword",
            ClassifierKind::Llm => "llm",
        }
    }
}

impl FromStr for ClassifierKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "keyword" => Ok(ClassifierKind::Keyword),
            "llm" => Ok(ClassifierKind::Llm),
            _ => Err(ConfigError::InvalidClassifier(s.to_string())),
        }
    }
}

impl fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a provider name the way genai spells it
pub fn parse_provider(s: &str) -> Result<AdapterKind, ConfigError> {
    AdapterKind::from_lower_str(&s.trim().to_lowercase())
        .ok_or_else(|| ConfigError::InvalidProvider(s.to_string()))
}

/// Main configuration structure for notefiler
///
/// `Default::default()` reads `NOTEFILER_*` environment variables and falls
/// back to built-in defaults for anything unset or unparseable.
#[derive(Debug, Clone)]
pub struct NotefilerConfig {
    pub threshold: f32,

    pub workers: usize,

    pub store: StoreKind,

    /// Root directory of the local store
    pub store_dir: PathBuf,

    pub drive_token: Option<String>,

    pub drive_token_file: Option<PathBuf>,

    /// Parent of the base folder; `None` uses the store's default root
    pub root_id: Option<String>,

    pub classifier: ClassifierKind,

    /// Extra subjects appended after the built-in vocabulary
    pub subjects_file: Option<PathBuf>,

    pub provider: AdapterKind,

    pub model: String,

    pub tesseract: PathBuf,

    pub ocr_language: String,

    pub request_timeout_secs: u64,

    pub ocr_timeout_secs: u64,

    pub classify_timeout_secs: u64,

    pub retry_attempts: u32,

    pub retry_backoff_ms: u64,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

fn env_parsed<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn default_store_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(env::temp_dir)
        .join("notefiler")
}

impl Default for NotefilerConfig {
    fn default() -> Self {
        let store = env_string("NOTEFILER_STORE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(StoreKind::Local);

        let classifier = env_string("NOTEFILER_CLASSIFIER")
            .and_then(|s| s.parse().ok())
            .unwrap_or(ClassifierKind::Keyword);

        let provider = env_string("NOTEFILER_PROVIDER")
            .and_then(|s| parse_provider(&s).ok())
            .unwrap_or(AdapterKind::Ollama);

        let log_level = env::var("NOTEFILER_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        Self {
            threshold: env_parsed("NOTEFILER_THRESHOLD").unwrap_or(DEFAULT_THRESHOLD),
            workers: env_parsed("NOTEFILER_WORKERS").unwrap_or(DEFAULT_WORKERS),
            store,
            store_dir: env_string("NOTEFILER_STORE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(default_store_dir),
            drive_token: env_string("NOTEFILER_DRIVE_TOKEN"),
            drive_token_file: env_string("NOTEFILER_DRIVE_TOKEN_FILE").map(PathBuf::from),
            root_id: env_string("NOTEFILER_ROOT_ID"),
            classifier,
            subjects_file: env_string("NOTEFILER_SUBJECTS_FILE").map(PathBuf::from),
            provider,
            model: env_string("NOTEFILER_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            tesseract: env_string("NOTEFILER_TESSERACT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TESSERACT)),
            ocr_language: env_string("NOTEFILER_OCR_LANGUAGE")
                .unwrap_or_else(|| DEFAULT_OCR_LANGUAGE.to_string()),
            request_timeout_secs: env_parsed("NOTEFILER_REQUEST_TIMEOUT")
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ocr_timeout_secs: env_parsed("NOTEFILER_OCR_TIMEOUT").unwrap_or(DEFAULT_OCR_TIMEOUT_SECS),
            classify_timeout_secs: env_parsed("NOTEFILER_CLASSIFY_TIMEOUT")
                .unwrap_or(DEFAULT_CLASSIFY_TIMEOUT_SECS),
            retry_attempts: env_parsed("NOTEFILER_RETRY_ATTEMPTS").unwrap_or(DEFAULT_RETRY_ATTEMPTS),
            retry_backoff_ms: env_parsed("NOTEFILER_RETRY_BACKOFF_MS")
                .unwrap_or(DEFAULT_RETRY_BACKOFF_MS),
            log_level,
        }
    }
}

impl NotefilerConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for the first value out of range
    pub fn validate(&self) -> Result<(), ConfigError> {
        Threshold::new(self.threshold).map_err(|e| ConfigError::InvalidThreshold(e.0))?;

        if self.workers == 0 || self.workers > MAX_WORKERS {
            return Err(ConfigError::ValidationFailed(format!(
                "Workers must be between 1 and {}, got {}",
                MAX_WORKERS, self.workers
            )));
        }

        for (name, secs) in [
            ("Request timeout", self.request_timeout_secs),
            ("OCR timeout", self.ocr_timeout_secs),
            ("Classify timeout", self.classify_timeout_secs),
        ] {
            if secs == 0 {
                return Err(ConfigError::ValidationFailed(format!(
                    "{} must be at least 1 second",
                    name
                )));
            }
            if secs > 600 {
                return Err(ConfigError::ValidationFailed(format!(
                    "{} cannot exceed 10 minutes",
                    name
                )));
            }
        }

        if self.retry_attempts == 0 || self.retry_attempts > 10 {
            return Err(ConfigError::ValidationFailed(format!(
                "Retry attempts must be between 1 and 10, got {}",
                self.retry_attempts
            )));
        }

        if self.store == StoreKind::Drive
            && self.drive_token.is_none()
            && self.drive_token_file.is_none()
        {
            return Err(ConfigError::MissingDriveToken);
        }

        if self.classifier == ClassifierKind::Llm && self.model.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Model name is required for the llm classifier".to_string(),
            ));
        }

        self.vocabulary()?;

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    /// Subject vocabulary: the built-in subjects plus any from `subjects_file`
    pub fn vocabulary(&self) -> Result<SubjectVocabulary, ConfigError> {
        Ok(SubjectVocabulary::load(self.subjects_file.as_deref())?)
    }

    /// Retry policy shared by folder resolution and uploads
    pub fn retry_policy(&self) -> RetryPolicy {
        let initial = Duration::from_millis(self.retry_backoff_ms);
        RetryPolicy::new()
            .with_max_attempts(self.retry_attempts)
            .with_backoff(initial, MAX_RETRY_BACKOFF)
            .with_attempt_timeout(self.request_timeout())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn ocr_timeout(&self) -> Duration {
        Duration::from_secs(self.ocr_timeout_secs)
    }

    pub fn classify_timeout(&self) -> Duration {
        Duration::from_secs(self.classify_timeout_secs)
    }

    /// Converts configuration to a display map for output formatting
    ///
    /// The drive token itself is never included.
    pub fn to_display_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();

        map.insert("threshold".to_string(), format!("{:.2}", self.threshold));
        map.insert("workers".to_string(), self.workers.to_string());
        map.insert("store".to_string(), self.store.to_string());
        map.insert(
            "store_dir".to_string(),
            self.store_dir.display().to_string(),
        );
        map.insert(
            "drive_token".to_string(),
            if self.drive_token.is_some() { "set" } else { "unset" }.to_string(),
        );
        if let Some(ref file) = self.drive_token_file {
            map.insert("drive_token_file".to_string(), file.display().to_string());
        }
        if let Some(ref root) = self.root_id {
            map.insert("root_id".to_string(), root.clone());
        }
        map.insert("classifier".to_string(), self.classifier.to_string());
        if let Some(ref file) = self.subjects_file {
            map.insert("subjects_file".to_string(), file.display().to_string());
        }
        map.insert("provider".to_string(), self.provider.as_str().to_string());
        map.insert("model".to_string(), self.model.clone());
        map.insert(
            "tesseract".to_string(),
            self.tesseract.display().to_string(),
        );
        map.insert("ocr_language".to_string(), self.ocr_language.clone());
        map.insert(
            "request_timeout_secs".to_string(),
            self.request_timeout_secs.to_string(),
        );
        map.insert(
            "ocr_timeout_secs".to_string(),
            self.ocr_timeout_secs.to_string(),
        );
        map.insert(
            "classify_timeout_secs".to_string(),
            self.classify_timeout_secs.to_string(),
        );
        map.insert(
            "retry_attempts".to_string(),
            self.retry_attempts.to_string(),
        );
        map.insert(
            "retry_backoff_ms".to_string(),
            self.retry_backoff_ms.to_string(),
        );
        map.insert("log_level".to_string(), self.log_level.clone());

        map
    }
}

impl fmt::Display for NotefilerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Notefiler Configuration:")?;
        writeln!(f, "  Threshold: {:.2}", self.threshold)?;
        writeln!(f, "  Workers: {}", self.workers)?;
        writeln!(f, "  Store: {}", self.store)?;
        match self.store {
            StoreKind::Local => writeln!(f, "  Store Dir: {}", self.store_dir.display())?,
            StoreKind::Drive => {
                let token = if self.drive_token.is_some() {
                    "set".to_string()
                } else if let Some(ref file) = self.drive_token_file {
                    file.display().to_string()
                } else {
                    "missing".to_string()
                };
                writeln!(f, "  Drive Token: {}", token)?;
            }
        }
        if let Some(ref root) = self.root_id {
            writeln!(f, "  Root Id: {}", root)?;
        }
        writeln!(f, "  Classifier: {}", self.classifier)?;
        if let Some(ref file) = self.subjects_file {
            writeln!(f, "  Subjects File: {}", file.display())?;
        }
        if self.classifier == ClassifierKind::Llm {
            writeln!(f, "  Provider: {}", self.provider.as_str())?;
            writeln!(f, "  Model: {}", self.model)?;
        }
        writeln!(f, "  Tesseract: {}", self.tesseract.display())?;
        writeln!(f, "  OCR Language: {}", self.ocr_language)?;
        writeln!(f, "  Request Timeout: {}s", self.request_timeout_secs)?;
        writeln!(f, "  OCR Timeout: {}s", self.ocr_timeout_secs)?;
        writeln!(f, "  Classify Timeout: {}s", self.classify_timeout_secs)?;
        writeln!(
            f,
            "  Retry: {} attempts, {}ms initial backoff",
            self.retry_attempts, self.retry_backoff_ms
        )?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    /// Restores an environment variable when dropped
    struct EnvGuard {
        key: String,
        old_value: Option<String>,
    }

    impl EnvGuard {
        fn unset(key: &str) -> Self {
            let old_value = env::var(key).ok();
            env::remove_var(key);
            Self {
                key: key.to_string(),
                old_value,
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.old_value {
                Some(v) => env::set_var(&self.key, v),
                None => env::remove_var(&self.key),
            }
        }
    }

    const ALL_VARS: &[&str] = &[
        "NOTEFILER_THRESHOLD",
        "NOTEFILER_WORKERS",
        "NOTEFILER_STORE",
        "NOTEFILER_STORE_DIR",
        "NOTEFILER_DRIVE_TOKEN",
        "NOTEFILER_DRIVE_TOKEN_FILE",
        "NOTEFILER_ROOT_ID",
        "NOTEFILER_CLASSIFIER",
        "NOTEFILER_SUBJECTS_FILE",
        "NOTEFILER_PROVIDER",
        "NOTEFILER_MODEL",
        "NOTEFILER_TESSERACT",
        "NOTEFILER_OCR_LANGUAGE",
        "NOTEFILER_REQUEST_TIMEOUT",
        "NOTEFILER_OCR_TIMEOUT",
        "NOTEFILER_CLASSIFY_TIMEOUT",
        "NOTEFILER_RETRY_ATTEMPTS",
        "NOTEFILER_RETRY_BACKOFF_MS",
        "NOTEFILER_LOG_LEVEL",
    ];

    /// Clears every NOTEFILER_* variable; originals come back on drop, which
    /// also undoes any `set_var` a test does afterwards
    fn clean_env() -> Vec<EnvGuard> {
        ALL_VARS.iter().map(|key| EnvGuard::unset(key)).collect()
    }

    #[test]
    #[serial]
    fn test_default_configuration() {
        let _guards = clean_env();

        let config = NotefilerConfig::default();

        assert_eq!(config.threshold, DEFAULT_THRESHOLD);
        assert_eq!(config.workers, DEFAULT_WORKERS);
        assert_eq!(config.store, StoreKind::Local);
        assert_eq!(config.classifier, ClassifierKind::Keyword);
        assert_eq!(config.provider, AdapterKind::Ollama);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.tesseract, PathBuf::from(DEFAULT_TESSERACT));
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
        assert_eq!(config.retry_attempts, DEFAULT_RETRY_ATTEMPTS);
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert!(config.root_id.is_none());
        assert!(config.store_dir.ends_with("notefiler"));
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_environment_variable_parsing() {
        let _guards = clean_env();
        env::set_var("NOTEFILER_THRESHOLD", "0.55");
        env::set_var("NOTEFILER_WORKERS", "8");
        env::set_var("NOTEFILER_STORE", "drive");
        env::set_var("NOTEFILER_DRIVE_TOKEN", "ya29.token");
        env::set_var("NOTEFILER_ROOT_ID", "folder-123");
        env::set_var("NOTEFILER_CLASSIFIER", "LLM");
        env::set_var("NOTEFILER_PROVIDER", "anthropic");
        env::set_var("NOTEFILER_MODEL", "claude-haiku");
        env::set_var("NOTEFILER_OCR_TIMEOUT", "45");
        env::set_var("NOTEFILER_LOG_LEVEL", "DEBUG");

        let config = NotefilerConfig::default();

        assert_eq!(config.threshold, 0.55);
        assert_eq!(config.workers, 8);
        assert_eq!(config.store, StoreKind::Drive);
        assert_eq!(config.drive_token.as_deref(), Some("ya29.token"));
        assert_eq!(config.root_id.as_deref(), Some("folder-123"));
        assert_eq!(config.classifier, ClassifierKind::Llm);
        assert_eq!(config.provider, AdapterKind::Anthropic);
        assert_eq!(config.model, "claude-haiku");
        assert_eq!(config.ocr_timeout_secs, 45);
        assert_eq!(config.log_level, "debug");
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_unparseable_values_fall_back_to_defaults() {
        let _guards = clean_env();
        env::set_var("NOTEFILER_WORKERS", "many");
        env::set_var("NOTEFILER_STORE", "ftp");
        env::set_var("NOTEFILER_PROVIDER", "skynet");

        let config = NotefilerConfig::default();

        assert_eq!(config.workers, DEFAULT_WORKERS);
        assert_eq!(config.store, StoreKind::Local);
        assert_eq!(config.provider, AdapterKind::Ollama);
    }

    #[test]
    #[serial]
    fn test_validation_rejects_threshold_out_of_range() {
        let _guards = clean_env();
        let mut config = NotefilerConfig::default();

        config.threshold = 0.95;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidThreshold(t)) if t == 0.95
        ));

        config.threshold = 0.1;
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_validation_rejects_zero_workers() {
        let _guards = clean_env();
        let mut config = NotefilerConfig::default();
        config.workers = 0;
        assert!(config.validate().is_err());
        config.workers = MAX_WORKERS + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_validation_drive_requires_token() {
        let _guards = clean_env();
        let mut config = NotefilerConfig::default();
        config.store = StoreKind::Drive;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingDriveToken)
        ));

        config.drive_token_file = Some(PathBuf::from("/tmp/token"));
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_validation_invalid_log_level() {
        let _guards = clean_env();
        let mut config = NotefilerConfig::default();
        config.log_level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_validation_invalid_timeout() {
        let _guards = clean_env();
        let mut config = NotefilerConfig::default();
        config.ocr_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_subjects_file_extends_vocabulary() {
        let _guards = clean_env();
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("subjects.yaml");
        std::fs::write(&path, "- label: robotics\n  description: actuators, sensors, kinematics\n").unwrap();
        env::set_var("NOTEFILER_SUBJECTS_FILE", &path);

        let config = NotefilerConfig::default();
        let vocabulary = config.vocabulary().unwrap();

        assert_eq!(config.subjects_file.as_deref(), Some(path.as_path()));
        assert_eq!(vocabulary.labels().last(), Some("robotics"));
        assert!(config.validate().is_ok());
        assert!(format!("{}", config).contains("Subjects File:"));
    }

    #[test]
    #[serial]
    fn test_validation_rejects_bad_subjects_file() {
        let _guards = clean_env();
        let mut config = NotefilerConfig::default();
        config.subjects_file = Some(PathBuf::from("/nonexistent/notefiler/subjects.yaml"));

        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidSubjects(VocabularyError::Read { .. }))
        ));
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("Local".parse::<StoreKind>().unwrap(), StoreKind::Local);
        assert_eq!("gdrive".parse::<StoreKind>().unwrap(), StoreKind::Drive);
        assert!("s3".parse::<StoreKind>().is_err());
        assert_eq!(
            "keyword".parse::<ClassifierKind>().unwrap(),
            ClassifierKind::Keyword
        );
        assert!("bayes".parse::<ClassifierKind>().is_err());
        assert!(parse_provider("openai").is_ok());
        assert!(parse_provider("invalid").is_err());
    }

    #[test]
    #[serial]
    fn test_retry_policy_from_config() {
        let _guards = clean_env();
        let mut config = NotefilerConfig::default();
        config.retry_attempts = 2;
        config.retry_backoff_ms = 10;

        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 2);
        assert_eq!(policy.initial_backoff, Duration::from_millis(10));
        assert_eq!(policy.attempt_timeout, config.request_timeout());
    }

    #[test]
    #[serial]
    fn test_display_map_hides_token() {
        let _guards = clean_env();
        let mut config = NotefilerConfig::default();
        config.drive_token = Some("secret-token".to_string());

        let map = config.to_display_map();
        assert_eq!(map.get("drive_token").map(String::as_str), Some("set"));
        assert!(!map.values().any(|v| v.contains("secret-token")));
        assert_eq!(map.get("store").map(String::as_str), Some("local"));
    }

    #[test]
    #[serial]
    fn test_config_display() {
        let _guards = clean_env();
        let config = NotefilerConfig::default();
        let display = format!("{}", config);
        assert!(display.contains("Notefiler Configuration:"));
        assert!(display.contains("Threshold: 0.30"));
        assert!(display.contains("Store Dir:"));
        assert!(!display.contains("Provider:"));
    }
}
