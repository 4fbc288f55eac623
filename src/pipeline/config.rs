use crate::store::RetryPolicy;
use std::time::Duration;

pub const DEFAULT_WORKERS: usize = 4;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Notes processed concurrently
    pub workers: usize,
    pub ocr_timeout: Duration,
    /// Applied to every folder lookup, creation and upload
    pub retry: RetryPolicy,
    /// Descend into subdirectories of directory inputs
    pub recursive: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            ocr_timeout: Duration::from_secs(120),
            retry: RetryPolicy::default(),
            recursive: false,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_ocr_timeout(mut self, timeout: Duration) -> Self {
        self.ocr_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.workers, DEFAULT_WORKERS);
        assert_eq!(config.ocr_timeout, Duration::from_secs(120));
        assert!(!config.recursive);
    }

    #[test]
    fn test_builder_pattern() {
        let config = PipelineConfig::new()
            .with_workers(0)
            .with_ocr_timeout(Duration::from_secs(5))
            .with_retry(RetryPolicy::new().with_max_attempts(2))
            .with_recursive(true);

        assert_eq!(config.workers, 1);
        assert_eq!(config.ocr_timeout, Duration::from_secs(5));
        assert_eq!(config.retry.max_attempts, 2);
        assert!(config.recursive);
    }
}
