use super::engine::{OcrEngine, OcrError, OcrText};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Scripted OCR engine keyed by file name
pub struct MockOcr {
    responses: Mutex<HashMap<String, Result<OcrText, OcrError>>>,
    fallback: Option<OcrText>,
    delay: Duration,
    calls: AtomicUsize,
}

impl MockOcr {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            fallback: None,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// Text returned for files without a scripted response
    pub fn with_fallback(mut self, text: impl Into<String>) -> Self {
        self.fallback = Some(OcrText::new(text));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn add_text(&self, file_name: impl Into<String>, text: impl Into<String>) {
        self.responses
            .lock()
            .unwrap()
            .insert(file_name.into(), Ok(OcrText::new(text)));
    }

    pub fn add_failure(&self, file_name: impl Into<String>, error: OcrError) {
        self.responses.lock().unwrap().insert(file_name.into(), Err(error));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockOcr {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OcrEngine for MockOcr {
    async fn extract(&self, path: &Path) -> Result<OcrText, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let scripted = self.responses.lock().unwrap().get(&file_name).cloned();
        match scripted {
            Some(result) => result,
            None => self.fallback.clone().ok_or_else(|| OcrError::Unreadable {
                path: path.display().to_string(),
                message: "MockOcr: no response scripted".to_string(),
            }),
        }
    }

    fn name(&self) -> &str {
        "mock-ocr"
    }
}

impl std::fmt::Debug for MockOcr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockOcr").field("calls", &self.calls()).finish()
    }
}
