//! Tesseract command-line OCR backend
//!
//! Runs `tesseract <image> stdout --oem 3 --psm 6 tsv` and rebuilds the text
//! from the word rows, which also yields per-word confidences.

use super::engine::{clean_text, OcrEngine, OcrError, OcrText};
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

const DEFAULT_BINARY: &str = "tesseract";
const WORD_LEVEL: &str = "5";

pub struct TesseractOcr {
    binary: PathBuf,
    language: String,
}

impl TesseractOcr {
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from(DEFAULT_BINARY),
            language: "eng".to_string(),
        }
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Returns the first line of `tesseract --version`
    pub async fn version(&self) -> Result<String, OcrError> {
        let output = Command::new(&self.binary)
            .arg("--version")
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        // Older releases print the version banner on stderr
        let banner = if output.stdout.is_empty() {
            output.stderr
        } else {
            output.stdout
        };
        Ok(String::from_utf8_lossy(&banner)
            .lines()
            .next()
            .unwrap_or_default()
            .trim()
            .to_string())
    }

    fn spawn_error(&self, error: io::Error) -> OcrError {
        if error.kind() == io::ErrorKind::NotFound {
            OcrError::EngineUnavailable(format!(
                "'{}' not found; install tesseract or set NOTEFILER_TESSERACT",
                self.binary.display()
            ))
        } else {
            OcrError::Failed(format!("failed to run {}: {}", self.binary.display(), error))
        }
    }
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn extract(&self, path: &Path) -> Result<OcrText, OcrError> {
        if !path.is_file() {
            return Err(OcrError::Unreadable {
                path: path.display().to_string(),
                message: "not a readable file".to_string(),
            });
        }

        let output = Command::new(&self.binary)
            .arg(path)
            .arg("stdout")
            .args(["--oem", "3", "--psm", "6", "-l", &self.language, "tsv"])
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Unreadable {
                path: path.display().to_string(),
                message: stderr.lines().last().unwrap_or("tesseract failed").trim().to_string(),
            });
        }

        let tsv = String::from_utf8_lossy(&output.stdout);
        let result = parse_tsv(&tsv);
        debug!(
            path = %path.display(),
            chars = result.text.len(),
            confidence = ?result.confidence,
            "Tesseract extraction complete"
        );
        Ok(result)
    }

    fn name(&self) -> &str {
        "tesseract"
    }
}

/// Rebuilds text and mean confidence from tesseract TSV output
fn parse_tsv(tsv: &str) -> OcrText {
    let mut lines: Vec<String> = Vec::new();
    let mut current_key: Option<(String, String, String, String)> = None;
    let mut confidences: Vec<f32> = Vec::new();

    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 12 || cols[0] != WORD_LEVEL {
            continue;
        }
        let word = cols[11].trim();
        if word.is_empty() {
            continue;
        }

        if let Ok(conf) = cols[10].parse::<f32>() {
            if conf >= 0.0 {
                confidences.push(conf);
            }
        }

        let key = (
            cols[1].to_string(),
            cols[2].to_string(),
            cols[3].to_string(),
            cols[4].to_string(),
        );
        match lines.last_mut() {
            Some(line) if current_key.as_ref() == Some(&key) => {
                line.push(' ');
                line.push_str(word);
            }
            _ => {
                lines.push(word.to_string());
                current_key = Some(key);
            }
        }
    }

    let text = OcrText::new(clean_text(&lines.join("\n")));
    if confidences.is_empty() {
        text
    } else {
        let mean = confidences.iter().sum::<f32>() / confidences.len() as f32;
        text.with_confidence(mean / 100.0)
    }
}

impl std::fmt::Debug for TesseractOcr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TesseractOcr")
            .field("binary", &self.binary)
            .field("language", &self.language)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    fn word(line: u32, n: u32, conf: &str, text: &str) -> String {
        format!("5\t1\t1\t1\t{}\t{}\t0\t0\t10\t10\t{}\t{}", line, n, conf, text)
    }

    #[test]
    fn test_parse_tsv_rebuilds_text() {
        let tsv = [
            HEADER.to_string(),
            "1\t1\t0\t0\t0\t0\t0\t0\t100\t100\t-1\t".to_string(),
            word(1, 1, "90", "Kinetic"),
            word(1, 2, "80", "energy"),
            word(2, 1, "70", "E=mv²/2"),
        ]
        .join("\n");

        let result = parse_tsv(&tsv);

        assert_eq!(result.text, "Kinetic energy E=mv²/2");
        let confidence = result.confidence.unwrap();
        assert!((confidence - 0.8).abs() < 1e-5);
    }

    #[test]
    fn test_parse_tsv_without_words() {
        let result = parse_tsv(HEADER);
        assert_eq!(result.text, "");
        assert!(result.confidence.is_none());
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        let ocr = TesseractOcr::new().with_binary("/nonexistent/tesseract-binary");

        let result = ocr.extract(temp.path()).await;

        assert!(matches!(result, Err(OcrError::EngineUnavailable(_))));
    }

    #[tokio::test]
    async fn test_missing_image_is_unreadable() {
        let ocr = TesseractOcr::new();
        let result = ocr.extract(Path::new("/nonexistent/scan.png")).await;
        assert!(matches!(result, Err(OcrError::Unreadable { .. })));
    }
}
