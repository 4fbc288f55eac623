//! Text extraction from note images

mod engine;
mod mock;
mod tesseract;

pub use engine::{clean_text, OcrEngine, OcrError, OcrText};
pub use mock::MockOcr;
pub use tesseract::TesseractOcr;
