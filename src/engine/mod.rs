pub mod shell;
pub mod types;

use anyhow::Result;
use std::path::Path;

pub use types::{EngineDiag, OcrIn, PdfExtractIn, PdfExtractOut, ToolStatus};

/// Boundary to the external conversion tools. Workers call this; tests mock it.
pub trait Engine {
    fn doctor(&self) -> Result<EngineDiag>;
    fn extract_pdf(&self, req: &PdfExtractIn) -> Result<PdfExtractOut>;
    fn pandoc_convert(&self, input: &Path, output: &Path, to: &str) -> Result<()>;
    fn ocr_pdf(&self, req: &OcrIn) -> Result<()>;
}
