use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolStatus {
    pub ok: bool,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Availability of the local external collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineDiag {
    pub pandoc: ToolStatus,
    pub pdf_worker: ToolStatus,
    pub ocr: ToolStatus,
}

/// Request to the PDF extraction worker process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfExtractIn {
    pub input_pdf: String,
    pub output_docx: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfExtractOut {
    pub ok: bool,
    #[serde(default)]
    pub pages: Option<u32>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrIn {
    pub input_pdf: String,
    pub output_pdf: String,
    pub langs: Vec<String>,
    pub fast: bool,
}
