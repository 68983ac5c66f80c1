use serde::{Deserialize, Serialize};
use std::path::Path;

/// Input extensions the resolver considers convertible, lowercase, no dot.
pub const INPUT_EXTENSIONS: &[&str] = &[
    "pdf", "docx", "odt", "html", "htm", "md", "markdown", "tex", "latex", "rst", "epub", "rtf",
    "txt", "org", "mediawiki", "textile", "asciidoc", "adoc",
];

/// Output format names accepted by `convert`, including aliases.
pub const OUTPUT_FORMATS: &[&str] = &[
    "odt", "docx", "html", "html5", "markdown", "md", "gfm", "latex", "tex", "pdf", "epub", "rst",
    "asciidoc", "rtf", "txt", "plain", "org", "mediawiki",
];

/// Which external tool chain handles a given input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pipeline {
    /// Extraction worker first (PDF -> docx), then pandoc unless the target is docx.
    PdfExtract,
    /// Single pandoc invocation.
    Direct,
}

pub fn pipeline_for(path: &Path) -> Pipeline {
    match normalized_extension(path).as_deref() {
        Some("pdf") => Pipeline::PdfExtract,
        _ => Pipeline::Direct,
    }
}

/// Canonical format name as the converters understand it.
pub fn normalize(fmt: &str) -> String {
    let fmt = fmt.to_ascii_lowercase();
    match fmt.as_str() {
        "md" => "markdown".to_string(),
        "txt" => "plain".to_string(),
        "tex" => "latex".to_string(),
        _ => fmt,
    }
}

/// File extension (no dot) produced for a target format name.
pub fn extension_for(fmt: &str) -> String {
    let fmt = fmt.to_ascii_lowercase();
    match fmt.as_str() {
        "markdown" | "md" | "gfm" => "md".to_string(),
        "latex" | "tex" => "tex".to_string(),
        "plain" | "txt" => "txt".to_string(),
        "html5" => "html".to_string(),
        "asciidoc" => "adoc".to_string(),
        _ => fmt,
    }
}

pub fn is_supported_input(ext: &str) -> bool {
    let ext = ext.trim_start_matches('.').to_ascii_lowercase();
    INPUT_EXTENSIONS.contains(&ext.as_str())
}

pub fn is_supported_output(fmt: &str) -> bool {
    OUTPUT_FORMATS.contains(&fmt.to_ascii_lowercase().as_str())
}

pub fn normalized_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase())
}
