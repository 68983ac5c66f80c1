use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub global: Global,
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub pandoc: Pandoc,
    #[serde(default)]
    pub pdf: Pdf,
    #[serde(default)]
    pub ocr: Ocr,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub debug: Debug,
    #[serde(default)]
    pub security: Security,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }

    /// A stable, normalization-friendly string for hashing.
    pub fn normalized_for_hash(&self) -> String {
        toml::to_string(self).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Global {
    pub default_parallel: usize,
    pub max_parallel: usize,
    pub print_summary: bool,
}
impl Default for Global {
    fn default() -> Self {
        Self {
            default_parallel: 1,
            max_parallel: 16,
            print_summary: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paths {
    pub work_dir: String,
    pub scripts_dir: String,
}
impl Default for Paths {
    fn default() -> Self {
        Self {
            work_dir: ".doc-convoy-work".into(),
            scripts_dir: "scripts".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pandoc {
    pub binary: String,
    pub timeout_seconds: u64,
    pub extra_args: Vec<String>,
}
impl Default for Pandoc {
    fn default() -> Self {
        Self {
            binary: "pandoc".into(),
            timeout_seconds: 300,
            extra_args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pdf {
    pub python_exe: String,
    pub timeout_seconds: u64,
    #[serde(default)]
    pub env: std::collections::BTreeMap<String, String>,
}
impl Default for Pdf {
    fn default() -> Self {
        Self {
            python_exe: "auto".into(),
            timeout_seconds: 600,
            env: Default::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ocr {
    pub binary: String,
    pub langs: Vec<String>,
    pub timeout_seconds: u64,
    pub extra_args: Vec<String>,
    pub fast_extra_args: Vec<String>,
}
impl Default for Ocr {
    fn default() -> Self {
        Self {
            binary: "ocrmypdf".into(),
            langs: vec!["eng".into()],
            timeout_seconds: 900,
            extra_args: Vec::new(),
            fast_extra_args: vec!["--skip-text".into(), "--optimize".into(), "0".into()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    pub base_url: String,
    pub timeout_seconds: u64,
    pub consolidate_header: bool,
    pub consolidate_citations: bool,
}
impl Default for Metadata {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8070".into(),
            timeout_seconds: 120,
            consolidate_header: false,
            consolidate_citations: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Limits {
    pub max_input_file_bytes: u64,
    pub max_batch_files: usize,
}
impl Default for Limits {
    fn default() -> Self {
        Self {
            max_input_file_bytes: 2 * 1024 * 1024 * 1024,
            max_batch_files: 100_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Output {
    pub write_report_json: bool,
    pub report_filename: String,
}
impl Default for Output {
    fn default() -> Self {
        Self {
            write_report_json: false,
            report_filename: "convoy-report.json".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: false,
            file_path: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Debug {
    pub keep_tool_stderr: bool,
    pub dump_effective_config: bool,
}
impl Default for Debug {
    fn default() -> Self {
        Self {
            keep_tool_stderr: true,
            dump_effective_config: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Security {
    pub reject_url_inputs: bool,
    pub pin_scripts_dir: bool,
}
impl Default for Security {
    fn default() -> Self {
        Self {
            reject_url_inputs: true,
            pin_scripts_dir: false,
        }
    }
}
