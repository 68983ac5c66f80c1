use crate::{
    config::Config,
    engine::{Engine, OcrIn, PdfExtractIn},
    formats::{self, Pipeline},
    report::{ConversionOutcome, OutcomeStatus},
    util::{ensure_dir, sha256_hex},
};
use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Everything `convert` was asked to do. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub format: String,
    pub filter: Option<String>,
    pub recursive: bool,
    pub parallel: usize,
    pub overwrite: bool,
    pub ocr: bool,
    pub ocr_fast: bool,
}

impl ConversionRequest {
    /// Fails before any file is touched: unsupported target format or a
    /// URL-looking input when those are disabled.
    pub fn validate(&self, cfg: &Config) -> Result<()> {
        if !formats::is_supported_output(&self.format) {
            return Err(anyhow!(
                "unsupported output format: {} (see `formats`)",
                self.format
            ));
        }
        let input_str = self.input.display().to_string();
        if cfg.security.reject_url_inputs && looks_like_url(&input_str) {
            return Err(anyhow!("URL inputs are disabled: {input_str}"));
        }
        if !self.input.exists() {
            return Err(anyhow!("input not found: {}", self.input.display()));
        }
        Ok(())
    }
}

pub fn looks_like_url(s: &str) -> bool {
    let s = s.to_ascii_lowercase();
    s.starts_with("http://") || s.starts_with("https://") || s.starts_with("file://")
}

/// One unit of work for a worker: a source file and where its output goes.
#[derive(Debug, Clone)]
pub struct FileTask {
    pub source: PathBuf,
    pub dest: PathBuf,
    pub format: String,
    pub overwrite: bool,
    pub ocr: bool,
    pub ocr_fast: bool,
}

impl FileTask {
    pub fn from_request(req: &ConversionRequest, source: PathBuf, dest: PathBuf) -> Self {
        Self {
            source,
            dest,
            format: req.format.clone(),
            overwrite: req.overwrite,
            ocr: req.ocr,
            ocr_fast: req.ocr_fast,
        }
    }
}

/// Destination for a single-file conversion. A trailing separator, an existing
/// directory, or an extension-less path means "directory": the file keeps its
/// stem and takes the target format's extension.
pub fn plan_single_destination(source: &Path, output: &Path, format: &str) -> PathBuf {
    let ext = formats::extension_for(format);
    let output_str = output.display().to_string();
    let dir_like = output.is_dir()
        || output_str.ends_with(std::path::MAIN_SEPARATOR)
        || output_str.ends_with('/')
        || output.extension().is_none();

    if dir_like {
        let name = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        output.join(format!("{name}.{ext}"))
    } else {
        output.to_path_buf()
    }
}

/// Destination for one file of a directory batch: the source-relative path
/// under the output root, extension swapped for the target format's.
pub fn plan_batch_destination(
    source: &Path,
    input_root: &Path,
    output_root: &Path,
    format: &str,
) -> PathBuf {
    let ext = formats::extension_for(format);
    let rel = source.strip_prefix(input_root).unwrap_or(source);
    output_root.join(rel).with_extension(ext)
}

/// Convert one file, capturing any failure into the outcome instead of
/// propagating it. This is the only place the per-file tool chain is chosen.
pub fn convert_one<E: Engine>(cfg: &Config, engine: &E, task: &FileTask) -> ConversionOutcome {
    let started = Instant::now();
    let pipeline = formats::pipeline_for(&task.source);
    let source_format = formats::normalized_extension(&task.source).unwrap_or_default();

    let outcome = |status: OutcomeStatus, dest: Option<String>, error: Option<String>| {
        ConversionOutcome {
            source: task.source.display().to_string(),
            source_format: source_format.clone(),
            destination: dest,
            status,
            error,
            pipeline,
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    };

    if !task.overwrite && task.dest.exists() {
        debug!("skip existing output: {}", task.dest.display());
        return outcome(
            OutcomeStatus::Skipped,
            Some(task.dest.display().to_string()),
            None,
        );
    }

    match std::fs::metadata(&task.source) {
        Ok(meta) if meta.len() > cfg.limits.max_input_file_bytes => {
            return outcome(
                OutcomeStatus::Failed,
                None,
                Some(format!(
                    "input exceeds max_input_file_bytes: {}",
                    meta.len()
                )),
            );
        }
        Ok(_) => {}
        Err(e) => {
            return outcome(
                OutcomeStatus::Failed,
                None,
                Some(format!("stat input: {e}")),
            );
        }
    }

    match run_chain(cfg, engine, task, pipeline) {
        Ok(()) => {
            info!(
                "converted {} -> {}",
                task.source.display(),
                task.dest.display()
            );
            outcome(
                OutcomeStatus::Converted,
                Some(task.dest.display().to_string()),
                None,
            )
        }
        Err(e) => outcome(OutcomeStatus::Failed, None, Some(format!("{e:#}"))),
    }
}

fn run_chain<E: Engine>(
    cfg: &Config,
    engine: &E,
    task: &FileTask,
    pipeline: Pipeline,
) -> Result<()> {
    if let Some(parent) = task.dest.parent() {
        ensure_dir(parent)?;
    }

    let to = formats::normalize(&task.format);
    match pipeline {
        Pipeline::Direct => engine.pandoc_convert(&task.source, &task.dest, &to),
        Pipeline::PdfExtract => pdf_chain(cfg, engine, task, &to),
    }
}

/// PDF chain: optional OCR pass, then the extraction worker produces an
/// intermediate docx in the work dir; the intermediate either becomes the
/// destination (target docx) or goes through pandoc and is removed.
fn pdf_chain<E: Engine>(cfg: &Config, engine: &E, task: &FileTask, to: &str) -> Result<()> {
    let work_dir = PathBuf::from(&cfg.paths.work_dir);
    ensure_dir(&work_dir)?;

    let stem = task
        .source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".to_string());
    // Unique per source path so parallel workers never collide in the work dir.
    let tag = &sha256_hex(task.source.display().to_string().as_bytes())[..12];

    let mut extract_input = task.source.clone();
    let mut ocr_temp: Option<PathBuf> = None;

    if task.ocr || task.ocr_fast {
        let ocred = work_dir.join(format!("{stem}-{tag}.ocr.pdf"));
        engine
            .ocr_pdf(&OcrIn {
                input_pdf: task.source.display().to_string(),
                output_pdf: ocred.display().to_string(),
                langs: cfg.ocr.langs.clone(),
                fast: task.ocr_fast,
            })
            .with_context(|| format!("ocr pass: {}", task.source.display()))?;
        extract_input = ocred.clone();
        ocr_temp = Some(ocred);
    }

    let docx_temp = work_dir.join(format!("{stem}-{tag}.docx"));
    let result = (|| -> Result<()> {
        let out = engine
            .extract_pdf(&PdfExtractIn {
                input_pdf: extract_input.display().to_string(),
                output_docx: docx_temp.display().to_string(),
            })
            .with_context(|| format!("pdf extraction: {}", extract_input.display()))?;
        if !out.ok {
            return Err(anyhow!(
                "pdf extraction failed: {}",
                out.error.unwrap_or_else(|| "unknown error".to_string())
            ));
        }

        if to == "docx" {
            move_file(&docx_temp, &task.dest)?;
        } else {
            engine.pandoc_convert(&docx_temp, &task.dest, to)?;
            let _ = std::fs::remove_file(&docx_temp);
        }
        Ok(())
    })();

    if result.is_err() {
        let _ = std::fs::remove_file(&docx_temp);
    }
    if let Some(p) = ocr_temp {
        let _ = std::fs::remove_file(&p);
    }

    result
}

/// Rename, falling back to copy+remove when the work dir and the destination
/// sit on different filesystems.
fn move_file(from: &Path, to: &Path) -> Result<()> {
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }
    std::fs::copy(from, to)
        .with_context(|| format!("copy {} -> {}", from.display(), to.display()))?;
    let _ = std::fs::remove_file(from);
    Ok(())
}
