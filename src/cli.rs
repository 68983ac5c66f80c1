use crate::{
    batch,
    config::Config,
    dispatch::ConversionRequest,
    engine::{shell::ShellEngine, Engine},
    formats, metadata, resolve,
    util::ensure_dir,
};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "doc-convoy")]
#[command(about = "Batch document conversion orchestrator (pandoc + PDF extraction + OCR + GROBID)")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./doc-convoy.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Convert a file or directory to one output format.
    Convert {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long)]
        format: String,
        /// Only convert files with this extension (e.g. 'pdf').
        #[arg(long)]
        filter: Option<String>,
        #[arg(long)]
        recursive: bool,
        /// Number of parallel workers (clamped to the configured maximum).
        #[arg(long)]
        parallel: Option<usize>,
        /// Skip files whose output already exists instead of overwriting.
        #[arg(long)]
        no_overwrite: bool,
        /// Run an OCR pass over PDF inputs before extraction.
        #[arg(long)]
        ocr: bool,
        /// OCR with the configured fast-path arguments.
        #[arg(long)]
        ocr_fast: bool,
    },
    /// List supported input and output formats.
    Formats {},
    /// List convertible files under a path, grouped by extension.
    List {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        recursive: bool,
    },
    /// OCR a single PDF.
    Ocr {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long)]
        fast: bool,
    },
    /// Extract header metadata (title, authors, DOI, abstract).
    Metadata {
        #[arg(long)]
        input: PathBuf,
        /// Also write the raw TEI response here.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Extract bibliography entries.
    References {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Extract the full body text.
    Fulltext {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Check the external collaborators (pandoc, extraction worker, OCR, metadata service).
    Doctor {},
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg = match resolve_config_path(args.config.as_deref()) {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };
    let _guard = init_logging(&args, &cfg, resolve_log_path(&cfg).as_deref())?;

    match &args.cmd {
        Command::Convert {
            input,
            output,
            format,
            filter,
            recursive,
            parallel,
            no_overwrite,
            ocr,
            ocr_fast,
        } => {
            let req = ConversionRequest {
                input: input.clone(),
                output: output.clone(),
                format: format.clone(),
                filter: filter.clone(),
                recursive: *recursive,
                parallel: parallel.unwrap_or(cfg.global.default_parallel),
                overwrite: !no_overwrite,
                ocr: *ocr,
                ocr_fast: *ocr_fast,
            };
            convert(&cfg, &req)
        }
        Command::Formats {} => print_formats(),
        Command::List { path, recursive } => list_convertible(path, *recursive),
        Command::Ocr {
            input,
            output,
            fast,
        } => ocr_document(&cfg, input, output, *fast),
        Command::Metadata { input, output } => {
            let client = metadata::MetadataClient::new(&cfg)?;
            let record = client.extract_metadata(input, output.as_deref())?;
            print_json(&record)
        }
        Command::References { input, output } => {
            let client = metadata::MetadataClient::new(&cfg)?;
            let record = client.extract_references(input, output.as_deref())?;
            print_json(&record)
        }
        Command::Fulltext { input, output } => {
            let client = metadata::MetadataClient::new(&cfg)?;
            let record = client.extract_fulltext(input, output.as_deref())?;
            print_json(&record)
        }
        Command::Doctor {} => doctor(&cfg),
    }
}

fn resolve_config_path(user: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = user {
        return Some(p.to_path_buf());
    }
    for candidate in ["doc-convoy.toml", "doc-convoy.example.toml"] {
        let path = PathBuf::from(candidate);
        if path.exists() {
            return Some(path);
        }
    }
    None
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stderr_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn resolve_log_path(cfg: &Config) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }
    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }
    Some(PathBuf::from("doc-convoy.log"))
}

fn convert(cfg: &Config, req: &ConversionRequest) -> Result<()> {
    let engine = ShellEngine::new(cfg)?;
    let summary = batch::run_batch(cfg, &engine, req)?;

    if cfg.debug.dump_effective_config {
        let raw = toml::to_string(cfg).unwrap_or_default();
        std::fs::write("effective-config.toml", raw)?;
    }

    if cfg.global.print_summary {
        print_json(&summary)?;
    }
    Ok(())
}

fn print_formats() -> Result<()> {
    print_json(&serde_json::json!({
        "input_formats": formats::INPUT_EXTENSIONS,
        "output_formats": formats::OUTPUT_FORMATS,
        "note": "PDF input goes through the extraction worker, then pandoc. \
                 All other conversions use pandoc directly.",
    }))
}

fn list_convertible(path: &Path, recursive: bool) -> Result<()> {
    let files = resolve::resolve_files(path, None, recursive)?;
    let by_format = resolve::group_by_extension(&files);
    print_json(&serde_json::json!({
        "count": files.len(),
        "by_format": by_format,
    }))
}

fn ocr_document(cfg: &Config, input: &Path, output: &Path, fast: bool) -> Result<()> {
    let engine = ShellEngine::new(cfg)?;
    engine.ocr_pdf(&crate::engine::OcrIn {
        input_pdf: input.display().to_string(),
        output_pdf: output.display().to_string(),
        langs: cfg.ocr.langs.clone(),
        fast,
    })?;
    print_json(&serde_json::json!({
        "input": input,
        "output": output,
        "ok": true,
    }))
}

fn doctor(cfg: &Config) -> Result<()> {
    let engine = ShellEngine::new(cfg)?;
    let diag = engine.doctor()?;
    let metadata_alive = metadata::MetadataClient::new(cfg)?.is_alive();
    print_json(&serde_json::json!({
        "pandoc": diag.pandoc,
        "pdf_worker": diag.pdf_worker,
        "ocr": diag.ocr,
        "metadata_service": {
            "ok": metadata_alive,
            "base_url": cfg.metadata.base_url,
        },
    }))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
