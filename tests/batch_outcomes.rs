use anyhow::{anyhow, Result};
use doc_convoy::{
    batch::{clamp_workers, run_batch},
    config::Config,
    dispatch::ConversionRequest,
    engine::{Engine, EngineDiag, OcrIn, PdfExtractIn, PdfExtractOut, ToolStatus},
    report::OutcomeStatus,
};
use std::fs;
use std::path::{Path, PathBuf};

/// Writes placeholder outputs; fails when the input file name contains "fail".
struct MockEngine;

fn ok_status() -> ToolStatus {
    ToolStatus {
        ok: true,
        version: None,
        error: None,
    }
}

impl Engine for MockEngine {
    fn doctor(&self) -> Result<EngineDiag> {
        Ok(EngineDiag {
            pandoc: ok_status(),
            pdf_worker: ok_status(),
            ocr: ok_status(),
        })
    }

    fn extract_pdf(&self, req: &PdfExtractIn) -> Result<PdfExtractOut> {
        fs::write(&req.output_docx, b"intermediate docx")?;
        Ok(PdfExtractOut {
            ok: true,
            pages: Some(1),
            error: None,
        })
    }

    fn pandoc_convert(&self, input: &Path, output: &Path, _to: &str) -> Result<()> {
        let name = input
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        if name.contains("fail") {
            return Err(anyhow!("simulated pandoc failure"));
        }
        fs::write(output, b"converted")?;
        Ok(())
    }

    fn ocr_pdf(&self, req: &OcrIn) -> Result<()> {
        fs::copy(&req.input_pdf, &req.output_pdf)?;
        Ok(())
    }
}

fn test_config(work_dir: &Path) -> Config {
    let mut cfg = Config::default();
    cfg.paths.work_dir = work_dir.display().to_string();
    cfg.global.print_summary = false;
    cfg
}

fn request(input: &Path, output: &Path, format: &str) -> ConversionRequest {
    ConversionRequest {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        format: format.to_string(),
        filter: None,
        recursive: true,
        parallel: 1,
        overwrite: true,
        ocr: false,
        ocr_fast: false,
    }
}

fn touch(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

#[test]
fn counts_always_add_up() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("in");
    let out = dir.path().join("out");
    touch(&src.join("a.md"), "a");
    touch(&src.join("b.md"), "b");
    touch(&src.join("c.pdf"), "c");
    touch(&src.join("fail.md"), "boom");

    let cfg = test_config(&dir.path().join("work"));
    let summary = run_batch(&cfg, &MockEngine, &request(&src, &out, "markdown")).unwrap();

    assert_eq!(summary.total, 4);
    assert_eq!(
        summary.converted + summary.skipped + summary.failed,
        summary.total
    );
    assert_eq!(summary.converted, 3);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.pdf.converted, 1);
    assert_eq!(summary.direct.converted, 2);
    assert_eq!(summary.direct.failed, 1);

    let failed = summary
        .outcomes
        .iter()
        .find(|o| o.status == OutcomeStatus::Failed)
        .unwrap();
    assert!(failed.error.as_deref().unwrap().contains("simulated"));
    assert!(failed.destination.is_none());
}

#[test]
fn no_overwrite_skips_and_preserves_existing_output() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("in");
    let out = dir.path().join("out");
    touch(&src.join("a.md"), "a");

    let cfg = test_config(&dir.path().join("work"));

    let first = run_batch(&cfg, &MockEngine, &request(&src, &out, "markdown")).unwrap();
    assert_eq!(first.converted, 1);

    let dest = out.join("a.md");
    fs::write(&dest, "precious").unwrap();

    let mut req = request(&src, &out, "markdown");
    req.overwrite = false;
    let second = run_batch(&cfg, &MockEngine, &req).unwrap();

    assert_eq!(second.skipped, 1);
    assert_eq!(second.failed, 0);
    assert_eq!(second.converted, 0);
    assert_eq!(fs::read_to_string(&dest).unwrap(), "precious");
}

#[test]
fn overwrite_true_replaces_existing_output() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("in");
    let out = dir.path().join("out");
    touch(&src.join("a.md"), "a");
    touch(&out.join("a.md"), "stale");

    let cfg = test_config(&dir.path().join("work"));
    let summary = run_batch(&cfg, &MockEngine, &request(&src, &out, "markdown")).unwrap();

    assert_eq!(summary.converted, 1);
    assert_eq!(fs::read_to_string(out.join("a.md")).unwrap(), "converted");
}

#[test]
fn parallel_run_collects_every_outcome_sorted() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("in");
    let out = dir.path().join("out");
    for i in 0..6 {
        touch(&src.join(format!("doc{i}.md")), "x");
    }

    let cfg = test_config(&dir.path().join("work"));
    let mut req = request(&src, &out, "html");
    req.parallel = 4;
    let summary = run_batch(&cfg, &MockEngine, &req).unwrap();

    assert_eq!(summary.total, 6);
    assert_eq!(summary.converted, 6);
    assert_eq!(summary.workers, 4);
    let sources: Vec<_> = summary.outcomes.iter().map(|o| o.source.clone()).collect();
    let mut sorted = sources.clone();
    sorted.sort();
    assert_eq!(sources, sorted);
}

#[test]
fn pdf_chain_cleans_up_work_dir_intermediates() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("in");
    let out = dir.path().join("out");
    let work = dir.path().join("work");
    touch(&src.join("paper.pdf"), "pdf bytes");

    let cfg = test_config(&work);
    let summary = run_batch(&cfg, &MockEngine, &request(&src, &out, "markdown")).unwrap();

    assert_eq!(summary.converted, 1);
    assert!(out.join("paper.md").exists());
    let leftovers: Vec<PathBuf> = fs::read_dir(&work)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert!(leftovers.is_empty(), "work dir not cleaned: {leftovers:?}");
}

#[test]
fn pdf_to_docx_moves_intermediate_into_place() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("in");
    let out = dir.path().join("out");
    touch(&src.join("paper.pdf"), "pdf bytes");

    let cfg = test_config(&dir.path().join("work"));
    let summary = run_batch(&cfg, &MockEngine, &request(&src, &out, "docx")).unwrap();

    assert_eq!(summary.converted, 1);
    assert_eq!(
        fs::read_to_string(out.join("paper.docx")).unwrap(),
        "intermediate docx"
    );
}

#[test]
fn unsupported_format_fails_before_any_file_is_touched() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("in");
    let out = dir.path().join("out");
    touch(&src.join("a.md"), "a");

    let cfg = test_config(&dir.path().join("work"));
    let err = run_batch(&cfg, &MockEngine, &request(&src, &out, "xyz")).unwrap_err();
    assert!(err.to_string().contains("unsupported output format"));
    assert!(!out.exists());
}

#[test]
fn single_file_request_through_the_batch_runner() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("doc.md");
    touch(&input, "hello");
    let output = dir.path().join("doc.html");

    let cfg = test_config(&dir.path().join("work"));
    let summary = run_batch(&cfg, &MockEngine, &request(&input, &output, "html")).unwrap();

    assert_eq!(summary.total, 1);
    assert_eq!(summary.converted, 1);
    assert!(output.exists());
}

#[test]
fn oversized_input_fails_without_aborting_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("in");
    let out = dir.path().join("out");
    touch(&src.join("big.md"), "far too many bytes");
    touch(&src.join("small.md"), "x");

    let mut cfg = test_config(&dir.path().join("work"));
    cfg.limits.max_input_file_bytes = 4;
    let summary = run_batch(&cfg, &MockEngine, &request(&src, &out, "markdown")).unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.converted, 1);
    let failed = summary
        .outcomes
        .iter()
        .find(|o| o.status == OutcomeStatus::Failed)
        .unwrap();
    assert!(failed
        .error
        .as_deref()
        .unwrap()
        .contains("max_input_file_bytes"));
}

#[test]
fn worker_count_is_clamped() {
    let cfg = Config::default();
    assert_eq!(clamp_workers(&cfg, 0), 1);
    assert_eq!(clamp_workers(&cfg, 1), 1);
    assert_eq!(clamp_workers(&cfg, 8), 8);
    assert_eq!(clamp_workers(&cfg, 99), 16);
}
