use crate::{
    config::Config,
    dispatch::{self, ConversionRequest, FileTask},
    engine::Engine,
    formats,
    report::{BatchSummary, ConversionOutcome},
    resolve,
    util::{ensure_dir, now_rfc3339, sha256_hex},
};
use anyhow::{anyhow, Context, Result};
use rayon::prelude::*;
use std::time::Instant;
use tracing::info;

/// Run a conversion request end to end: resolve, fan out, aggregate.
///
/// Workers share nothing mutable; each task is independent and every PDF job
/// spawns its own extraction worker process, so the pool needs no coordination
/// beyond collecting outcomes.
pub fn run_batch<E: Engine + Sync>(
    cfg: &Config,
    engine: &E,
    req: &ConversionRequest,
) -> Result<BatchSummary> {
    req.validate(cfg)?;

    let started = now_rfc3339();
    let clock = Instant::now();

    let tasks = build_tasks(cfg, req)?;
    let workers = clamp_workers(cfg, req.parallel);

    let batch_id = sha256_hex(
        format!(
            "{}:{}:{}",
            cfg.normalized_for_hash(),
            req.input.display(),
            req.format
        )
        .as_bytes(),
    )[..16]
        .to_string();

    info!(
        "batch {} files={} workers={} format={}",
        batch_id,
        tasks.len(),
        workers,
        req.format
    );

    let outcomes = run_tasks(cfg, engine, &tasks, workers);

    let summary = BatchSummary::from_outcomes(
        batch_id,
        formats::normalize(&req.format),
        workers,
        started,
        now_rfc3339(),
        clock.elapsed().as_millis() as u64,
        outcomes,
    );

    if cfg.output.write_report_json && req.input.is_dir() {
        let path = req.output.join(&cfg.output.report_filename);
        std::fs::write(&path, serde_json::to_string_pretty(&summary)?)
            .with_context(|| format!("writing report: {}", path.display()))?;
    }

    Ok(summary)
}

fn build_tasks(cfg: &Config, req: &ConversionRequest) -> Result<Vec<FileTask>> {
    if req.input.is_file() {
        let dest = dispatch::plan_single_destination(&req.input, &req.output, &req.format);
        return Ok(vec![FileTask::from_request(req, req.input.clone(), dest)]);
    }

    let files = resolve::resolve_files(&req.input, req.filter.as_deref(), req.recursive)?;
    if files.len() > cfg.limits.max_batch_files {
        return Err(anyhow!(
            "batch exceeds max_batch_files: {} > {}",
            files.len(),
            cfg.limits.max_batch_files
        ));
    }

    ensure_dir(&req.output)?;
    Ok(files
        .into_iter()
        .map(|f| {
            let dest = dispatch::plan_batch_destination(&f, &req.input, &req.output, &req.format);
            FileTask::from_request(req, f, dest)
        })
        .collect())
}

fn run_tasks<E: Engine + Sync>(
    cfg: &Config,
    engine: &E,
    tasks: &[FileTask],
    workers: usize,
) -> Vec<ConversionOutcome> {
    if workers > 1 && tasks.len() > 1 {
        // A dedicated pool so the worker count is exactly what was requested,
        // not whatever the global rayon pool happens to be.
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build();
        match pool {
            Ok(pool) => {
                return pool.install(|| {
                    tasks
                        .par_iter()
                        .map(|t| dispatch::convert_one(cfg, engine, t))
                        .collect()
                });
            }
            Err(e) => {
                tracing::warn!("thread pool unavailable, running sequentially: {e}");
            }
        }
    }

    tasks
        .iter()
        .map(|t| dispatch::convert_one(cfg, engine, t))
        .collect()
}

pub fn clamp_workers(cfg: &Config, requested: usize) -> usize {
    let max = cfg.global.max_parallel.max(1);
    requested.max(1).min(max)
}
