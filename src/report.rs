use crate::formats::Pipeline;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Converted,
    Skipped,
    Failed,
}

/// Per-file record produced by a worker. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutcome {
    pub source: String,
    pub source_format: String,
    pub destination: Option<String>,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub pipeline: Pipeline,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineCounts {
    pub converted: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl PipelineCounts {
    fn record(&mut self, status: OutcomeStatus) {
        match status {
            OutcomeStatus::Converted => self.converted += 1,
            OutcomeStatus::Skipped => self.skipped += 1,
            OutcomeStatus::Failed => self.failed += 1,
        }
    }
}

/// Aggregate view of one batch. Derived purely from the outcome list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub batch_id: String,
    pub output_format: String,
    pub total: usize,
    pub converted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub pdf: PipelineCounts,
    pub direct: PipelineCounts,
    pub workers: usize,
    pub started: String,
    pub finished: String,
    pub elapsed_ms: u64,
    pub outcomes: Vec<ConversionOutcome>,
}

impl BatchSummary {
    pub fn from_outcomes(
        batch_id: String,
        output_format: String,
        workers: usize,
        started: String,
        finished: String,
        elapsed_ms: u64,
        mut outcomes: Vec<ConversionOutcome>,
    ) -> Self {
        outcomes.sort_by(|a, b| a.source.cmp(&b.source));

        let mut pdf = PipelineCounts::default();
        let mut direct = PipelineCounts::default();
        for o in &outcomes {
            match o.pipeline {
                Pipeline::PdfExtract => pdf.record(o.status),
                Pipeline::Direct => direct.record(o.status),
            }
        }

        BatchSummary {
            batch_id,
            output_format,
            total: outcomes.len(),
            converted: pdf.converted + direct.converted,
            skipped: pdf.skipped + direct.skipped,
            failed: pdf.failed + direct.failed,
            pdf,
            direct,
            workers,
            started,
            finished,
            elapsed_ms,
            outcomes,
        }
    }
}
