//! Metrics for the transform pipeline.
//!
//! A single-row TSV written next to the output when `--metrics` is given,
//! in the same shape as the call files: one serde-derived struct per row.

use std::path::Path;

use anyhow::{Context, Result};
use fgoxide::io::DelimFile;
use serde::{Deserialize, Serialize};

use crate::pipeline::PipelineCounts;

/// One row of pipeline run metrics.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformMetrics {
    /// Evidence records loaded from the evidence file.
    pub evidence_records: u64,
    /// Reorder window used by both resort stages (bp).
    pub window: i64,
    /// Breakend calls read from the input.
    pub breakends_in: u64,
    /// Breakend calls written after annotation.
    pub breakends_out: u64,
    /// Breakend calls that received an assembly annotation.
    pub annotated: u64,
    /// Non-breakend calls passed through untouched.
    pub others: u64,
    /// Total calls written to the output.
    pub written: u64,
}

impl TransformMetrics {
    /// Fold pipeline counts into the metrics row.
    pub fn record_counts(&mut self, counts: &PipelineCounts) {
        self.breakends_in = counts.breakends_in;
        self.breakends_out = counts.breakends_out;
        self.others = counts.others;
        self.written = counts.written;
    }
}

/// Write the metrics row to a TSV file.
pub fn write_metrics<P: AsRef<Path>>(path: P, metrics: &TransformMetrics) -> Result<()> {
    let path = path.as_ref();
    DelimFile::default()
        .write_tsv(&path, std::slice::from_ref(metrics))
        .with_context(|| format!("Failed to write transform metrics: {}", path.display()))
}
