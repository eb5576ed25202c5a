use chrono::NaiveDate;
use thiserror::Error;

/// Failure taxonomy for a single ETL run. Every variant aborts the run;
/// there is no partial-success mode.
#[derive(Debug, Error)]
pub enum EtlError {
    /// Object-storage get/put failure.
    #[error("transfer failed for s3://{bucket}/{key}: {reason}")]
    Transfer {
        bucket: String,
        key: String,
        reason: String,
    },

    /// Malformed source data: undecodable bytes, ragged CSV, unparseable
    /// dates, missing required columns, or an empty table.
    #[error("parse error: {0}")]
    Parse(String),

    /// Date-dimension request with the end before the start.
    #[error("invalid date range: end {end} precedes start {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    /// A fact row failed to match a dimension derived from the same table.
    /// This is a transform bug, not a data-quality issue.
    #[error("join invariant violated: fact row {row} has no `{dimension}` entry for key {key:?}")]
    JoinInvariant {
        dimension: String,
        row: usize,
        key: Vec<String>,
    },

    /// Warehouse connectivity, DDL, or bulk-copy failure.
    #[error("warehouse load failed: {0}")]
    Load(String),

    /// Local filesystem failure while persisting or reading output files.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The pipeline stage a failure originated from, so an operator can re-run
/// from the stage that broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extract,
    Transform,
    Upload,
    Load,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Stage::Extract => "extract",
            Stage::Transform => "transform",
            Stage::Upload => "upload",
            Stage::Load => "load",
        })
    }
}

/// An [`EtlError`] tagged with its originating stage.
#[derive(Debug, Error)]
#[error("{stage} stage failed: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: EtlError,
}

impl PipelineError {
    pub fn new(stage: Stage, source: EtlError) -> Self {
        Self { stage, source }
    }
}
