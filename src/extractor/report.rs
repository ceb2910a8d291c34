use crate::extractor::{BlockSet, WrittenFile};
use crate::orchestrator::CollectionOutcome;
use crate::runner::CommandOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TangleReport {
    pub inputs: Vec<PathBuf>,
    pub inputs_failed: usize,
    pub blocks: Vec<BlockSummary>,
    pub files: Vec<WrittenFile>,
    pub concatenated: Option<WrittenFile>,
    pub command: Option<CommandOutcome>,
    pub errors: Vec<String>,
    pub run_time: DateTime<Utc>,
    pub duration: Duration,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockSummary {
    pub file_name: String,
    pub lines: usize,
    pub bytes: u64,
}

impl TangleReport {
    pub fn from_collection(outcome: &CollectionOutcome, dry_run: bool) -> Self {
        Self {
            inputs: outcome.inputs.clone(),
            inputs_failed: outcome.failures.len(),
            blocks: summarize_blocks(&outcome.blocks),
            files: Vec::new(),
            concatenated: None,
            command: None,
            errors: outcome.failures.iter().map(|e| e.to_string()).collect(),
            run_time: Utc::now(),
            duration: Duration::ZERO,
            dry_run,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn total_lines(&self) -> usize {
        self.blocks.iter().map(|b| b.lines).sum()
    }

    pub fn total_bytes_written(&self) -> u64 {
        self.files.iter().map(|f| f.bytes).sum()
    }
}

pub fn summarize_blocks(blocks: &BlockSet) -> Vec<BlockSummary> {
    blocks
        .iter()
        .map(|b| BlockSummary {
            file_name: b.file_name.clone(),
            lines: b.line_count(),
            bytes: b.byte_len(),
        })
        .collect()
}
