//! # JSON Output Module
//!
//! JSON lines emitted on stdout in `--json` mode, for hosts that drive the
//! binary from another process.
//!
//! ## Message types:
//! - `start`: batch started
//! - `file_complete`: one script finished (optimized, fallback or failed)
//! - `complete`: batch finished, with final statistics
//! - `audit`: tree audit finished
//! - `error`: fatal error

use crate::audit::AuditSummary;
use crate::progress::BatchStats;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Final state of one script in a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Optimized,
    /// Compilation failed, the original source was written
    Fallback,
    Failed,
}

/// JSON message type
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum JsonMessage {
    #[serde(rename = "start")]
    Start {
        input_dir: PathBuf,
        output_dir: Option<PathBuf>,
        total_files: usize,
        workers: usize,
    },

    #[serde(rename = "file_complete")]
    FileComplete {
        path: PathBuf,
        output: Option<PathBuf>,
        status: FileStatus,
        original_size: u64,
        optimized_size: u64,
        error_count: usize,
        warning_count: usize,
        error: Option<String>,
    },

    #[serde(rename = "complete")]
    Complete {
        #[serde(flatten)]
        stats: BatchStats,
        duration_seconds: f64,
    },

    #[serde(rename = "audit")]
    Audit {
        root: PathBuf,
        #[serde(flatten)]
        summary: AuditSummary,
    },

    #[serde(rename = "error")]
    Error { message: String, details: Option<String> },
}

impl JsonMessage {
    /// Emit the message on stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    pub fn error(message: String, details: Option<String>) -> Self {
        Self::Error { message, details }
    }
}
