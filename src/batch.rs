//! # Batch Optimizer
//!
//! Host-side driver that runs the script processor over a directory tree.
//!
//! ## Responsibilities:
//! - Recursive discovery of script files (already minified `*.min.js` skipped)
//! - Output path calculation (`<stem>.min.js` next to the source, or the same
//!   relative location under the output directory)
//! - Bounding concurrent engine sessions with a semaphore
//! - Optional fallback to the original source when optimization fails
//! - Progress bar or JSON lines, and final statistics

use crate::config::Config;
use crate::engine::Engine;
use crate::json_output::{FileStatus, JsonMessage};
use crate::library::{FileScript, LibraryKind};
use crate::processor::{Processed, ScriptProcessor};
use crate::progress::{calculate_reduction, BatchStats, ProgressManager};
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

/// Outcome of one file in a batch
#[derive(Debug, Clone)]
pub struct FileReport {
    pub path: PathBuf,
    pub output: Option<PathBuf>,
    pub status: FileStatus,
    pub original_size: u64,
    pub optimized_size: u64,
    pub error_count: usize,
    pub warning_count: usize,
    pub error: Option<String>,
}

impl FileReport {
    fn to_message(&self) -> JsonMessage {
        JsonMessage::FileComplete {
            path: self.path.clone(),
            output: self.output.clone(),
            status: self.status,
            original_size: self.original_size,
            optimized_size: self.optimized_size,
            error_count: self.error_count,
            warning_count: self.warning_count,
            error: self.error.clone(),
        }
    }
}

/// Find all script files under a directory
pub fn find_scripts(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| LibraryKind::from_path(p) == Some(LibraryKind::Script) && !is_minified(p))
        .collect();
    files.sort();
    files
}

fn is_minified(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().to_lowercase().contains(".min."))
        .unwrap_or(false)
}

/// Where the optimized version of `input` is written
pub fn output_path_for(input: &Path, input_base_dir: &Path, output_dir: Option<&Path>) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let extension = input.extension().unwrap_or_default().to_string_lossy();
    let filename = format!("{}.min.{}", stem, extension);

    match output_dir {
        Some(output_dir) => {
            let relative = input
                .strip_prefix(input_base_dir)
                .ok()
                .and_then(Path::parent)
                .unwrap_or(Path::new(""));
            output_dir.join(relative).join(filename)
        }
        None => input.with_file_name(filename),
    }
}

/// Runs a `ScriptProcessor` over every script in a directory
pub struct BatchOptimizer<E> {
    processor: ScriptProcessor<E>,
    config: Config,
    options: Vec<(String, String)>,
}

impl<E: Engine> BatchOptimizer<E> {
    pub fn new(processor: ScriptProcessor<E>, config: Config, options: Vec<(String, String)>) -> Self {
        Self {
            processor,
            config,
            options,
        }
    }

    /// Optimize every script under `input_dir`
    pub async fn run(&self, input_dir: &Path) -> Result<BatchStats> {
        self.config.validate()?;
        if !input_dir.is_dir() {
            return Err(anyhow::anyhow!("Input directory does not exist: {}", input_dir.display()));
        }

        let started = Instant::now();
        let files = find_scripts(input_dir);
        info!("Found {} script(s) under {}", files.len(), input_dir.display());

        if self.config.json_output {
            JsonMessage::Start {
                input_dir: input_dir.to_path_buf(),
                output_dir: self.config.output_path.clone(),
                total_files: files.len(),
                workers: self.config.workers,
            }
            .emit();
        }

        let progress = if self.config.json_output {
            ProgressManager::hidden()
        } else {
            ProgressManager::new(files.len() as u64)
        };

        let semaphore = Semaphore::new(self.config.workers);
        let tasks = files.iter().map(|file| {
            let semaphore = &semaphore;
            let progress = &progress;
            async move {
                let _permit = semaphore.acquire().await?;
                let report = self.process_file(file, input_dir).await;
                if self.config.json_output {
                    report.to_message().emit();
                }
                progress.update(&progress_message(&report));
                Ok::<FileReport, anyhow::Error>(report)
            }
        });
        let reports = futures::future::join_all(tasks).await;

        let mut stats = BatchStats::new();
        for report in reports {
            let report = report?;
            match report.status {
                FileStatus::Optimized => {
                    stats.add_optimized(report.original_size, report.optimized_size, report.warning_count > 0)
                }
                FileStatus::Fallback => stats.add_failed(report.original_size, true),
                FileStatus::Failed => stats.add_failed(report.original_size, false),
            }
        }

        progress.finish(&stats.format_summary());
        if self.config.json_output {
            JsonMessage::Complete {
                stats: stats.clone(),
                duration_seconds: started.elapsed().as_secs_f64(),
            }
            .emit();
        }
        Ok(stats)
    }

    async fn process_file(&self, path: &Path, input_base_dir: &Path) -> FileReport {
        let output_path = output_path_for(path, input_base_dir, self.config.output_path.as_deref());
        let original_size = tokio::fs::metadata(path).await.map(|m| m.len()).unwrap_or(0);
        let script = FileScript::new(path);

        let mut report = FileReport {
            path: path.to_path_buf(),
            output: None,
            status: FileStatus::Failed,
            original_size,
            optimized_size: original_size,
            error_count: 0,
            warning_count: 0,
            error: None,
        };

        let options = self.options.iter().map(|(k, v)| (k.as_str(), v.as_str()));
        match self.processor.compile(LibraryKind::Script, &script, options).await {
            Ok(Processed::Compiled(outcome)) => {
                report.error_count = outcome.error_count();
                report.warning_count = outcome.warning_count();
                if let Some(text) = outcome.output() {
                    match write_output(&output_path, text).await {
                        Ok(()) => {
                            report.status = FileStatus::Optimized;
                            report.output = Some(output_path);
                            report.optimized_size = text.len() as u64;
                            return report;
                        }
                        Err(e) => report.error = Some(e.to_string()),
                    }
                } else {
                    report.error = Some(format!("{} error(s)", outcome.error_count()));
                }
            }
            Ok(Processed::InvalidArguments(reason)) => report.error = Some(reason),
            Ok(Processed::NotHandled) => report.error = Some("not a script".to_string()),
            Err(e) => {
                error!("Failed to optimize {}: {}", path.display(), e);
                report.error = Some(e.to_string());
            }
        }

        if self.config.fallback_to_original {
            match copy_original(path, &output_path).await {
                Ok(()) => {
                    debug!("Kept original source for {}", path.display());
                    report.status = FileStatus::Fallback;
                    report.output = Some(output_path);
                }
                Err(e) => warn!("Could not write original source for {}: {}", path.display(), e),
            }
        }
        report
    }
}

async fn write_output(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, text)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to write {}: {}", path.display(), e))
}

async fn copy_original(source: &Path, target: &Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::copy(source, target).await?;
    Ok(())
}

fn progress_message(report: &FileReport) -> String {
    let name = report.path.file_name().unwrap_or_default().to_string_lossy();
    match report.status {
        FileStatus::Optimized => format!(
            "✅ {}: {:.1}% saved",
            name,
            calculate_reduction(report.original_size, report.optimized_size)
        ),
        FileStatus::Fallback => format!("⚠️ {}: kept original", name),
        FileStatus::Failed => format!("❌ {}", name),
    }
}
