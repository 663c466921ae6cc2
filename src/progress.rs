//! # Progress Tracking and Statistics Module
//!
//! Progress bar and cumulative statistics for batch runs.
//!
//! ## Components:
//! - `ProgressManager`: wraps the `indicatif` bar
//! - `BatchStats`: counts optimized, warned, failed and fallback files plus
//!   bytes saved
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:00:04] [========================================] 42/42 (100%) ✅ app.js: 61.2% saved
//! ```

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::time::Duration;

/// Manages progress reporting for a batch run
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager
    pub fn new(total_files: u64) -> Self {
        let bar = ProgressBar::new(total_files);

        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
        {
            bar.set_style(style.progress_chars("=>-"));
        }
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Progress manager that draws nothing (JSON mode, tests)
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Update progress with a message
    pub fn update(&self, message: &str) {
        self.bar.inc(1);
        self.bar.set_message(message.to_string());
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

/// Statistics tracker for batch results
#[derive(Debug, Default, Clone, Serialize)]
pub struct BatchStats {
    pub files_processed: usize,
    pub files_optimized: usize,
    /// Optimized, but the engine reported warnings
    pub files_with_warnings: usize,
    pub files_failed: usize,
    /// Failed files whose original source was written instead
    pub files_fallback: usize,
    pub total_original_size: u64,
    pub total_bytes_saved: u64,
}

impl BatchStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_optimized(&mut self, original_size: u64, new_size: u64, had_warnings: bool) {
        self.files_processed += 1;
        self.files_optimized += 1;
        if had_warnings {
            self.files_with_warnings += 1;
        }
        self.total_original_size += original_size;
        self.total_bytes_saved += original_size.saturating_sub(new_size);
    }

    pub fn add_failed(&mut self, original_size: u64, fell_back: bool) {
        self.files_processed += 1;
        self.files_failed += 1;
        if fell_back {
            self.files_fallback += 1;
        }
        self.total_original_size += original_size;
    }

    pub fn overall_reduction_percent(&self) -> f64 {
        calculate_reduction(self.total_original_size, self.total_original_size - self.total_bytes_saved)
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Processed: {} files | Optimized: {} ({} with warnings) | Failed: {} ({} kept original) | Total saved: {} ({:.2}%)",
            self.files_processed,
            self.files_optimized,
            self.files_with_warnings,
            self.files_failed,
            self.files_fallback,
            format_size(self.total_bytes_saved),
            self.overall_reduction_percent()
        )
    }
}

/// Get human-readable size
pub fn format_size(size: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = size as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", size as u64, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

/// Calculate percentage reduction
pub fn calculate_reduction(original_size: u64, new_size: u64) -> f64 {
    if original_size == 0 {
        0.0
    } else {
        ((original_size as f64 - new_size as f64) / original_size as f64) * 100.0
    }
}
