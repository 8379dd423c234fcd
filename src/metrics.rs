// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Display metrics derived from engine task records.
//!
//! Everything here is a pure function and none of it fails: malformed
//! numeric input is read as zero. Units are binary (1 KB = 1024 bytes).

use serde::Serialize;

use crate::rpc::types::{TaskRecord, TaskStatus};

const KIB: f64 = 1024.0;
const MIB: f64 = 1024.0 * 1024.0;
const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Name shown for a task with no file entries.
pub const UNKNOWN_TASK_NAME: &str = "Unknown task";

/// Name shown for a task whose first file has no path yet.
pub const UNNAMED_TASK_NAME: &str = "Unnamed task";

/// Parse one of the engine's decimal-string magnitudes.
///
/// Empty, negative, non-numeric or non-finite input yields 0. A decimal
/// fraction is truncated.
pub fn parse_magnitude(text: &str) -> u64 {
    let text = text.trim();
    if let Ok(value) = text.parse::<u64>() {
        return value;
    }
    match text.parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => value as u64,
        _ => 0,
    }
}

/// Completed fraction in `[0.0, 1.0]`. A zero total yields 0.
pub fn progress_ratio(completed: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (completed as f64 / total as f64).clamp(0.0, 1.0)
}

fn format_binary(bytes: u64, suffix: &str) -> String {
    let value = bytes as f64;
    if value < KIB {
        format!("{} B{}", bytes, suffix)
    } else if value < MIB {
        format!("{:.1} KB{}", value / KIB, suffix)
    } else if value < GIB {
        format!("{:.1} MB{}", value / MIB, suffix)
    } else {
        format!("{:.2} GB{}", value / GIB, suffix)
    }
}

/// Format a transfer rate, e.g. `"1.5 MB/s"`.
pub fn format_rate(bytes_per_second: u64) -> String {
    format_binary(bytes_per_second, "/s")
}

/// Format a size, e.g. `"1.5 KB"`.
pub fn format_size(bytes: u64) -> String {
    format_binary(bytes, "")
}

/// Name to show for a task: the path of its first file, or a placeholder.
pub fn display_name(task: &TaskRecord) -> String {
    match task.files.first() {
        Some(file) if file.path.is_empty() => UNNAMED_TASK_NAME.to_string(),
        Some(file) => file.path.clone(),
        None => UNKNOWN_TASK_NAME.to_string(),
    }
}

/// Display-ready row for one task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskSummary {
    pub gid: String,
    pub name: String,
    pub status: TaskStatus,
    /// Completed fraction in `[0.0, 1.0]`.
    pub progress: f64,
    pub speed: String,
    pub upload_speed: String,
    /// `"<completed> / <total>"`.
    pub size: String,
    /// `"<code>: <message>"` for tasks in the error state.
    pub error: Option<String>,
}

impl TaskSummary {
    pub fn from_record(task: &TaskRecord) -> Self {
        let total = task.total_length();
        let completed = task.completed_length();

        Self {
            gid: task.gid.clone(),
            name: display_name(task),
            status: task.status,
            progress: progress_ratio(completed, total),
            speed: format_rate(task.download_speed()),
            upload_speed: format_rate(task.upload_speed()),
            size: format!("{} / {}", format_size(completed), format_size(total)),
            error: task.error().map(|(code, message)| format!("{}: {}", code, message)),
        }
    }

    /// Progress as a whole-number percentage.
    pub fn percent(&self) -> u8 {
        (self.progress * 100.0).floor() as u8
    }
}
