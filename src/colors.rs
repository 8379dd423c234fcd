// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! ANSI color codes and status symbols for terminal output.
//!
//! Color usage conventions:
//! - RED = errors, failed tasks
//! - GREEN = success, completed tasks
//! - YELLOW = warnings, paused tasks
//! - CYAN = active tasks, headings
//! - DIM = secondary text, removed tasks

use crate::rpc::TaskStatus;

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";
pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const BLUE: &str = "\x1b[34m";
pub const CYAN: &str = "\x1b[36m";
pub const BRIGHT_CYAN: &str = "\x1b[96m";

/// Status prefixes for CLI messages.
pub mod symbols {
    pub const SUCCESS: &str = "[✓]";
    pub const ERROR: &str = "[✗]";
    pub const WARNING: &str = "[!]";
    pub const PROGRESS_FULL: &str = "█";
    pub const PROGRESS_EMPTY: &str = "░";
}

/// Color for a task status.
pub fn status_color(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Active => CYAN,
        TaskStatus::Waiting => BLUE,
        TaskStatus::Paused => YELLOW,
        TaskStatus::Complete => GREEN,
        TaskStatus::Error => RED,
        TaskStatus::Removed | TaskStatus::Unknown => DIM,
    }
}

/// Render a progress bar for a fraction in `[0.0, 1.0]`.
pub fn progress_bar(ratio: f64, width: usize) -> String {
    let ratio = if ratio.is_finite() { ratio.clamp(0.0, 1.0) } else { 0.0 };
    let filled = ((ratio * width as f64).round() as usize).min(width);
    let color = if filled == width { GREEN } else { CYAN };

    format!(
        "{}{}{}{}",
        color,
        symbols::PROGRESS_FULL.repeat(filled),
        symbols::PROGRESS_EMPTY.repeat(width - filled),
        RESET
    )
}
