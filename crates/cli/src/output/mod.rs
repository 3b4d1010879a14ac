//! Output formatting utilities
//!
//! This module provides formatters for CLI output in both human-readable
//! and JSON formats.

mod formatter;

pub use formatter::{Formatter, format_time, human_size};

/// Output configuration derived from CLI flags
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    /// Use JSON output format
    pub json: bool,
    /// Disable colored output
    pub no_color: bool,
    /// Suppress non-error output
    pub quiet: bool,
}
