//! Console output for the non-interactive subcommands.
//!
//! - [`messages`] - Error, warning, info and success lines
//! - [`catalog`] - Project listings and the download registry
//! - [`results`] - Grouped test results
//! - [`progress`] - Clone progress bar and test spinner

pub mod catalog;
pub mod messages;
pub mod progress;
pub mod results;

/// ANSI color codes for terminal output.
pub mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const CYAN: &str = "\x1b[36m";
    pub const RED: &str = "\x1b[31m";
    pub const GRAY: &str = "\x1b[90m";
}

pub use colors::*;

pub use catalog::{print_downloads, print_projects};
pub use messages::{print_error, print_info, print_success, print_warning};
pub use progress::{CloneProgressBar, TestSpinner};
pub use results::{format_results, print_results};
