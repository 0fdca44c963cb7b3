//! File logging.
//!
//! The interactive session owns the terminal, so diagnostics go to a log file
//! in the config directory instead of stderr.

use crate::error::{KataError, Result};
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directive.
pub const LOG_ENV_VAR: &str = "KATA_LOG";

const DEFAULT_FILTER: &str = "info";

pub fn init_file_logging(log_path: &Path) -> Result<()> {
    if let Some(parent) = log_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .map_err(|e| {
            KataError::Config(format!(
                "failed to open log file '{}': {}",
                log_path.display(),
                e
            ))
        })?;

    // A second init (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_from_env())
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(log_file))
        .try_init();

    Ok(())
}

fn filter_from_env() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_log_file_and_parent() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("logs").join("kata.log");

        init_file_logging(&path).unwrap();
        init_file_logging(&path).unwrap();

        assert!(path.exists());
    }
}
