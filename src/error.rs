use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Session expired, please log in again")]
    Unauthorized,

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Catalog request failed: {0}")]
    Catalog(String),

    #[error("Clone failed: {0}")]
    Clone(String),

    #[error("Project directory not found: {0}")]
    ProjectNotFound(PathBuf),

    #[error("Test run failed: {0}")]
    TestRun(String),

    #[error("No test report found in {0}; the tests may not have run")]
    ReportNotFound(PathBuf),

    #[error("Test report {path} is {age_secs}s old; the tests may not have run")]
    StaleReport { path: PathBuf, age_secs: u64 },

    #[error("Invalid test report: {0}")]
    ReportParse(String),

    #[error("Invalid report timestamp '{0}'")]
    ReportTimestamp(String),

    #[error("Invalid state transition to '{0}'")]
    InvalidTransition(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Signal handler error: {0}")]
    SignalHandler(String),

    #[error("Shell completion error: {0}")]
    ShellCompletion(String),
}

impl From<quick_xml::DeError> for KataError {
    fn from(err: quick_xml::DeError) -> Self {
        KataError::ReportParse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, KataError>;
