use crate::error::{KataError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// The base config directory name under ~/.config/
const CONFIG_DIR_NAME: &str = "kata";

/// Default directory name (under the home directory) where projects are cloned.
const DEFAULT_PROJECTS_DIR_NAME: &str = "kata";

const DEFAULT_API_URL: &str = "https://api.kata.dev/v1";
const DEFAULT_REPO_BASE_URL: &str = "https://github.com/kata-projects";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_REPORT_MAX_AGE_SECS: u64 = 300;

// ============================================================================
// Configuration
// ============================================================================

/// User configuration, stored at `~/.config/kata/config.toml`.
///
/// Missing fields fall back to their defaults, so a partial file is valid.
///
/// # Example
///
/// ```toml
/// api_url = "https://api.kata.dev/v1"
/// repo_base_url = "https://github.com/kata-projects"
/// projects_dir = "/home/me/kata"
/// request_timeout_secs = 10
/// report_max_age_secs = 300
/// test_command = ["docker", "compose", "-f", "{harness_dir}/docker-compose.yml", "run", "--rm", "--build", "tests"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the catalog and auth API.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Base URL that project and harness repositories are cloned from.
    #[serde(default = "default_repo_base_url")]
    pub repo_base_url: String,

    /// Where downloaded projects live. Defaults to `~/kata`.
    #[serde(default)]
    pub projects_dir: Option<PathBuf>,

    /// Timeout for every HTTP request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Maximum age of a test report before it is considered stale.
    #[serde(default = "default_report_max_age_secs")]
    pub report_max_age_secs: u64,

    /// Container command used to build and test a project.
    ///
    /// Supports the placeholders `{project_dir}`, `{harness_dir}`, `{variant}`
    /// and `{slug}`.
    #[serde(default = "default_test_command")]
    pub test_command: Vec<String>,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_repo_base_url() -> String {
    DEFAULT_REPO_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_report_max_age_secs() -> u64 {
    DEFAULT_REPORT_MAX_AGE_SECS
}

fn default_test_command() -> Vec<String> {
    [
        "docker",
        "compose",
        "-f",
        "{harness_dir}/docker-compose.yml",
        "run",
        "--rm",
        "--build",
        "tests",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            repo_base_url: default_repo_base_url(),
            projects_dir: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            report_max_age_secs: DEFAULT_REPORT_MAX_AGE_SECS,
            test_command: default_test_command(),
        }
    }
}

impl Config {
    /// Resolve the projects directory, falling back to `~/kata`.
    pub fn resolved_projects_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.projects_dir {
            return Ok(dir.clone());
        }
        let home = dirs::home_dir()
            .ok_or_else(|| KataError::Config("Could not determine home directory".to_string()))?;
        Ok(home.join(DEFAULT_PROJECTS_DIR_NAME))
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }

    pub fn report_max_age(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.report_max_age_secs)
    }
}

// ============================================================================
// Config Validation
// ============================================================================

/// Error type for configuration validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `test_command` has no program to run.
    EmptyTestCommand,
    /// `request_timeout_secs` is zero.
    ZeroRequestTimeout,
    /// `report_max_age_secs` is zero, which would reject every report.
    ZeroReportMaxAge,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::EmptyTestCommand => {
                write!(f, "`test_command` must name at least the program to run")
            }
            ConfigError::ZeroRequestTimeout => {
                write!(f, "`request_timeout_secs` must be greater than zero")
            }
            ConfigError::ZeroReportMaxAge => {
                write!(f, "`report_max_age_secs` must be greater than zero")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Validate a configuration for logical consistency.
///
/// ```
/// use kata::config::{validate_config, Config};
///
/// assert!(validate_config(&Config::default()).is_ok());
///
/// let invalid = Config {
///     test_command: Vec::new(),
///     ..Default::default()
/// };
/// assert!(validate_config(&invalid).is_err());
/// ```
pub fn validate_config(config: &Config) -> std::result::Result<(), ConfigError> {
    if config.test_command.first().is_none_or(|p| p.trim().is_empty()) {
        return Err(ConfigError::EmptyTestCommand);
    }
    if config.request_timeout_secs == 0 {
        return Err(ConfigError::ZeroRequestTimeout);
    }
    if config.report_max_age_secs == 0 {
        return Err(ConfigError::ZeroReportMaxAge);
    }
    Ok(())
}

// ============================================================================
// Config File Management
// ============================================================================

const CONFIG_FILENAME: &str = "config.toml";
const LOG_FILENAME: &str = "kata.log";
const REGISTRY_FILENAME: &str = "downloads.json";
const CREDENTIALS_FILENAME: &str = "credentials.json";

/// Get the path to the config file (`~/.config/kata/config.toml`).
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILENAME))
}

/// Path of the log file written by the tracing subscriber.
pub fn log_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(LOG_FILENAME))
}

/// Path of the persisted download registry.
pub fn registry_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(REGISTRY_FILENAME))
}

/// Path of the stored credentials.
pub fn credentials_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CREDENTIALS_FILENAME))
}

/// Load and validate the configuration from `~/.config/kata/config.toml`.
///
/// If the file doesn't exist it is created with default values and comments.
pub fn load_config() -> Result<Config> {
    ensure_config_dir()?;
    load_config_from(&config_path()?)
}

/// Load and validate the configuration from an explicit path.
///
/// A missing file is written with the commented defaults.
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        let config = Config::default();
        save_config_to(path, &config)?;
        return Ok(config);
    }

    let content = fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content).map_err(|e| {
        KataError::Config(format!("Failed to parse config file at {:?}: {}", path, e))
    })?;

    validate_config(&config).map_err(|e| KataError::Config(e.to_string()))?;

    Ok(config)
}

/// Save the configuration, overwriting any user comments.
pub fn save_config_to(path: &Path, config: &Config) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, generate_config_with_comments(config))?;
    Ok(())
}

/// Generate config file content with explanatory comments.
fn generate_config_with_comments(config: &Config) -> String {
    let test_command = toml::Value::Array(
        config
            .test_command
            .iter()
            .map(|arg| toml::Value::String(arg.clone()))
            .collect(),
    );
    let projects_dir = match &config.projects_dir {
        Some(dir) => format!(
            "projects_dir = {}",
            toml::Value::String(dir.display().to_string())
        ),
        None => "# projects_dir = \"~/kata\"".to_string(),
    };

    format!(
        r#"# kata configuration

# Catalog and authentication API
api_url = {}

# Repositories are cloned from <repo_base_url>/<project>-<variant>.git
repo_base_url = {}

# Where downloaded projects are stored (defaults to ~/kata)
{}

# Timeout in seconds for every API request
request_timeout_secs = {}

# A test report older than this many seconds is treated as stale
report_max_age_secs = {}

# Container command that builds and tests a project.
# Placeholders: {{project_dir}}, {{harness_dir}}, {{variant}}, {{slug}}
test_command = {}
"#,
        toml::Value::String(config.api_url.clone()),
        toml::Value::String(config.repo_base_url.clone()),
        projects_dir,
        config.request_timeout_secs,
        config.report_max_age_secs,
        test_command
    )
}

// ============================================================================
// Directory Management
// ============================================================================

/// Get the kata config directory path (~/.config/kata/).
///
/// Honors `KATA_CONFIG_DIR` when set. Does not create the directory.
pub fn config_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os("KATA_CONFIG_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir()
        .ok_or_else(|| KataError::Config("Could not determine home directory".to_string()))?;
    Ok(home.join(".config").join(CONFIG_DIR_NAME))
}

/// Ensure the config directory exists.
///
/// Returns whether the directory was newly created.
pub fn ensure_config_dir() -> Result<(PathBuf, bool)> {
    let dir = config_dir()?;
    let created = !dir.exists();
    fs::create_dir_all(&dir)?;
    Ok((dir, created))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_empty_test_command_is_rejected() {
        let config = Config {
            test_command: vec!["  ".to_string()],
            ..Default::default()
        };
        assert_eq!(
            validate_config(&config),
            Err(ConfigError::EmptyTestCommand)
        );
    }

    #[test]
    fn test_zero_timeouts_are_rejected() {
        let config = Config {
            request_timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(
            validate_config(&config),
            Err(ConfigError::ZeroRequestTimeout)
        );

        let config = Config {
            report_max_age_secs: 0,
            ..Default::default()
        };
        assert_eq!(validate_config(&config), Err(ConfigError::ZeroReportMaxAge));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str("api_url = \"http://localhost:8080\"").unwrap();
        assert_eq!(config.api_url, "http://localhost:8080");
        assert_eq!(config.repo_base_url, DEFAULT_REPO_BASE_URL);
        assert_eq!(config.report_max_age_secs, DEFAULT_REPORT_MAX_AGE_SECS);
        assert_eq!(config.test_command, default_test_command());
    }

    #[test]
    fn test_load_config_from_creates_commented_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        let config = load_config_from(&path).unwrap();
        assert_eq!(config, Config::default());

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("# kata configuration"));
        assert!(content.contains("report_max_age_secs = 300"));
    }

    #[test]
    fn test_generated_config_round_trips() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        let config = Config {
            projects_dir: Some(temp.path().join("projects")),
            report_max_age_secs: 60,
            test_command: vec!["podman".to_string(), "run".to_string(), "{slug}".to_string()],
            ..Default::default()
        };

        save_config_to(&path, &config).unwrap();
        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_invalid_toml_is_a_config_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "api_url = [").unwrap();

        let err = load_config_from(&path).unwrap_err();
        assert!(matches!(err, KataError::Config(_)));
    }

    #[test]
    fn test_invalid_values_are_a_config_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "test_command = []").unwrap();

        let err = load_config_from(&path).unwrap_err();
        assert!(err.to_string().contains("test_command"));
    }

    #[test]
    fn test_resolved_projects_dir_prefers_explicit_value() {
        let config = Config {
            projects_dir: Some(PathBuf::from("/tmp/kata-projects")),
            ..Default::default()
        };
        assert_eq!(
            config.resolved_projects_dir().unwrap(),
            PathBuf::from("/tmp/kata-projects")
        );
    }
}
