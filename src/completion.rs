//! Shell completion scripts.

use crate::cli::Cli;
use crate::error::{KataError, Result};
use clap::CommandFactory;
use clap_complete::{generate, Shell};

pub const SUPPORTED_SHELLS: [&str; 3] = ["bash", "zsh", "fish"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellType {
    Bash,
    Zsh,
    Fish,
}

impl ShellType {
    pub fn to_clap_shell(self) -> Shell {
        match self {
            ShellType::Bash => Shell::Bash,
            ShellType::Zsh => Shell::Zsh,
            ShellType::Fish => Shell::Fish,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ShellType::Bash => "bash",
            ShellType::Zsh => "zsh",
            ShellType::Fish => "fish",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "bash" => Ok(ShellType::Bash),
            "zsh" => Ok(ShellType::Zsh),
            "fish" => Ok(ShellType::Fish),
            other => Err(KataError::ShellCompletion(format!(
                "Unsupported shell: '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for ShellType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Detect the user's shell from `$SHELL`.
pub fn detect_shell() -> Result<ShellType> {
    let shell_path = std::env::var("SHELL").map_err(|_| {
        KataError::ShellCompletion(
            "$SHELL is not set; pass the shell name explicitly".to_string(),
        )
    })?;
    parse_shell_from_path(&shell_path)
}

/// Parse a shell type from a path such as `/usr/bin/zsh`.
pub fn parse_shell_from_path(shell_path: &str) -> Result<ShellType> {
    let shell_name = std::path::Path::new(shell_path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(shell_path);
    ShellType::from_name(shell_name)
}

pub fn generate_completion_script(shell: ShellType) -> String {
    let mut cmd = Cli::command();
    let mut buf = Vec::new();
    generate(shell.to_clap_shell(), &mut cmd, "kata", &mut buf);
    String::from_utf8(buf).unwrap_or_default()
}

pub fn print_completion_script(shell: ShellType) {
    print!("{}", generate_completion_script(shell));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shell_from_path() {
        assert_eq!(parse_shell_from_path("/bin/bash").unwrap(), ShellType::Bash);
        assert_eq!(parse_shell_from_path("/usr/local/bin/zsh").unwrap(), ShellType::Zsh);
        assert_eq!(parse_shell_from_path("fish").unwrap(), ShellType::Fish);
    }

    #[test]
    fn test_unsupported_shell_is_error() {
        let err = parse_shell_from_path("/bin/tcsh").unwrap_err();
        assert!(err.to_string().contains("tcsh"));
    }

    #[test]
    fn test_from_name_is_case_insensitive() {
        assert_eq!(ShellType::from_name("ZSH").unwrap(), ShellType::Zsh);
    }

    #[test]
    fn test_generated_scripts_mention_subcommands() {
        for name in SUPPORTED_SHELLS {
            let shell = ShellType::from_name(name).unwrap();
            let script = generate_completion_script(shell);
            assert!(script.contains("kata"), "{} script", shell);
            assert!(script.contains("download"), "{} script", shell);
        }
    }
}
