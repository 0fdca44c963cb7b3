//! kata CLI entry point.
//!
//! Parses command-line arguments and dispatches to the appropriate command handler.

use clap::Parser;
use kata::cli::{Cli, Commands};
use kata::commands::{
    config_command, download_command, downloads_command, interactive_command, projects_command,
    test_command,
};
use kata::completion::{detect_shell, print_completion_script, ShellType, SUPPORTED_SHELLS};
use kata::config::log_path;
use kata::logging::init_file_logging;
use kata::output::{print_error, print_warning};

fn main() {
    let cli = Cli::parse();

    match log_path() {
        Ok(path) => {
            if let Err(e) = init_file_logging(&path) {
                print_warning(&format!("Logging disabled: {}", e));
            }
        }
        Err(e) => print_warning(&format!("Logging disabled: {}", e)),
    }

    let result = match &cli.command {
        None => interactive_command(),
        Some(Commands::Projects) => projects_command(),
        Some(Commands::Downloads) => downloads_command(),
        Some(Commands::Download { id, variant }) => download_command(*id, variant),
        Some(Commands::Test { id, variant }) => match test_command(*id, variant) {
            Ok(true) => Ok(()),
            Ok(false) => std::process::exit(1),
            Err(e) => Err(e),
        },
        Some(Commands::Config) => config_command(),
        Some(Commands::Completions { shell }) => {
            let shell = match shell {
                Some(name) => ShellType::from_name(name),
                None => detect_shell(),
            };
            match shell {
                Ok(shell) => {
                    print_completion_script(shell);
                    Ok(())
                }
                Err(e) => {
                    print_error(&format!(
                        "{}\n\nSupported shells: {}",
                        e,
                        SUPPORTED_SHELLS.join(", ")
                    ));
                    std::process::exit(1);
                }
            }
        }
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "command failed");
        print_error(&e.to_string());
        std::process::exit(1);
    }
}
