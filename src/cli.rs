//! Command-line definition.

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "kata")]
#[command(
    version,
    about = "Download practice projects and run their test suites",
    after_help = "EXAMPLES:
    # Browse, download and test projects interactively
    kata

    # List the catalog and what is already downloaded
    kata projects
    kata downloads

    # Download and test without the interactive screen
    kata download 12 --variant rust
    kata test 12 --variant rust"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List every project in the catalog
    Projects,

    /// Show projects recorded as downloaded
    Downloads,

    /// Download a project variant and its test harness
    #[command(after_help = "EXAMPLES:
    kata download 12 --variant rust
    kata download 12 --variant go      # replaces any existing copy")]
    Download {
        /// Catalog id of the project
        id: u64,

        /// Variant (language) to download
        #[arg(short, long)]
        variant: String,
    },

    /// Run the test harness against a downloaded project
    #[command(after_help = "EXAMPLES:
    kata test 12 --variant rust

Exits with status 1 when any test fails.")]
    Test {
        /// Catalog id of the project
        id: u64,

        /// Variant (language) the project was downloaded in
        #[arg(short, long)]
        variant: String,
    },

    /// Print the configuration file path and its effective values
    Config,

    /// Print a shell completion script
    #[command(after_help = "EXAMPLES:
    kata completions zsh > ~/.zfunc/_kata
    kata completions bash > ~/.local/share/bash-completion/completions/kata")]
    Completions {
        /// Shell name (bash, zsh, fish); detected from $SHELL when omitted
        shell: Option<String>,
    },
}
