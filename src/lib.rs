pub mod auth;
pub mod cancel;
pub mod catalog;
pub mod cli;
pub mod commands;
pub mod completion;
pub mod config;
pub mod download;
pub mod error;
pub mod logging;
pub mod output;
pub mod process;
pub mod registry;
pub mod report;
pub mod session;
pub mod state;
pub mod testrun;
pub mod tui;
pub mod workspace;

pub use error::{KataError, Result};
pub use session::{Controller, Services};
pub use state::{State, StateMachine};
