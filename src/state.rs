//! Navigation state machine for the interactive session.
//!
//! The machine tracks the current screen, a history stack used for "back"
//! navigation, and a log of every transition taken.

use crate::error::{KataError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum State {
    RefreshingToken,
    MainMenu,
    Login,
    ProjectNameMenu,
    ProjectVariantMenu,
    TestProjectNameMenu,
    TestProjectVariantMenu,
    TestProject,
}

impl State {
    pub const ALL: [State; 8] = [
        State::RefreshingToken,
        State::MainMenu,
        State::Login,
        State::ProjectNameMenu,
        State::ProjectVariantMenu,
        State::TestProjectNameMenu,
        State::TestProjectVariantMenu,
        State::TestProject,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            State::RefreshingToken => "refreshing-token",
            State::MainMenu => "main-menu",
            State::Login => "login",
            State::ProjectNameMenu => "project-name-menu",
            State::ProjectVariantMenu => "project-variant-menu",
            State::TestProjectNameMenu => "test-project-name-menu",
            State::TestProjectVariantMenu => "test-project-variant-menu",
            State::TestProject => "test-project",
        }
    }

    /// Short title shown in the header bar.
    pub fn title(&self) -> &'static str {
        match self {
            State::RefreshingToken => "Signing in",
            State::MainMenu => "Main menu",
            State::Login => "Log in",
            State::ProjectNameMenu => "Download: choose a project",
            State::ProjectVariantMenu => "Download: choose a variant",
            State::TestProjectNameMenu => "Test: choose a project",
            State::TestProjectVariantMenu => "Test: choose a variant",
            State::TestProject => "Test results",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for State {
    type Err = KataError;

    fn from_str(s: &str) -> Result<Self> {
        State::ALL
            .iter()
            .copied()
            .find(|state| state.name() == s)
            .ok_or_else(|| KataError::InvalidTransition(s.to_string()))
    }
}

/// Finite-state navigation machine.
///
/// History always holds at least the initial state; the last entry is the
/// current state.
#[derive(Debug, Clone)]
pub struct StateMachine {
    history: Vec<State>,
    transitions: Vec<(State, State)>,
}

impl StateMachine {
    pub fn new(initial: State) -> Self {
        Self {
            history: vec![initial],
            transitions: Vec::new(),
        }
    }

    /// Start in `RefreshingToken` when stored credentials exist, else `Login`.
    pub fn for_session(has_credentials: bool) -> Self {
        if has_credentials {
            Self::new(State::RefreshingToken)
        } else {
            Self::new(State::Login)
        }
    }

    pub fn current(&self) -> State {
        // history is never empty
        self.history[self.history.len() - 1]
    }

    pub fn transition(&mut self, to: State) {
        let from = self.current();
        self.history.push(to);
        self.transitions.push((from, to));
    }

    /// Transition to a state given by name.
    ///
    /// Unknown names leave the machine untouched and return
    /// [`KataError::InvalidTransition`].
    pub fn transition_named(&mut self, to: &str) -> Result<State> {
        let state = State::from_str(to)?;
        self.transition(state);
        Ok(state)
    }

    /// Pop the current entry and re-enter the previous one.
    ///
    /// No-op when only the initial entry remains.
    pub fn go_back(&mut self) -> State {
        if self.history.len() > 1 {
            let from = self.history.pop().unwrap_or(State::MainMenu);
            let to = self.current();
            self.transitions.push((from, to));
        }
        self.current()
    }

    /// Restart navigation from `state`, dropping all history.
    pub fn reset_to(&mut self, state: State) {
        let from = self.current();
        self.history.clear();
        self.history.push(state);
        self.transitions.push((from, state));
    }

    pub fn history(&self) -> Vec<State> {
        self.history.clone()
    }

    pub fn transitions(&self) -> &[(State, State)] {
        &self.transitions
    }
}
