//! Cooperative cancellation for long-running subprocess work.
//!
//! A [`CancelFlag`] is cloned into every clone or test-run loop. The loops
//! poll it between reads and kill their child process once it is raised.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{KataError, Result};

#[derive(Clone, Debug, Default)]
pub struct CancelFlag {
    raised: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a flag that is raised when the process receives Ctrl+C.
    ///
    /// `ctrlc` accepts a single handler per process, so call this at most once.
    pub fn on_interrupt() -> Result<Self> {
        let flag = Self::new();
        let handle = flag.clone();

        ctrlc::set_handler(move || {
            handle.cancel();
        })
        .map_err(|e| KataError::SignalHandler(e.to_string()))?;

        Ok(flag)
    }

    pub fn cancel(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once the flag has been raised.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(KataError::Cancelled)
        } else {
            Ok(())
        }
    }
}
