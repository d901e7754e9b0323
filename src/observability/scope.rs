//! OperationScope: one log line per adapter operation
//!
//! - `complete` logs the event at its own level with the elapsed time
//! - `fail` logs `STORE_FAILURE` at ERROR with the operation and error code
//! - dropping an unfinished scope logs a warning

use std::time::Instant;

use tracing::{debug, error, info, warn, Level};

use super::events::AdapterEvent;

/// Tracks a single adapter operation from start to outcome
#[derive(Debug)]
pub struct OperationScope {
    event: AdapterEvent,
    started: Instant,
    finished: bool,
}

impl OperationScope {
    /// Start tracking an operation
    pub fn new(event: AdapterEvent) -> Self {
        Self {
            event,
            started: Instant::now(),
            finished: false,
        }
    }

    /// Event this scope reports
    pub fn event(&self) -> AdapterEvent {
        self.event
    }

    /// Log successful completion with a short outcome summary
    pub fn complete(mut self, outcome: &str) {
        self.finished = true;
        let elapsed_ms = self.started.elapsed().as_millis() as u64;
        let event = self.event.as_str();

        if self.event.level() == Level::INFO {
            info!(event, outcome, elapsed_ms, "policy operation complete");
        } else {
            debug!(event, outcome, elapsed_ms, "policy operation complete");
        }
    }

    /// Log a failure; the error itself goes back to the caller
    pub fn fail(mut self, command: &str, code: &str, reason: &dyn std::fmt::Display) {
        self.finished = true;
        error!(
            event = AdapterEvent::StoreFailure.as_str(),
            operation = self.event.as_str(),
            command,
            code,
            %reason,
            "store command failed"
        );
    }
}

impl Drop for OperationScope {
    fn drop(&mut self) {
        if !self.finished {
            warn!(
                event = self.event.as_str(),
                "policy operation abandoned before completion"
            );
        }
    }
}
