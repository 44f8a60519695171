//! Progress reporting.
//!
//! A [`Reporter`] is handed to every pipeline stage. It scopes log output to
//! the stage that produced it and times named steps.

use std::{
    fmt,
    time::{Duration, Instant},
};

use tracing::{info, warn};

/// Pipeline phase a module failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Bundle,
    Manifest,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bundle => f.write_str("bundle"),
            Self::Manifest => f.write_str("manifest"),
        }
    }
}

/// A module that failed in some phase, kept for the final report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleFailure {
    pub module: String,
    pub phase: Phase,
    pub message: String,
}

impl fmt::Display for ModuleFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} failed: {}", self.module, self.phase, self.message)
    }
}

/// Scoped reporting handle.
#[derive(Debug, Clone)]
pub struct Reporter {
    scope: String,
}

impl Reporter {
    /// Create a root reporter.
    #[must_use]
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
        }
    }

    /// Scope name, `/`-separated for nested reporters.
    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Reporter for a nested stage.
    #[must_use]
    pub fn child(&self, name: &str) -> Self {
        Self {
            scope: format!("{}/{name}", self.scope),
        }
    }

    /// Start timing a step. The duration is logged when the timer ends or drops.
    #[must_use]
    pub fn time(&self, label: impl Into<String>) -> StageTimer {
        let label = label.into();
        info!(scope = %self.scope, step = %label, "started");
        StageTimer {
            scope: self.scope.clone(),
            label,
            start: Instant::now(),
        }
    }

    /// Log a module that was intentionally left out.
    pub fn skipped(&self, module: &str, reason: impl fmt::Display) {
        info!(scope = %self.scope, module, %reason, "skipping");
    }

    /// Log a module failure and turn it into a report entry.
    pub fn failed(&self, module: &str, phase: Phase, error: impl fmt::Display) -> ModuleFailure {
        let message = error.to_string();
        warn!(scope = %self.scope, module, %phase, error = %message, "module failed");
        ModuleFailure {
            module: module.to_string(),
            phase,
            message,
        }
    }
}

/// Timer for one named step.
#[derive(Debug)]
pub struct StageTimer {
    scope: String,
    label: String,
    start: Instant,
}

impl StageTimer {
    /// Stop the timer and return the elapsed time.
    pub fn end(self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for StageTimer {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        info!(
            scope = %self.scope,
            step = %self.label,
            duration_ms = elapsed.as_millis() as u64,
            "finished"
        );
    }
}
