//! Shared circuit breaker for per-file analysis.
//!
//! Every language analyzer runs its AST walk through a [`RecursionGuard`] and
//! bounds total wall-clock time with [`run_with_timeout`], rather than each
//! analyzer re-implementing its own limits.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::ParserError;

/// Maximum recursion depth before an analyzer aborts the current file.
pub const MAX_RECURSION_DEPTH: usize = 50;

/// Wall-clock budget per file before an analyzer aborts.
pub const FILE_TIMEOUT: Duration = Duration::from_secs(5);

/// Tracks AST descent depth during a single analyzer pass and trips once
/// [`MAX_RECURSION_DEPTH`] is exceeded.
pub struct RecursionGuard {
    path: PathBuf,
    depth: usize,
    max_depth: usize,
}

impl RecursionGuard {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            depth: 0,
            max_depth: MAX_RECURSION_DEPTH,
        }
    }

    pub fn with_max_depth(path: impl Into<PathBuf>, max_depth: usize) -> Self {
        Self {
            path: path.into(),
            depth: 0,
            max_depth,
        }
    }

    /// Enter one level of recursion. Callers must call [`Self::exit`] on
    /// their way back out, typically via a scope guard.
    pub fn enter(&mut self) -> Result<(), ParserError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(ParserError::RecursionLimitExceeded {
                path: self.path.clone(),
                depth: self.depth,
            });
        }
        Ok(())
    }

    pub fn exit(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// Wall-clock deadline tracker for a single file's analysis.
pub struct Deadline {
    path: PathBuf,
    started_at: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_budget(path, FILE_TIMEOUT)
    }

    pub fn with_budget(path: impl Into<PathBuf>, budget: Duration) -> Self {
        Self {
            path: path.into(),
            started_at: Instant::now(),
            budget,
        }
    }

    /// Check whether the budget has been exceeded.
    pub fn check(&self) -> Result<(), ParserError> {
        if self.started_at.elapsed() > self.budget {
            return Err(ParserError::Timeout {
                path: self.path.clone(),
                timeout_ms: self.budget.as_millis() as u64,
            });
        }
        Ok(())
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// Run `f`, periodically checked against a deadline by the caller's own loop;
/// this variant simply measures elapsed time after the fact for callers that
/// cannot cheaply check mid-pass (e.g. a single tree-sitter `parse` call).
pub fn run_checked<T>(
    path: &Path,
    budget: Duration,
    f: impl FnOnce() -> T,
) -> Result<T, ParserError> {
    let start = Instant::now();
    let result = f();
    if start.elapsed() > budget {
        return Err(ParserError::Timeout {
            path: path.to_path_buf(),
            timeout_ms: budget.as_millis() as u64,
        });
    }
    Ok(result)
}
