//! Progress reporting and cooperative cancellation for long-running analyses.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Coarse progress milestone.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub message: String,
    /// Completion in `[0, 100]`.
    pub percent: f64,
}

pub(crate) trait ProgressReporter {
    fn report(&mut self, message: &str, percent: f64);
}

pub(crate) struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&mut self, _message: &str, _percent: f64) {}
}

pub(crate) struct FnProgress<F> {
    pub f: F,
}

impl<F> ProgressReporter for FnProgress<F>
where
    F: FnMut(&Progress),
{
    fn report(&mut self, message: &str, percent: f64) {
        (self.f)(&Progress {
            message: message.to_string(),
            percent: percent.clamp(0.0, 100.0),
        });
    }
}

/// Shared cancellation flag.
///
/// Clones observe the same flag, so one can be handed to another thread
/// (or a wall-clock watchdog) while the analysis polls the other.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
