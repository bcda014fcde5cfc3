//! `TerminalReporter`: Presentation-layer implementation of `ProgressReporter`.
//!
//! Workflow services announce each step through the port; this type turns
//! those events into spinners on a TTY and plain lines elsewhere.

use std::cell::RefCell;

use indicatif::ProgressBar;
use owo_colors::OwoColorize as _;

use crate::application::ports::ProgressReporter;
use crate::output::{OutputContext, progress};

/// Terminal progress reporter that wraps an `OutputContext`.
///
/// - `step()` starts a spinner, or prints `"  → {message}"` without a TTY
/// - `success()` settles the spinner with `✓`
/// - `warn()` settles the spinner with `⚠`
///
/// Everything is suppressed when `ctx.quiet`.
pub struct TerminalReporter<'a> {
    ctx: &'a OutputContext,
    active: RefCell<Option<ProgressBar>>,
}

impl<'a> TerminalReporter<'a> {
    /// Create a new `TerminalReporter` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self {
            ctx,
            active: RefCell::new(None),
        }
    }

    /// Mark a still-running spinner as failed. Called when a workflow
    /// returns an error mid-step.
    pub fn abort(&self, message: &str) {
        if let Some(pb) = self.active.borrow_mut().take() {
            progress::finish_error(&pb, message);
        }
    }
}

impl ProgressReporter for TerminalReporter<'_> {
    fn step(&self, message: &str) {
        if self.ctx.quiet {
            return;
        }
        if self.ctx.show_progress() {
            let previous = self.active.replace(Some(progress::spinner(message)));
            if let Some(pb) = previous {
                pb.finish_and_clear();
            }
        } else {
            println!("  {} {message}", "→".style(self.ctx.styles.info));
        }
    }

    fn success(&self, message: &str) {
        if self.ctx.quiet {
            return;
        }
        match self.active.borrow_mut().take() {
            Some(pb) => progress::finish_ok(&pb, message),
            None => println!("  {} {message}", "✓".style(self.ctx.styles.success)),
        }
    }

    fn warn(&self, message: &str) {
        if self.ctx.quiet {
            return;
        }
        match self.active.borrow_mut().take() {
            Some(pb) => progress::finish_warn(&pb, message),
            None => println!("  {} {message}", "⚠".style(self.ctx.styles.warning)),
        }
    }
}
