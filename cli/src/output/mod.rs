//! Terminal and JSON output for the rescue commands.
//!
//! Results go to stdout, failures to stderr. `--quiet` silences everything
//! except errors; `--json` implies quiet so stdout carries one JSON object.

pub mod human;
pub mod json;
pub mod progress;
pub mod reporter;
pub mod styles;

use console::Term;
use owo_colors::OwoColorize as _;

pub use human::HumanRenderer;
pub use reporter::TerminalReporter;
pub use styles::Styles;

/// Where output goes and how it looks.
pub struct OutputContext {
    pub styles: Styles,
    /// stdout is a terminal, so spinners are allowed.
    pub is_tty: bool,
    /// Only errors are printed.
    pub quiet: bool,
}

impl OutputContext {
    /// Colors are used only on a terminal, and never with `no_color` or
    /// `NO_COLOR` set.
    #[must_use]
    pub fn new(no_color: bool, quiet: bool) -> Self {
        let is_tty = Term::stdout().is_term();
        let colors = !no_color && is_tty && std::env::var_os("NO_COLOR").is_none();
        Self {
            styles: Styles::for_terminal(colors),
            is_tty,
            quiet,
        }
    }

    /// Spinners need a terminal and a non-quiet run.
    #[must_use]
    pub fn show_progress(&self) -> bool {
        self.is_tty && !self.quiet
    }

    /// `✓ msg`
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "✓".style(self.styles.success));
        }
    }

    pub fn warn(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "⚠".style(self.styles.warning));
        }
    }

    /// Errors go to stderr and ignore `quiet`.
    pub fn error(&self, msg: &str) {
        eprintln!("  {} {msg}", "✗".style(self.styles.error));
    }

    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "ℹ".style(self.styles.info));
        }
    }

    pub fn header(&self, msg: &str) {
        if !self.quiet {
            println!("  {}", msg.style(self.styles.header));
        }
    }

    /// Aligned `key value` row with a dimmed key.
    pub fn kv(&self, key: &str, value: &str) {
        if !self.quiet {
            println!("  {:<16} {value}", key.style(self.styles.dim));
        }
    }
}
