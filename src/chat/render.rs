//! Output rendering for the chat application.
//!
//! This module provides a trait-based rendering abstraction and a plain-text
//! implementation that doubles as a [`SessionObserver`], printing a response
//! as it streams in.

use std::io::{self, Write};

use crate::error::Error;
use crate::observer::SessionObserver;
use crate::types::{Role, Turn};

/// ANSI escape code for dim text (used for diagnostics).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// Trait for rendering chat output.
pub trait Renderer: Send {
    /// Print a chunk of response text.
    ///
    /// This is called incrementally as fragments are streamed from the backend.
    fn print_text(&mut self, text: &str);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Print a non-fatal diagnostic.
    fn print_warning(&mut self, warning: &str);

    /// Called when a response is complete.
    fn finish_response(&mut self);
}

/// Plain text renderer with optional ANSI styling.
///
/// By default text goes to stdout and errors to stderr.
pub struct PlainTextRenderer {
    out: Box<dyn Write + Send>,
    err: Box<dyn Write + Send>,
    use_color: bool,
    streaming: Option<(usize, usize)>,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self::with_writers(Box::new(io::stdout()), Box::new(io::stderr()), use_color)
    }

    /// Creates a renderer over arbitrary writers.
    pub fn with_writers(
        out: Box<dyn Write + Send>,
        err: Box<dyn Write + Send>,
        use_color: bool,
    ) -> Self {
        Self {
            out,
            err,
            use_color,
            streaming: None,
        }
    }

    /// Whether ANSI styling is emitted.
    pub fn use_color(&self) -> bool {
        self.use_color
    }

    fn flush(&mut self) {
        let _ = self.out.flush();
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn print_text(&mut self, text: &str) {
        let _ = write!(self.out, "{text}");
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        let _ = if self.use_color {
            writeln!(self.err, "\n{ANSI_RED}Error: {error}{ANSI_RESET}")
        } else {
            writeln!(self.err, "\nError: {error}")
        };
        let _ = self.err.flush();
    }

    fn print_info(&mut self, info: &str) {
        let _ = writeln!(self.out, "{info}");
        self.flush();
    }

    fn print_warning(&mut self, warning: &str) {
        let _ = if self.use_color {
            writeln!(self.err, "{ANSI_DIM}[{warning}]{ANSI_RESET}")
        } else {
            writeln!(self.err, "[{warning}]")
        };
        let _ = self.err.flush();
    }

    fn finish_response(&mut self) {
        let _ = writeln!(self.out);
        self.flush();
    }
}

impl SessionObserver for PlainTextRenderer {
    fn turn_appended(&mut self, turn: &Turn) {
        if turn.role() == Role::Server && turn.is_streaming() {
            self.streaming = Some((turn.index(), 0));
        }
    }

    fn turn_updated(&mut self, turn: &Turn) {
        let Some((index, printed)) = self.streaming else {
            return;
        };
        if index != turn.index() {
            return;
        }
        if let Some(delta) = turn.text().get(printed..)
            && !delta.is_empty()
        {
            self.print_text(delta);
            self.streaming = Some((index, turn.text().len()));
        }
        if !turn.is_streaming() {
            self.streaming = None;
            self.finish_response();
        }
    }

    fn chunk_rejected(&mut self, _: usize, error: &Error) {
        self.print_warning(&format!("skipped chunk: {error}"));
    }

    fn stream_failed(&mut self, _: usize, error: &Error) {
        self.print_error(&error.to_string());
    }
}
