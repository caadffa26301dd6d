//! Observation hooks for session mutations.
//!
//! This module provides the [`SessionObserver`] trait.  Every mutation of a
//! [`Session`] is reported synchronously to each subscribed observer, after the
//! mutation has completed.  Rendering layers and test harnesses use it to
//! follow a conversation as it streams; diagnostics for malformed chunks and
//! failed streams are delivered the same way.
//!
//! [`Session`]: crate::Session

use crate::{Context, Error, Turn};

/// A trait for following session mutations.
///
/// All methods default to doing nothing, so an observer implements only what it
/// cares about.
///
/// # Example
///
/// ```rust
/// use palaver::{Session, SessionObserver, Turn};
///
/// struct Printer;
///
/// impl SessionObserver for Printer {
///     fn turn_updated(&mut self, turn: &Turn) {
///         println!("[{}] {}", turn.index(), turn.text());
///     }
/// }
///
/// let mut session = Session::new();
/// session.subscribe(Box::new(Printer));
/// ```
pub trait SessionObserver: Send {
    /// A turn was appended.
    fn turn_appended(&mut self, turn: &Turn) {
        _ = turn;
    }

    /// A turn's text, feedback or streaming state changed.
    fn turn_updated(&mut self, turn: &Turn) {
        _ = turn;
    }

    /// The rolling context was replaced.  `None` means the backend sent none.
    fn context_replaced(&mut self, context: Option<&Context>) {
        _ = context;
    }

    /// The busy flag changed.
    fn busy_changed(&mut self, busy: bool) {
        _ = busy;
    }

    /// A chunk of the stream feeding `index` was dropped.  The stream goes on.
    fn chunk_rejected(&mut self, index: usize, error: &Error) {
        _ = index;
        _ = error;
    }

    /// The stream feeding `index` failed.  The turn keeps its partial text.
    fn stream_failed(&mut self, index: usize, error: &Error) {
        _ = index;
        _ = error;
    }
}
