//! The session store.
//!
//! A [`Session`] owns the ordered turns of one conversation, the rolling
//! context returned by the backend, and the `busy` flag that serializes
//! dispatches.  It is the single source of truth: the dispatcher, the stream
//! ingestor and the feedback editor all mutate it through the methods below,
//! and every mutation is reported to subscribed observers before the method
//! returns.
//!
//! Turns are never removed or reordered.  A turn's index is its position and
//! never changes.

use std::fmt;

use crate::error::{Error, Result};
use crate::observability::SESSION_REJECTED_APPENDS;
use crate::observer::SessionObserver;
use crate::types::{Context, FeedbackMark, Role, Turn};

/// Token returned when a user turn is appended.
///
/// The dispatcher consumes it to start exactly one request for that turn.  It
/// cannot be cloned, so a turn can never be dispatched twice.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a user turn is not answered until its dispatch event is consumed"]
pub struct DispatchEvent {
    user_index: usize,
    prompt: String,
}

impl DispatchEvent {
    /// Index of the user turn to answer.
    pub fn user_index(&self) -> usize {
        self.user_index
    }

    /// Text of the user turn.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }
}

/// An ordered conversation with the backend.
pub struct Session {
    turns: Vec<Turn>,
    context: Option<Context>,
    busy: bool,
    pending: Option<usize>,
    streaming: Option<usize>,
    observers: Vec<Box<dyn SessionObserver>>,
}

impl Session {
    /// Creates an empty session: no turns, no context, not busy.
    pub fn new() -> Self {
        Self {
            turns: Vec::new(),
            context: None,
            busy: false,
            pending: None,
            streaming: None,
            observers: Vec::new(),
        }
    }

    /// Subscribes an observer to every subsequent mutation.
    pub fn subscribe(&mut self, observer: Box<dyn SessionObserver>) {
        self.observers.push(observer);
    }

    /// Appends a user turn and returns the event that dispatches it.
    ///
    /// A user turn whose event was never dispatched is superseded: it stays in
    /// the transcript unanswered and its event goes stale.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` and leaves the session untouched while a stream
    /// is in progress.
    pub fn append_user_turn(&mut self, text: impl Into<String>) -> Result<DispatchEvent> {
        if self.busy {
            SESSION_REJECTED_APPENDS.click();
            return Err(Error::invalid_state(
                "cannot append a user turn while a response is streaming",
            ));
        }
        let prompt = text.into();
        let user_index = self.append_turn(Role::User, prompt.clone());
        self.pending = Some(user_index);
        Ok(DispatchEvent { user_index, prompt })
    }

    /// Appends a turn without any sequencing checks.
    pub(crate) fn append_turn(&mut self, role: Role, text: impl Into<String>) -> usize {
        let turn = Turn::new(self.turns.len(), role, text);
        self.push_turn(turn)
    }

    fn push_turn(&mut self, turn: Turn) -> usize {
        let index = turn.index();
        self.turns.push(turn);
        let Self {
            turns, observers, ..
        } = self;
        for observer in observers.iter_mut() {
            observer.turn_appended(&turns[index]);
        }
        index
    }

    /// Consumes a dispatch event: appends the empty placeholder server turn,
    /// marks it streaming and raises `busy`.  Returns the placeholder's index.
    pub(crate) fn begin_stream(&mut self, event: DispatchEvent) -> Result<usize> {
        if self.busy {
            return Err(Error::invalid_state(
                "cannot dispatch while another response is streaming",
            ));
        }
        if self.pending != Some(event.user_index) {
            return Err(Error::invalid_state(format!(
                "user turn {} is not awaiting dispatch",
                event.user_index
            )));
        }
        self.pending = None;
        let mut placeholder = Turn::new(self.turns.len(), Role::Server, "");
        placeholder.set_streaming(true);
        let index = self.push_turn(placeholder);
        self.streaming = Some(index);
        self.set_busy(true);
        Ok(index)
    }

    /// Appends streamed text to the placeholder turn.
    pub(crate) fn append_turn_text(&mut self, index: usize, delta: &str) -> Result<()> {
        if self.streaming != Some(index) {
            return Err(Error::invalid_state(format!(
                "turn {index} is not streaming"
            )));
        }
        self.turns[index].push_text(delta);
        self.notify_updated(index);
        Ok(())
    }

    /// Takes the placeholder out of the streaming state and clears `busy`.
    pub(crate) fn finish_stream(&mut self, index: usize) {
        if self.streaming == Some(index) {
            self.streaming = None;
            self.turns[index].set_streaming(false);
            self.notify_updated(index);
        }
        self.set_busy(false);
    }

    /// Replaces a turn's text wholesale.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown index and `InvalidState` for the turn
    /// that is still streaming.
    pub fn mutate_turn_text(&mut self, index: usize, new_text: impl Into<String>) -> Result<()> {
        let turn = self.turn_or_not_found(index)?;
        if turn.is_streaming() {
            return Err(Error::invalid_state(format!(
                "turn {index} is still streaming"
            )));
        }
        self.turns[index].replace_text(new_text);
        self.notify_updated(index);
        Ok(())
    }

    /// Records feedback on a completed server turn.
    ///
    /// Re-applying the mark a turn already carries changes nothing and
    /// notifies nobody.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown index and `InvalidState` for user turns
    /// and for the turn that is still streaming.
    pub fn set_feedback(&mut self, index: usize, mark: FeedbackMark) -> Result<()> {
        let turn = self.turn_or_not_found(index)?;
        if !turn.is_feedback_eligible() {
            return Err(Error::invalid_state(format!(
                "turn {index} ({}{}) does not take feedback",
                turn.role(),
                if turn.is_streaming() { ", streaming" } else { "" },
            )));
        }
        if turn.feedback() == mark {
            return Ok(());
        }
        self.turns[index].set_feedback(mark);
        self.notify_updated(index);
        Ok(())
    }

    /// Replaces the rolling context.
    pub fn set_context(&mut self, context: Option<Context>) {
        self.context = context;
        let Self {
            context, observers, ..
        } = self;
        for observer in observers.iter_mut() {
            observer.context_replaced(context.as_ref());
        }
    }

    /// The most recent turn.
    pub fn last_turn(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// All turns, in order.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// The turn at `index`.
    pub fn turn(&self, index: usize) -> Option<&Turn> {
        self.turns.get(index)
    }

    /// The rolling context, absent until the first completed generation.
    pub fn context(&self) -> Option<&Context> {
        self.context.as_ref()
    }

    /// True from dispatch until the stream reaches a terminal state.
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Index of the user turn whose dispatch event is outstanding.
    pub fn pending_dispatch(&self) -> Option<usize> {
        self.pending
    }

    /// Index of the turn currently streaming.
    pub fn streaming_index(&self) -> Option<usize> {
        self.streaming
    }

    /// Number of turns.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// True when no turn has been appended.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub(crate) fn notify_chunk_rejected(&mut self, index: usize, error: &Error) {
        for observer in self.observers.iter_mut() {
            observer.chunk_rejected(index, error);
        }
    }

    pub(crate) fn notify_stream_failed(&mut self, index: usize, error: &Error) {
        for observer in self.observers.iter_mut() {
            observer.stream_failed(index, error);
        }
    }

    fn turn_or_not_found(&self, index: usize) -> Result<&Turn> {
        self.turns
            .get(index)
            .ok_or_else(|| Error::turn_not_found(index, self.turns.len()))
    }

    fn set_busy(&mut self, busy: bool) {
        if self.busy == busy {
            return;
        }
        self.busy = busy;
        for observer in self.observers.iter_mut() {
            observer.busy_changed(busy);
        }
    }

    fn notify_updated(&mut self, index: usize) {
        let Self {
            turns, observers, ..
        } = self;
        for observer in observers.iter_mut() {
            observer.turn_updated(&turns[index]);
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("turns", &self.turns)
            .field("context", &self.context)
            .field("busy", &self.busy)
            .field("pending", &self.pending)
            .field("streaming", &self.streaming)
            .field("observers", &self.observers.len())
            .finish()
    }
}
