use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::{FeedbackMark, Role};

/// One message in the conversation.
///
/// Fields are read through accessors; only the session store mutates a turn,
/// so any `&Turn` handed out is a complete snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    index: usize,
    role: Role,
    text: String,
    #[serde(with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,
    #[serde(default)]
    feedback: FeedbackMark,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    streaming: bool,
}

impl Turn {
    /// Create a new `Turn` stamped with the current time.
    pub(crate) fn new(index: usize, role: Role, text: impl Into<String>) -> Self {
        Self::with_timestamp(index, role, text, OffsetDateTime::now_utc())
    }

    pub(crate) fn with_timestamp(
        index: usize,
        role: Role,
        text: impl Into<String>,
        timestamp: OffsetDateTime,
    ) -> Self {
        Self {
            index,
            role,
            text: text.into(),
            timestamp,
            feedback: FeedbackMark::None,
            streaming: false,
        }
    }

    /// Position of this turn in the session.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Who wrote this turn.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Current text of the turn.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// When the turn was created.
    pub fn timestamp(&self) -> OffsetDateTime {
        self.timestamp
    }

    /// The feedback mark.  Always `None` for user turns.
    pub fn feedback(&self) -> FeedbackMark {
        self.feedback
    }

    /// True while a stream is still appending to this turn.
    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// True for server turns whose stream has finished.
    pub fn is_feedback_eligible(&self) -> bool {
        self.role == Role::Server && !self.streaming
    }

    pub(crate) fn replace_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub(crate) fn push_text(&mut self, delta: &str) {
        self.text.push_str(delta);
    }

    pub(crate) fn set_feedback(&mut self, mark: FeedbackMark) {
        self.feedback = mark;
    }

    pub(crate) fn set_streaming(&mut self, streaming: bool) {
        self.streaming = streaming;
    }
}
