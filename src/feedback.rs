//! Feedback and correction of server turns.
//!
//! [`FeedbackEditor`] is a two-state machine, `Viewing` and `Editing`.  Marking
//! a completed server turn down opens an edit of that turn, seeded with its
//! current text; the draft is later committed with [`FeedbackEditor::save`] or
//! thrown away with [`FeedbackEditor::cancel`].  At most one edit exists at a
//! time.

use crate::error::{Error, Result};
use crate::observability::{EDITS_DISCARDED, EDITS_SAVED, FEEDBACK_DOWN, FEEDBACK_UP};
use crate::session::Session;
use crate::types::FeedbackMark;

/// An in-progress correction of one server turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSession {
    target_index: usize,
    draft_text: String,
}

impl EditSession {
    /// Index of the turn being corrected.
    pub fn target_index(&self) -> usize {
        self.target_index
    }

    /// The draft replacement text.
    pub fn draft_text(&self) -> &str {
        &self.draft_text
    }
}

/// Whether an edit is open.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EditorMode {
    /// No edit open.
    Viewing,
    /// An edit is open.
    Editing,
}

/// Result of [`FeedbackEditor::mark_feedback`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackOutcome {
    /// The mark was recorded and the editor's mode did not change.
    Recorded,
    /// The mark was recorded and an edit of the marked turn was opened.
    ///
    /// `discarded` holds the edit of another turn that was open before and has
    /// been thrown away to make room.
    EditStarted {
        /// The previous edit, if one was open.
        discarded: Option<EditSession>,
    },
}

impl FeedbackOutcome {
    /// The edit that was implicitly cancelled, if any.
    pub fn discarded(&self) -> Option<&EditSession> {
        match self {
            FeedbackOutcome::Recorded => None,
            FeedbackOutcome::EditStarted { discarded } => discarded.as_ref(),
        }
    }
}

/// Records feedback on server turns and manages their correction.
#[derive(Debug, Default)]
pub struct FeedbackEditor {
    edit: Option<EditSession>,
}

impl FeedbackEditor {
    /// Creates an editor in `Viewing`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `mark` on the turn at `index`.
    ///
    /// Marking a turn down also opens an edit of it.  If a different turn was
    /// being edited, that edit is discarded and returned in the outcome.  If
    /// the same turn was already being edited, its draft is kept.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown index and `InvalidState` for user
    /// turns and the turn still streaming.  Neither the session nor the editor
    /// changes on error.
    pub fn mark_feedback(
        &mut self,
        session: &mut Session,
        index: usize,
        mark: FeedbackMark,
    ) -> Result<FeedbackOutcome> {
        session.set_feedback(index, mark)?;
        match mark {
            FeedbackMark::Up => FEEDBACK_UP.click(),
            FeedbackMark::Down => FEEDBACK_DOWN.click(),
            FeedbackMark::None => {}
        }
        if mark != FeedbackMark::Down {
            return Ok(FeedbackOutcome::Recorded);
        }
        if self.edit.as_ref().map(EditSession::target_index) == Some(index) {
            return Ok(FeedbackOutcome::Recorded);
        }
        let draft_text = session
            .turn(index)
            .map(|turn| turn.text().to_string())
            .ok_or_else(|| Error::turn_not_found(index, session.len()))?;
        let discarded = self.edit.replace(EditSession {
            target_index: index,
            draft_text,
        });
        if discarded.is_some() {
            EDITS_DISCARDED.click();
        }
        Ok(FeedbackOutcome::EditStarted { discarded })
    }

    /// Replaces the draft text of the open edit.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` when no edit is open.
    pub fn update_draft(&mut self, text: impl Into<String>) -> Result<()> {
        match self.edit.as_mut() {
            Some(edit) => {
                edit.draft_text = text.into();
                Ok(())
            }
            None => Err(Error::invalid_state("no edit is open")),
        }
    }

    /// The draft text of the open edit.
    pub fn draft(&self) -> Option<&str> {
        self.edit.as_ref().map(EditSession::draft_text)
    }

    /// Commits the draft as the target turn's text and returns to `Viewing`.
    ///
    /// Returns the index of the corrected turn, or `None` when no edit was
    /// open.
    ///
    /// # Errors
    ///
    /// Propagates the session's refusal to change the turn; the edit stays
    /// open in that case.
    pub fn save(&mut self, session: &mut Session) -> Result<Option<usize>> {
        let Some(edit) = self.edit.take() else {
            return Ok(None);
        };
        let index = edit.target_index;
        if let Err(err) = session.mutate_turn_text(index, edit.draft_text.clone()) {
            self.edit = Some(edit);
            return Err(err);
        }
        EDITS_SAVED.click();
        Ok(Some(index))
    }

    /// Discards the open edit and returns it.  Does nothing in `Viewing`.
    pub fn cancel(&mut self) -> Option<EditSession> {
        let edit = self.edit.take();
        if edit.is_some() {
            EDITS_DISCARDED.click();
        }
        edit
    }

    /// The current mode.
    pub fn mode(&self) -> EditorMode {
        if self.edit.is_some() {
            EditorMode::Editing
        } else {
            EditorMode::Viewing
        }
    }

    /// True while an edit is open.
    pub fn is_editing(&self) -> bool {
        self.edit.is_some()
    }

    /// The open edit.
    pub fn edit_session(&self) -> Option<&EditSession> {
        self.edit.as_ref()
    }
}
