//! A session together with everything needed to drive it.
//!
//! [`Conversation`] owns a [`Session`], a [`FeedbackEditor`], a
//! [`RequestDispatcher`] and the [`SessionConfig`] requests are built from.
//! It is the entry point the chat front end uses: one call per user line, one
//! call per feedback action.

use crate::config::SessionConfig;
use crate::dispatch::{GenerateBackend, RequestDispatcher};
use crate::error::{Error, Result};
use crate::feedback::{EditSession, FeedbackEditor, FeedbackOutcome};
use crate::ingest::IngestOutcome;
use crate::observer::SessionObserver;
use crate::session::Session;
use crate::types::{FeedbackMark, GenerationStats};

/// Running totals for a conversation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationStats {
    /// Number of turns in the session.
    pub turns: usize,
    /// Model requests are sent to.
    pub model: String,
    /// System prompt requests are sent with.
    pub system_prompt: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Length of the rolling context, 0 when there is none.
    pub context_len: usize,
    /// Requests dispatched.
    pub requests: u64,
    /// Requests whose stream failed.
    pub failed_requests: u64,
    /// Chunks dropped as malformed or reported as errors in-band.
    pub chunk_errors: u64,
    /// Tokens generated across all requests, as reported by the backend.
    pub eval_tokens: u64,
    /// Statistics of the most recent completed generation.
    pub last: Option<GenerationStats>,
}

impl ConversationStats {
    /// Mean generation speed of the last response, in tokens per second.
    pub fn last_tokens_per_second(&self) -> Option<f64> {
        self.last.as_ref().and_then(GenerationStats::tokens_per_second)
    }
}

#[derive(Debug, Default)]
struct Totals {
    requests: u64,
    failed_requests: u64,
    chunk_errors: u64,
    eval_tokens: u64,
    last: Option<GenerationStats>,
}

/// A conversation with one backend.
#[derive(Debug)]
pub struct Conversation<B> {
    session: Session,
    editor: FeedbackEditor,
    dispatcher: RequestDispatcher<B>,
    config: SessionConfig,
    totals: Totals,
}

impl<B: GenerateBackend> Conversation<B> {
    /// Creates an empty conversation.
    pub fn new(backend: B, config: SessionConfig) -> Self {
        Self {
            session: Session::new(),
            editor: FeedbackEditor::new(),
            dispatcher: RequestDispatcher::new(backend),
            config,
            totals: Totals::default(),
        }
    }

    /// Subscribes an observer to the session.
    pub fn subscribe(&mut self, observer: Box<dyn SessionObserver>) {
        self.session.subscribe(observer);
    }

    /// The session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The feedback editor.
    pub fn editor(&self) -> &FeedbackEditor {
        &self.editor
    }

    /// The backend.
    pub fn backend(&self) -> &B {
        self.dispatcher.backend()
    }

    /// The request configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Chooses the model for subsequent requests.
    pub fn set_model(&mut self, model: impl Into<String>) {
        self.config.model = model.into();
    }

    /// Sets the system prompt for subsequent requests.
    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        self.config.system_prompt = prompt.into();
    }

    /// Sets the sampling temperature for subsequent requests.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for negative or non-finite values.
    pub fn set_temperature(&mut self, temperature: f64) -> Result<()> {
        if !temperature.is_finite() || temperature < 0.0 {
            return Err(Error::validation(
                format!("temperature must be a non-negative number, got {temperature}"),
                Some("temperature".to_string()),
            ));
        }
        self.config.temperature = temperature;
        Ok(())
    }

    /// Appends `text` as a user turn, dispatches it and streams the answer.
    ///
    /// A transport failure is not an error here: it ends the answer early and
    /// is reported through the outcome and the session's observers.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if no model has been chosen and `InvalidState` if a
    /// response is still streaming.  The session is unchanged in both cases.
    pub async fn send(&mut self, text: impl Into<String>) -> Result<IngestOutcome> {
        if !self.config.has_model() {
            return Err(Error::validation(
                "choose a model before sending",
                Some("model".to_string()),
            ));
        }
        let event = self.session.append_user_turn(text)?;
        let outcome = self
            .dispatcher
            .dispatch(&mut self.session, event, &self.config)
            .await?;
        self.record(&outcome);
        Ok(outcome)
    }

    /// Records feedback on a server turn.  See [`FeedbackEditor::mark_feedback`].
    pub fn mark_feedback(&mut self, index: usize, mark: FeedbackMark) -> Result<FeedbackOutcome> {
        self.editor.mark_feedback(&mut self.session, index, mark)
    }

    /// Replaces the draft of the open edit.
    pub fn update_draft(&mut self, text: impl Into<String>) -> Result<()> {
        self.editor.update_draft(text)
    }

    /// Commits the open edit.  See [`FeedbackEditor::save`].
    pub fn save_edit(&mut self) -> Result<Option<usize>> {
        self.editor.save(&mut self.session)
    }

    /// Discards the open edit.
    pub fn cancel_edit(&mut self) -> Option<EditSession> {
        self.editor.cancel()
    }

    /// Running totals.
    pub fn stats(&self) -> ConversationStats {
        ConversationStats {
            turns: self.session.len(),
            model: self.config.model.clone(),
            system_prompt: self.config.system_prompt.clone(),
            temperature: self.config.temperature,
            context_len: self.session.context().map_or(0, |c| c.len()),
            requests: self.totals.requests,
            failed_requests: self.totals.failed_requests,
            chunk_errors: self.totals.chunk_errors,
            eval_tokens: self.totals.eval_tokens,
            last: self.totals.last.clone(),
        }
    }

    fn record(&mut self, outcome: &IngestOutcome) {
        self.totals.requests += 1;
        if outcome.is_failed() {
            self.totals.failed_requests += 1;
        }
        self.totals.chunk_errors += outcome.diagnostics.len() as u64;
        if let Some(stats) = &outcome.stats {
            self.totals.eval_tokens += stats.eval_count.unwrap_or(0);
            self.totals.last = Some(stats.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::IngestState;
    use crate::testing::{Observed, RecordingObserver, ScriptedBackend};
    use crate::types::Role;

    fn terse(backend: ScriptedBackend) -> Conversation<ScriptedBackend> {
        Conversation::new(
            backend,
            SessionConfig::new()
                .with_model("llama2")
                .with_system_prompt("You are terse."),
        )
    }

    #[tokio::test]
    async fn terse_arithmetic_end_to_end() {
        let backend = ScriptedBackend::new().then_chunks(&[
            r#"{"response":"4","done":false}"#,
            r#"{"response":"","done":true,"context":[1,2,3]}"#,
        ]);
        let mut conversation = terse(backend);
        assert!(!conversation.session().is_busy());

        let outcome = conversation.send("2+2?").await.unwrap();
        assert_eq!(outcome.state, IngestState::Completed);

        let session = conversation.session();
        assert_eq!(session.len(), 2);
        assert_eq!(session.turn(0).unwrap().role(), Role::User);
        assert_eq!(session.turn(0).unwrap().text(), "2+2?");
        assert_eq!(session.turn(1).unwrap().role(), Role::Server);
        assert_eq!(session.turn(1).unwrap().text(), "4");
        assert_eq!(session.context().unwrap().tokens(), &[1, 2, 3]);
        assert!(!session.is_busy());

        let requests = conversation.backend().requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].system, "You are terse.");
        assert_eq!(requests[0].prompt, "2+2?");
        assert_eq!(requests[0].options.temperature, 0.8);
    }

    #[tokio::test]
    async fn busy_spans_exactly_the_stream() {
        let backend =
            ScriptedBackend::new().then_chunks(&[r#"{"response":"ok","done":true,"context":[1]}"#]);
        let mut conversation = terse(backend);
        let (observer, log) = RecordingObserver::new();
        conversation.subscribe(Box::new(observer));

        assert!(!conversation.session().is_busy());
        conversation.send("hi").await.unwrap();
        assert!(!conversation.session().is_busy());

        let busy: Vec<_> = log
            .lock()
            .unwrap()
            .iter()
            .filter_map(|o| match o {
                Observed::Busy(b) => Some(*b),
                _ => None,
            })
            .collect();
        assert_eq!(busy, vec![true, false]);
    }

    #[tokio::test]
    async fn send_without_model_leaves_session_untouched() {
        let mut conversation = Conversation::new(ScriptedBackend::new(), SessionConfig::new());
        let err = conversation.send("hi").await.unwrap_err();
        assert!(err.is_validation());
        assert!(conversation.session().is_empty());
        assert!(conversation.backend().requests().is_empty());

        conversation.set_model("llama2");
        conversation.send("hi").await.unwrap();
        assert_eq!(conversation.session().len(), 2);
    }

    #[tokio::test]
    async fn failed_stream_is_counted_and_session_recovers() {
        let backend = ScriptedBackend::new()
            .then_refuse(Error::connection("connection refused", None))
            .then_chunks(&[r#"{"response":"back","done":true,"context":[4]}"#]);
        let mut conversation = terse(backend);

        let outcome = conversation.send("anyone?").await.unwrap();
        assert!(outcome.is_failed());
        assert!(!conversation.session().is_busy());

        let outcome = conversation.send("again?").await.unwrap();
        assert_eq!(outcome.state, IngestState::Completed);
        assert_eq!(conversation.session().turn(3).unwrap().text(), "back");

        let stats = conversation.stats();
        assert_eq!(stats.requests, 2);
        assert_eq!(stats.failed_requests, 1);
        assert_eq!(stats.turns, 4);
        assert_eq!(stats.context_len, 1);
    }

    #[tokio::test]
    async fn stats_accumulate_generation_counts() {
        let backend = ScriptedBackend::new()
            .then_chunks(&[
                "garbage",
                r#"{"response":"a","done":true,"context":[1],"eval_count":4,"eval_duration":2000000000}"#,
            ])
            .then_chunks(&[r#"{"response":"b","done":true,"context":[1,2],"eval_count":6,"eval_duration":1000000000}"#]);
        let mut conversation = terse(backend);
        conversation.send("one").await.unwrap();
        conversation.send("two").await.unwrap();

        let stats = conversation.stats();
        assert_eq!(stats.chunk_errors, 1);
        assert_eq!(stats.eval_tokens, 10);
        assert_eq!(stats.last_tokens_per_second(), Some(6.0));
        assert_eq!(stats.model, "llama2");
    }

    #[tokio::test]
    async fn feedback_round_trip_through_conversation() {
        let backend = ScriptedBackend::new()
            .then_chunks(&[r#"{"response":"5","done":true,"context":[1]}"#]);
        let mut conversation = terse(backend);
        conversation.send("2+2?").await.unwrap();

        conversation.mark_feedback(1, FeedbackMark::Down).unwrap();
        conversation.update_draft("4").unwrap();
        assert_eq!(conversation.save_edit().unwrap(), Some(1));
        assert_eq!(conversation.session().turn(1).unwrap().text(), "4");
        assert_eq!(
            conversation.session().turn(1).unwrap().feedback(),
            FeedbackMark::Down
        );
        assert!(!conversation.editor().is_editing());
        assert!(conversation.cancel_edit().is_none());
    }

    #[test]
    fn temperature_is_validated() {
        let mut conversation = terse(ScriptedBackend::new());
        assert!(conversation.set_temperature(-0.1).unwrap_err().is_validation());
        assert!(conversation.set_temperature(f64::NAN).is_err());
        conversation.set_temperature(1.2).unwrap();
        assert_eq!(conversation.config().temperature, 1.2);
    }
}
