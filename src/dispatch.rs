//! Request dispatch.
//!
//! [`RequestDispatcher`] turns a [`DispatchEvent`] into exactly one generate
//! request.  It appends the placeholder server turn, builds the request from
//! the user turn, the session context and the [`SessionConfig`], opens the
//! stream through a [`GenerateBackend`] and hands the body to a
//! [`StreamIngestor`].

use async_trait::async_trait;

use crate::config::SessionConfig;
use crate::error::Result;
use crate::ingest::{ChunkStream, IngestOutcome, StreamIngestor};
use crate::observability::SESSION_DISPATCHES;
use crate::session::{DispatchEvent, Session};
use crate::types::GenerateRequest;

/// Something that can answer a generate request with a chunked body.
///
/// The HTTP client implements this; tests substitute scripted bodies.
#[async_trait]
pub trait GenerateBackend: Send + Sync {
    /// Sends `request` and returns the response body once the server has
    /// accepted it.
    ///
    /// An error here means the stream never opened.
    async fn generate(&self, request: GenerateRequest) -> Result<ChunkStream>;
}

/// A dispatch whose placeholder exists but whose request has not been sent.
///
/// The session stays busy until this is handed to
/// [`RequestDispatcher::stream`], so every `prepare` must be followed by one
/// `stream`.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "the session stays busy until the prepared dispatch is streamed"]
pub struct PreparedDispatch {
    index: usize,
    request: GenerateRequest,
}

impl PreparedDispatch {
    /// Index of the placeholder server turn.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The request that will be sent.
    pub fn request(&self) -> &GenerateRequest {
        &self.request
    }
}

/// Sends one request per dispatch event and ingests its response.
#[derive(Debug, Clone)]
pub struct RequestDispatcher<B> {
    backend: B,
}

impl<B: GenerateBackend> RequestDispatcher<B> {
    /// Creates a dispatcher over `backend`.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// The backend requests are sent through.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Consumes `event`: appends the placeholder, raises `busy` and builds the
    /// request.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` if another stream is active or `event` is not the
    /// session's pending dispatch (it was superseded by a later user turn).  The session is unchanged in that case.
    pub fn prepare(
        &self,
        session: &mut Session,
        event: DispatchEvent,
        config: &SessionConfig,
    ) -> Result<PreparedDispatch> {
        let prompt = event.prompt().to_string();
        let index = session.begin_stream(event)?;
        SESSION_DISPATCHES.click();
        let request = GenerateRequest::new(&config.model, prompt, &config.system_prompt)
            .with_context(session.context())
            .with_temperature(config.temperature);
        Ok(PreparedDispatch { index, request })
    }

    /// Opens the stream for `prepared` and ingests it to a terminal state.
    ///
    /// A failure to open the stream ends the dispatch as `Failed`; either way
    /// the session is ready for the next turn when this returns.
    pub async fn stream(&self, session: &mut Session, prepared: PreparedDispatch) -> IngestOutcome {
        let PreparedDispatch { index, request } = prepared;
        let ingestor = StreamIngestor::new(index);
        match self.backend.generate(request).await {
            Ok(body) => ingestor.run(session, body).await,
            Err(err) => ingestor.fail(session, err),
        }
    }

    /// Prepares and streams in one step.
    pub async fn dispatch(
        &self,
        session: &mut Session,
        event: DispatchEvent,
        config: &SessionConfig,
    ) -> Result<IngestOutcome> {
        let prepared = self.prepare(session, event, config)?;
        Ok(self.stream(session, prepared).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::ingest::IngestState;
    use crate::testing::{ScriptedBackend, chunks};
    use crate::types::{Context, Role};

    fn config() -> SessionConfig {
        SessionConfig::new()
            .with_model("llama2")
            .with_system_prompt("You are terse.")
    }

    #[test]
    fn prepare_builds_request_from_turn_and_config() {
        let dispatcher = RequestDispatcher::new(ScriptedBackend::new());
        let mut session = Session::new();
        let event = session.append_user_turn("2+2?").unwrap();
        let prepared = dispatcher.prepare(&mut session, event, &config()).unwrap();

        assert_eq!(prepared.index(), 1);
        let body = serde_json::to_value(prepared.request()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "model": "llama2",
                "prompt": "2+2?",
                "system": "You are terse.",
                "template": "",
                "context": [],
                "options": {"temperature": 0.8},
            })
        );
        assert!(session.is_busy());
        assert_eq!(session.turn(1).unwrap().role(), Role::Server);
        assert!(session.turn(1).unwrap().is_streaming());
    }

    #[test]
    fn prepare_carries_current_context() {
        let dispatcher = RequestDispatcher::new(ScriptedBackend::new());
        let mut session = Session::new();
        session.set_context(Some(Context::new(vec![1, 2, 3])));
        let event = session.append_user_turn("and 3+3?").unwrap();
        let prepared = dispatcher.prepare(&mut session, event, &config()).unwrap();
        assert_eq!(prepared.request().context, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn busy_holds_from_prepare_until_stream_ends() {
        let backend = ScriptedBackend::new()
            .then_chunks(&[r#"{"response":"ok","done":true,"context":[4]}"#]);
        let dispatcher = RequestDispatcher::new(backend);
        let mut session = Session::new();
        let event = session.append_user_turn("hi").unwrap();
        let prepared = dispatcher.prepare(&mut session, event, &config()).unwrap();
        assert!(session.is_busy());
        assert_eq!(session.streaming_index(), Some(prepared.index()));

        let outcome = dispatcher.stream(&mut session, prepared).await;
        assert_eq!(outcome.state, IngestState::Completed);
        assert!(!session.is_busy());
        assert_eq!(session.streaming_index(), None);
    }

    #[tokio::test]
    async fn superseded_event_cannot_be_dispatched() {
        let backend = ScriptedBackend::new()
            .then_chunks(&[r#"{"response":"ok","done":true}"#]);
        let dispatcher = RequestDispatcher::new(backend);
        let mut session = Session::new();
        let stale = session.append_user_turn("first").unwrap();
        let fresh = session.append_user_turn("second").unwrap();

        let err = dispatcher.prepare(&mut session, stale, &config()).unwrap_err();
        assert!(err.is_invalid_state());
        assert!(!session.is_busy());
        assert_eq!(session.len(), 2);

        dispatcher
            .dispatch(&mut session, fresh, &config())
            .await
            .unwrap();
        assert_eq!(dispatcher.backend().requests()[0].prompt, "second");
        assert_eq!(session.turn(2).unwrap().text(), "ok");
    }

    #[tokio::test]
    async fn dispatch_streams_into_placeholder() {
        let backend = ScriptedBackend::new().then_chunks(&[
            r#"{"response":"4","done":false}"#,
            r#"{"response":"","done":true,"context":[1,2,3]}"#,
        ]);
        let dispatcher = RequestDispatcher::new(backend);
        let mut session = Session::new();
        let event = session.append_user_turn("2+2?").unwrap();

        let outcome = dispatcher
            .dispatch(&mut session, event, &config())
            .await
            .unwrap();
        assert_eq!(outcome.state, IngestState::Completed);
        assert_eq!(outcome.index, 1);
        assert_eq!(session.turn(1).unwrap().text(), "4");
        assert_eq!(session.context().unwrap().tokens(), &[1, 2, 3]);
        assert!(!session.is_busy());
        assert_eq!(dispatcher.backend().requests().len(), 1);
    }

    #[tokio::test]
    async fn refused_connection_fails_and_clears_busy() {
        let backend = ScriptedBackend::new().then_refuse(Error::connection("refused", None));
        let dispatcher = RequestDispatcher::new(backend);
        let mut session = Session::new();
        let event = session.append_user_turn("hello?").unwrap();

        let outcome = dispatcher
            .dispatch(&mut session, event, &config())
            .await
            .unwrap();
        assert!(outcome.is_failed());
        assert!(outcome.error.unwrap().is_connection());
        assert!(!session.is_busy());
        assert_eq!(session.len(), 2);
        assert_eq!(session.turn(1).unwrap().text(), "");
        assert!(!session.turn(1).unwrap().is_streaming());
    }

    #[tokio::test]
    async fn http_status_failure_is_transport_failure() {
        let backend = ScriptedBackend::new().then_refuse(Error::not_found(
            "model 'nope' not found",
            None,
            None,
        ));
        let dispatcher = RequestDispatcher::new(backend);
        let mut session = Session::new();
        let event = session.append_user_turn("hi").unwrap();
        let outcome = dispatcher
            .dispatch(&mut session, event, &config())
            .await
            .unwrap();
        assert!(outcome.is_failed());
        assert_eq!(outcome.error.unwrap().status_code(), Some(404));
    }

    #[tokio::test]
    async fn body_failure_midway_keeps_partial_text() {
        let mut body = chunks(&[r#"{"response":"par","done":false}"#]);
        body.push(Err(Error::stream_transport("reset by peer", None)));
        let dispatcher = RequestDispatcher::new(ScriptedBackend::new().then_body(body));
        let mut session = Session::new();
        let event = session.append_user_turn("hi").unwrap();
        let outcome = dispatcher
            .dispatch(&mut session, event, &config())
            .await
            .unwrap();
        assert!(outcome.is_failed());
        assert_eq!(session.turn(1).unwrap().text(), "par");
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn second_turn_sends_context_from_first() {
        let backend = ScriptedBackend::new()
            .then_chunks(&[r#"{"response":"4","done":true,"context":[1,2,3]}"#])
            .then_chunks(&[r#"{"response":"6","done":true,"context":[1,2,3,4]}"#]);
        let dispatcher = RequestDispatcher::new(backend);
        let mut session = Session::new();

        let event = session.append_user_turn("2+2?").unwrap();
        dispatcher
            .dispatch(&mut session, event, &config())
            .await
            .unwrap();
        let event = session.append_user_turn("3+3?").unwrap();
        dispatcher
            .dispatch(&mut session, event, &config())
            .await
            .unwrap();

        let requests = dispatcher.backend().requests();
        assert_eq!(requests[0].context, Vec::<i64>::new());
        assert_eq!(requests[1].context, vec![1, 2, 3]);
        assert_eq!(session.context().unwrap().tokens(), &[1, 2, 3, 4]);
        assert_eq!(session.len(), 4);
    }
}
