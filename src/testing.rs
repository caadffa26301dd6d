//! Test doubles shared by the unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures::stream;

use crate::dispatch::GenerateBackend;
use crate::error::{Error, Result};
use crate::ingest::ChunkStream;
use crate::observer::SessionObserver;
use crate::types::{Context, FeedbackMark, GenerateRequest, Turn};

/// One observer callback, flattened for comparison.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Observed {
    Appended(usize, String),
    Updated(usize, String, bool, FeedbackMark),
    Context(Option<Vec<i64>>),
    Busy(bool),
    ChunkRejected(usize),
    StreamFailed(usize),
}

/// Observer that records every callback into a shared log.
pub(crate) struct RecordingObserver {
    log: Arc<Mutex<Vec<Observed>>>,
}

impl RecordingObserver {
    pub(crate) fn new() -> (Self, Arc<Mutex<Vec<Observed>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        (Self { log: log.clone() }, log)
    }

    fn record(&self, observed: Observed) {
        self.log.lock().unwrap().push(observed);
    }
}

impl SessionObserver for RecordingObserver {
    fn turn_appended(&mut self, turn: &Turn) {
        self.record(Observed::Appended(turn.index(), turn.text().to_string()));
    }

    fn turn_updated(&mut self, turn: &Turn) {
        self.record(Observed::Updated(
            turn.index(),
            turn.text().to_string(),
            turn.is_streaming(),
            turn.feedback(),
        ));
    }

    fn context_replaced(&mut self, context: Option<&Context>) {
        self.record(Observed::Context(context.map(|c| c.tokens().to_vec())));
    }

    fn busy_changed(&mut self, busy: bool) {
        self.record(Observed::Busy(busy));
    }

    fn chunk_rejected(&mut self, index: usize, _: &Error) {
        self.record(Observed::ChunkRejected(index));
    }

    fn stream_failed(&mut self, index: usize, _: &Error) {
        self.record(Observed::StreamFailed(index));
    }
}

/// Turns string chunks into a body stream item list.
pub(crate) fn chunks(raw: &[&str]) -> Vec<Result<Bytes>> {
    raw.iter()
        .map(|chunk| Ok(Bytes::from(chunk.to_string())))
        .collect()
}

enum Script {
    Body(Vec<Result<Bytes>>),
    Refuse(Error),
}

/// Backend that replays scripted responses, one per request, and records the
/// requests it was sent.
pub(crate) struct ScriptedBackend {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl ScriptedBackend {
    pub(crate) fn new() -> Self {
        Self {
            scripts: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn then_chunks(self, raw: &[&str]) -> Self {
        self.then_body(chunks(raw))
    }

    pub(crate) fn then_body(self, body: Vec<Result<Bytes>>) -> Self {
        self.scripts.lock().unwrap().push_back(Script::Body(body));
        self
    }

    pub(crate) fn then_refuse(self, error: Error) -> Self {
        self.scripts.lock().unwrap().push_back(Script::Refuse(error));
        self
    }

    pub(crate) fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl GenerateBackend for ScriptedBackend {
    async fn generate(&self, request: GenerateRequest) -> Result<ChunkStream> {
        self.requests.lock().unwrap().push(request);
        let script = self.scripts.lock().unwrap().pop_front();
        match script {
            Some(Script::Body(body)) => Ok(Box::pin(stream::iter(body))),
            Some(Script::Refuse(error)) => Err(error),
            None => Ok(Box::pin(stream::empty())),
        }
    }
}
