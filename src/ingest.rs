//! Streamed response ingestion.
//!
//! The backend answers a generate request with a chunked body in which every
//! chunk is one complete JSON object.  [`StreamIngestor`] reads those chunks in
//! order and folds them into the placeholder turn of a [`Session`]:
//!
//! - a non-empty `response` fragment is appended to the turn's text;
//! - a chunk with `done: true` replaces the session context and ends the read;
//! - a chunk that is not valid JSON is recorded as a diagnostic and skipped;
//! - a failure of the body itself ends the stream as `Failed`.
//!
//! Chunk boundaries are taken as record boundaries.  Nothing is buffered
//! across chunks.

use std::pin::Pin;
use std::time::Instant;

use bytes::Bytes;
use futures::{Stream, StreamExt};

use crate::error::{Error, Result};
use crate::observability::{
    STREAM_BYTES, STREAM_CHUNK_ERRORS, STREAM_CHUNKS, STREAM_DURATION, STREAM_TRANSPORT_ERRORS,
    STREAM_TTFB,
};
use crate::session::Session;
use crate::types::{Context, GenerateChunk, GenerationStats};

/// A response body, as a stream of raw chunks.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Where an ingestor is in its lifecycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IngestState {
    /// Created, no chunk read yet.
    Idle,
    /// Reading chunks.
    Streaming,
    /// Saw `done: true`, or the body ended cleanly.
    Completed,
    /// The body failed.
    Failed,
}

impl IngestState {
    /// True for `Completed` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, IngestState::Completed | IngestState::Failed)
    }
}

/// What happened to one stream.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    /// Index of the server turn the stream fed.
    pub index: usize,
    /// Terminal state.
    pub state: IngestState,
    /// Non-fatal problems with individual chunks, in arrival order.
    pub diagnostics: Vec<Error>,
    /// Statistics from the final chunk, when the backend sent any.
    pub stats: Option<GenerationStats>,
    /// True if a `done: true` chunk was seen.
    pub saw_done: bool,
    /// Number of chunks read.
    pub chunks: usize,
    /// The transport error that ended the stream, for `Failed`.
    pub error: Option<Error>,
}

impl IngestOutcome {
    /// True if the stream ended because the transport failed.
    pub fn is_failed(&self) -> bool {
        self.state == IngestState::Failed
    }
}

/// Decodes one chunk into a record.
///
/// Invalid UTF-8 is replaced rather than rejected; only JSON errors fail.
pub fn decode_chunk(bytes: &[u8]) -> Result<GenerateChunk> {
    let text = String::from_utf8_lossy(bytes);
    serde_json::from_str::<GenerateChunk>(&text).map_err(|e| {
        Error::chunk_decode(
            format!("chunk is not a generate record: {e}"),
            text.to_string(),
            Some(Box::new(e)),
        )
    })
}

/// Folds a response body into the placeholder turn of a session.
#[derive(Debug)]
pub struct StreamIngestor {
    index: usize,
    state: IngestState,
    diagnostics: Vec<Error>,
    stats: Option<GenerationStats>,
    saw_done: bool,
    chunks: usize,
}

impl StreamIngestor {
    /// Creates an idle ingestor for the placeholder turn at `index`.
    pub fn new(index: usize) -> Self {
        Self {
            index,
            state: IngestState::Idle,
            diagnostics: Vec::new(),
            stats: None,
            saw_done: false,
            chunks: 0,
        }
    }

    /// Index of the turn this ingestor feeds.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Current state.
    pub fn state(&self) -> IngestState {
        self.state
    }

    /// Reads `body` to a terminal state.
    ///
    /// Awaiting the next chunk is the only suspension point.  On return the
    /// placeholder is no longer streaming and the session is not busy,
    /// whichever way the stream ended.
    pub async fn run<S>(mut self, session: &mut Session, mut body: S) -> IngestOutcome
    where
        S: Stream<Item = Result<Bytes>> + Unpin,
    {
        self.state = IngestState::Streaming;
        let started = Instant::now();
        let mut failure = None;
        while let Some(item) = body.next().await {
            match item {
                Ok(bytes) => {
                    if self.chunks == 0 {
                        STREAM_TTFB.add(started.elapsed().as_secs_f64());
                    }
                    if self.ingest_chunk(session, &bytes) {
                        break;
                    }
                }
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }
        STREAM_DURATION.add(started.elapsed().as_secs_f64());
        match failure {
            Some(err) => self.fail(session, err),
            None => self.complete(session),
        }
    }

    /// Ends the stream as `Failed` without reading anything further.
    ///
    /// The placeholder keeps whatever text it had accumulated.
    pub fn fail(mut self, session: &mut Session, error: Error) -> IngestOutcome {
        let error = if error.is_transport() {
            error
        } else {
            Error::stream_transport(error.to_string(), Some(Box::new(error)))
        };
        STREAM_TRANSPORT_ERRORS.click();
        self.state = IngestState::Failed;
        session.notify_stream_failed(self.index, &error);
        session.finish_stream(self.index);
        self.into_outcome(Some(error))
    }

    fn complete(mut self, session: &mut Session) -> IngestOutcome {
        self.state = IngestState::Completed;
        session.finish_stream(self.index);
        self.into_outcome(None)
    }

    /// Applies one chunk.  Returns true once the final chunk has been seen.
    fn ingest_chunk(&mut self, session: &mut Session, bytes: &[u8]) -> bool {
        self.chunks += 1;
        STREAM_CHUNKS.click();
        STREAM_BYTES.count(bytes.len() as u64);
        let chunk = match decode_chunk(bytes) {
            Ok(chunk) => chunk,
            Err(err) => {
                self.reject(session, err);
                return false;
            }
        };
        if let Some(message) = chunk.error.as_deref() {
            let err = Error::chunk_decode(
                format!("backend reported an error: {message}"),
                String::from_utf8_lossy(bytes),
                None,
            );
            self.reject(session, err);
        }
        if let Some(fragment) = chunk.fragment() {
            if let Err(err) = session.append_turn_text(self.index, fragment) {
                self.reject(session, err);
            }
        }
        if chunk.done {
            self.saw_done = true;
            self.stats = GenerationStats::from_chunk(&chunk);
            session.set_context(chunk.context.map(Context::new));
            return true;
        }
        false
    }

    fn reject(&mut self, session: &mut Session, err: Error) {
        STREAM_CHUNK_ERRORS.click();
        session.notify_chunk_rejected(self.index, &err);
        self.diagnostics.push(err);
    }

    fn into_outcome(self, error: Option<Error>) -> IngestOutcome {
        IngestOutcome {
            index: self.index,
            state: self.state,
            diagnostics: self.diagnostics,
            stats: self.stats,
            saw_done: self.saw_done,
            chunks: self.chunks,
            error,
        }
    }
}
