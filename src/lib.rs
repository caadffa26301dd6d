//! Streaming conversation sessions for a local text-generation endpoint.
//!
//! A [`Conversation`] appends user turns to a [`Session`], dispatches each one
//! as a generate request, and folds the streamed answer into a server turn as
//! it arrives.  Completed server turns can be rated and corrected through the
//! [`FeedbackEditor`].

// Public modules
pub mod chat;
pub mod client;
pub mod config;
pub mod conversation;
pub mod dispatch;
pub mod error;
pub mod feedback;
pub mod ingest;
pub mod observer;
pub mod session;
pub mod types;

mod observability;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports
pub use client::Ollama;
pub use config::SessionConfig;
pub use conversation::{Conversation, ConversationStats};
pub use dispatch::{GenerateBackend, PreparedDispatch, RequestDispatcher};
pub use error::{Error, Result};
pub use feedback::{EditSession, EditorMode, FeedbackEditor, FeedbackOutcome};
pub use ingest::{ChunkStream, IngestOutcome, IngestState, StreamIngestor, decode_chunk};
pub use observability::register_biometrics;
pub use observer::SessionObserver;
pub use session::{DispatchEvent, Session};
pub use types::*;
