// Public modules
pub mod context;
pub mod feedback_mark;
pub mod generate_chunk;
pub mod generate_request;
pub mod model_list_response;
pub mod model_tag;
pub mod role;
pub mod turn;

// Re-exports
pub use context::Context;
pub use feedback_mark::FeedbackMark;
pub use generate_chunk::{GenerateChunk, GenerationStats};
pub use generate_request::{DEFAULT_TEMPERATURE, GenerateOptions, GenerateRequest};
pub use model_list_response::ModelListResponse;
pub use model_tag::ModelTag;
pub use role::Role;
pub use turn::Turn;
