//! Chat application module for interactive conversations with a local model.
//!
//! This module provides the pieces of the `palaver-chat` REPL:
//!
//! - [`ChatArgs`] and [`ChatConfig`]: CLI argument parsing and configuration
//! - [`parse_command`]: slash command parsing
//! - [`PlainTextRenderer`]: terminal output, including streamed responses

mod commands;
mod config;
mod render;

pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig};
pub use render::{PlainTextRenderer, Renderer};
