//! Core agent runtime: the orchestration loop, tool registry and dispatch,
//! conversation transcripts, and the model backend.
//!
//! The runtime is presentation-agnostic. The CLI and the dashboard both
//! drive the same [`Agent`]: hand it a user utterance, get back a
//! [`RunReport`] whose `answer` is always human-readable text, whatever
//! went wrong underneath.

mod action;
mod agent;
pub mod backend;
mod conversation;
mod error;
mod prompt;
pub mod tools;

pub use action::{AgentAction, ParseError, parse_action};
pub use agent::{Agent, RunReport, RunStatus};
pub use backend::{
    ChatRequest, ChatResponse, LlmBackend, Message, OpenAiBackend, OpenAiBackendBuilder, Role,
    Usage,
};
pub use conversation::{Conversation, SessionId, Turn, TurnRecord};
pub use error::{Error, Result};
pub use prompt::{FORMAT_REMINDER, render_system};
