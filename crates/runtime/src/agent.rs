//! The agent orchestration loop.

use crate::action::{AgentAction, parse_action};
use crate::backend::{ChatRequest, LlmBackend, Message};
use crate::conversation::{Conversation, Turn};
use crate::prompt::{self, FORMAT_REMINDER};
use crate::tools::{Dispatcher, ToolRegistry};
use std::sync::Arc;
use tracing::{debug, info, warn};

const DEFAULT_MAX_ITERATIONS: u32 = 5;

const PARSE_FAILED_ANSWER: &str = "I apologize, but I could not work out a valid next step for \
that request. Could you rephrase it?";

const EXHAUSTED_ANSWER: &str = "I ran out of steps before finishing that request. Please narrow \
it down or ask again.";

/// Terminal and in-flight status of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    /// The model produced a final answer.
    Completed,
    /// The iteration budget was spent on tool calls without a final answer.
    Exhausted,
    /// The run ended on repeated parse failures or a model transport error.
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Exhausted => "exhausted",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Per-run bookkeeping; created at the start of `run` and discarded at the
/// end. The conversation outlives it.
#[derive(Debug)]
struct RunState {
    iteration_count: u32,
    max_iterations: u32,
    status: RunStatus,
}

impl RunState {
    fn new(max_iterations: u32) -> Self {
        Self {
            iteration_count: 0,
            max_iterations,
            status: RunStatus::Running,
        }
    }

    /// Count one model round-trip that did not conclude the run; reports
    /// whether the budget is now spent.
    fn charge(&mut self) -> bool {
        self.iteration_count += 1;
        self.iteration_count >= self.max_iterations
    }
}

/// What a finished run looked like.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Always a human-readable answer, whatever the status.
    pub answer: String,
    pub status: RunStatus,
    pub iterations: u32,
}

/// The orchestration loop: drives the model, dispatches requested tools, and
/// folds results back into the conversation until a final answer appears or
/// the iteration budget runs out.
///
/// Every failure path resolves to a returned answer string; `run` never
/// surfaces an error to the presentation layer.
pub struct Agent<B: LlmBackend> {
    backend: B,
    dispatcher: Dispatcher,
    conversation: Conversation,
    system: String,
    max_iterations: u32,
}

impl<B: LlmBackend> Agent<B> {
    /// Create an agent over a backend and a startup-validated tool registry.
    pub fn new(backend: B, registry: Arc<ToolRegistry>) -> Self {
        let system = prompt::render_system(&registry);
        Self {
            backend,
            dispatcher: Dispatcher::new(registry),
            conversation: Conversation::new(),
            system,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Set the iteration ceiling per run.
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// The transcript accumulated across runs of this session.
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Clear the session transcript (explicit user action).
    pub fn reset(&mut self) {
        self.conversation.reset();
    }

    /// Process one user utterance to completion.
    pub async fn run(&mut self, user_utterance: &str) -> RunReport {
        self.conversation.append(Turn::user(user_utterance));
        let mut state = RunState::new(self.max_iterations);

        info!(
            session = %self.conversation.id(),
            max_iterations = state.max_iterations,
            "run started"
        );

        loop {
            let messages = self.build_messages();
            let response = match self
                .backend
                .chat(ChatRequest {
                    messages: &messages,
                    system: Some(&self.system),
                })
                .await
            {
                Ok(response) => response,
                Err(err) => {
                    warn!(session = %self.conversation.id(), error = %err, "model call failed");
                    let answer =
                        format!("I apologize, but I ran into a problem handling that: {err}");
                    return self.finish(state, RunStatus::Failed, answer);
                }
            };

            match parse_action(&response.content) {
                Ok(AgentAction::FinalAnswer { text }) => {
                    return self.finish(state, RunStatus::Completed, text);
                }
                Ok(AgentAction::ToolCall { name, arguments }) => {
                    debug!(
                        session = %self.conversation.id(),
                        tool = %name,
                        iteration = state.iteration_count,
                        "dispatching tool call"
                    );
                    let result = self.dispatcher.invoke(&name, &arguments).await;
                    self.conversation.append(Turn::tool_result(name, result));
                    if state.charge() {
                        return self.finish(state, RunStatus::Exhausted, EXHAUSTED_ANSWER.into());
                    }
                }
                Err(err) => {
                    debug!(
                        session = %self.conversation.id(),
                        error = %err,
                        iteration = state.iteration_count,
                        "model output was not an action"
                    );
                    if state.charge() {
                        return self.finish(state, RunStatus::Failed, PARSE_FAILED_ANSWER.into());
                    }
                    self.conversation.append(Turn::note(FORMAT_REMINDER));
                }
            }
        }
    }

    fn finish(&mut self, mut state: RunState, status: RunStatus, answer: String) -> RunReport {
        state.status = status;
        self.conversation.append(Turn::assistant(&answer));
        info!(
            session = %self.conversation.id(),
            status = ?state.status,
            iterations = state.iteration_count,
            "run finished"
        );
        RunReport {
            answer,
            status: state.status,
            iterations: state.iteration_count,
        }
    }

    /// Render the transcript into model messages. Tool results and
    /// corrective notes travel as user-role observations, the JSON-chat
    /// convention the prompt's format contract assumes.
    fn build_messages(&self) -> Vec<Message> {
        self.conversation
            .history()
            .iter()
            .map(|record| match &record.turn {
                Turn::User { text } => Message::user(text),
                Turn::Assistant { text } => Message::assistant(text),
                Turn::ToolResult { tool, result } => {
                    Message::user(format!("Observation from {tool}: {}", result.render()))
                }
                Turn::Note { text } => Message::user(text),
            })
            .collect()
    }
}
