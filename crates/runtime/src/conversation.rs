//! Conversation transcript management.

use crate::tools::ToolResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unique identifier for a conversation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entry in the transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Turn {
    /// What the user said.
    User { text: String },
    /// The agent's reply.
    Assistant { text: String },
    /// What a tool returned, tagged with the tool that produced it.
    ToolResult { tool: String, result: ToolResult },
    /// A corrective instruction injected after unparseable model output.
    Note { text: String },
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self::User { text: text.into() }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::Assistant { text: text.into() }
    }

    pub fn tool_result(tool: impl Into<String>, result: ToolResult) -> Self {
        Self::ToolResult {
            tool: tool.into(),
            result,
        }
    }

    pub fn note(text: impl Into<String>) -> Self {
        Self::Note { text: text.into() }
    }
}

/// A turn with its position and timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRecord {
    /// Monotonic append position; never reused, even across resets.
    pub index: u64,
    pub timestamp: DateTime<Utc>,
    pub turn: Turn,
}

/// Ordered, append-only transcript of a session.
///
/// The full transcript is replayed into the model context on every call, so
/// the conversation carries session memory across runs. One conversation
/// belongs to one agent; it is never shared between concurrent runs.
#[derive(Debug)]
pub struct Conversation {
    id: SessionId,
    turns: Vec<TurnRecord>,
    next_index: u64,
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            id: SessionId::new(),
            turns: Vec::new(),
            next_index: 0,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Append a turn; O(1), never fails.
    pub fn append(&mut self, turn: Turn) -> &TurnRecord {
        let record = TurnRecord {
            index: self.next_index,
            timestamp: Utc::now(),
            turn,
        };
        self.next_index += 1;
        self.turns.push(record);
        self.turns.last().expect("just pushed")
    }

    /// The full ordered transcript.
    pub fn history(&self) -> &[TurnRecord] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Clear the transcript (explicit user action, e.g. "clear chat").
    pub fn reset(&mut self) {
        self.turns.clear();
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_assigns_monotonic_indices() {
        let mut conv = Conversation::new();
        conv.append(Turn::user("hi"));
        conv.append(Turn::assistant("hello"));
        let indices: Vec<u64> = conv.history().iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn reset_clears_but_does_not_reuse_indices() {
        let mut conv = Conversation::new();
        conv.append(Turn::user("hi"));
        conv.reset();
        assert!(conv.is_empty());
        let record = conv.append(Turn::user("again"));
        assert_eq!(record.index, 1);
    }

    #[test]
    fn tool_result_turn_carries_tool_name() {
        let mut conv = Conversation::new();
        conv.append(Turn::tool_result(
            "FindHCPs",
            ToolResult::success(serde_json::json!([])),
        ));
        match &conv.history()[0].turn {
            Turn::ToolResult { tool, result } => {
                assert_eq!(tool, "FindHCPs");
                assert!(result.ok);
            }
            other => panic!("unexpected turn: {other:?}"),
        }
    }
}
