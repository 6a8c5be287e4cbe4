//! Error types for the documents agent.

use docmind_core::error::DocmindError;

use crate::orchestrator::TurnState;

/// Errors from an agent turn.
///
/// Upstream, refusal and input failures of the pipeline pass through
/// unchanged in [`AgentError::Core`].
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("invalid arguments for tool {tool}: {message}")]
    InvalidToolArguments { tool: String, message: String },
    #[error("invalid turn transition: {0:?} -> {1:?}")]
    InvalidTransition(TurnState, TurnState),
    #[error(transparent)]
    Core(#[from] DocmindError),
}

impl AgentError {
    pub fn invalid_arguments(tool: &str, message: impl Into<String>) -> Self {
        AgentError::InvalidToolArguments {
            tool: tool.to_string(),
            message: message.into(),
        }
    }

    /// True when the language model declined to produce structured output.
    pub fn is_refusal(&self) -> bool {
        matches!(self, AgentError::Core(DocmindError::Refusal(_)))
    }
}
