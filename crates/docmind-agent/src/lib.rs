//! docmind-agent: tool-calling documents agent.
//!
//! Wraps a chat model with three tools (search, summary, mind map). The
//! caller's owner id travels in an [`AgentRequestContext`] and never through
//! model-produced arguments.

pub mod context;
pub mod error;
pub mod llm;
pub mod orchestrator;
pub mod tools;

pub use context::AgentRequestContext;
pub use error::AgentError;
pub use llm::{
    ChatCompletion, ChatMessage, ChatModel, ChatRequest, OpenAiChatModel, ScriptedChatModel,
};
pub use orchestrator::{AgentSettings, AgentTurn, DocumentsAgent, ToolInvocation, TurnState};
pub use tools::{AgentTool, ToolRegistry};
