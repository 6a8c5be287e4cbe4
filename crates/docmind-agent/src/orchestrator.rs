//! Documents agent: drives one tool-calling turn per user message.
//!
//! A turn moves through `Received -> Planning -> (ToolInvocation -> Planning)*
//! -> Responding -> Done`. Tool calls run sequentially with a fresh
//! [`AgentRequestContext`] so the owner never comes from model output.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use docmind_core::config::AgentConfig;
use docmind_core::error::DocmindError;
use docmind_core::types::OwnerId;
use docmind_vector::QueryPipeline;

use crate::context::AgentRequestContext;
use crate::error::AgentError;
use crate::llm::{ChatMessage, ChatModel, ChatRequest, ToolCall};
use crate::tools::{
    DocumentsSearchTool, DocumentsSummaryTool, MindmapGeneratorTool, MindmapLimits, ToolRegistry,
};

/// Maximum user message length in characters.
pub const MAX_MESSAGE_LENGTH: usize = 4000;

const SERVICE: &str = "language model";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Received,
    Planning,
    ToolInvocation,
    Responding,
    Done,
}

/// Validate that a turn state transition is allowed.
///
/// Valid transitions:
/// - Received -> Planning
/// - Planning -> ToolInvocation
/// - ToolInvocation -> Planning
/// - Planning -> Responding
/// - Responding -> Done
pub fn validate_transition(from: TurnState, to: TurnState) -> Result<(), AgentError> {
    let valid = matches!(
        (from, to),
        (TurnState::Received, TurnState::Planning)
            | (TurnState::Planning, TurnState::ToolInvocation)
            | (TurnState::ToolInvocation, TurnState::Planning)
            | (TurnState::Planning, TurnState::Responding)
            | (TurnState::Responding, TurnState::Done)
    );

    if valid {
        Ok(())
    } else {
        Err(AgentError::InvalidTransition(from, to))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSettings {
    pub model: String,
    pub instructions: String,
    /// Planning rounds that may request tools before the model must answer.
    pub max_tool_rounds: usize,
}

impl AgentSettings {
    pub fn from_config(config: &AgentConfig) -> Self {
        Self {
            model: config.model.clone(),
            instructions: config.instructions.clone(),
            max_tool_rounds: config.max_tool_rounds,
        }
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self::from_config(&AgentConfig::default())
    }
}

/// A tool call made during a turn, with its parsed arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub name: String,
    pub arguments: Value,
}

/// Result of one agent turn.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentTurn {
    pub answer: String,
    pub tool_invocations: Vec<ToolInvocation>,
    /// Number of chat model calls made while planning.
    pub rounds: usize,
}

pub struct DocumentsAgent {
    model: Arc<dyn ChatModel>,
    tools: ToolRegistry,
    search: Arc<QueryPipeline>,
    settings: AgentSettings,
}

impl DocumentsAgent {
    pub fn new(
        model: Arc<dyn ChatModel>,
        tools: ToolRegistry,
        search: Arc<QueryPipeline>,
        settings: AgentSettings,
    ) -> Self {
        Self {
            model,
            tools,
            search,
            settings,
        }
    }

    /// Agent with the search, summary and mind-map tools registered.
    pub fn with_default_tools(
        model: Arc<dyn ChatModel>,
        search: Arc<QueryPipeline>,
        config: &AgentConfig,
    ) -> Self {
        let tools = ToolRegistry::new()
            .with(DocumentsSearchTool)
            .with(DocumentsSummaryTool::new(model.clone(), config.tool_model.clone()))
            .with(MindmapGeneratorTool::new(
                model.clone(),
                config.tool_model.clone(),
                MindmapLimits::from_config(config),
            ));
        Self::new(model, tools, search, AgentSettings::from_config(config))
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    /// Answer a message on behalf of `owner_id`.
    pub async fn answer(&self, query: &str, owner_id: &OwnerId) -> Result<String, AgentError> {
        self.answer_with_trace(query, owner_id)
            .await
            .map(|turn| turn.answer)
    }

    /// Answer a message and report every tool invocation in order.
    pub async fn answer_with_trace(
        &self,
        query: &str,
        owner_id: &OwnerId,
    ) -> Result<AgentTurn, AgentError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AgentError::EmptyMessage);
        }
        if query.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(AgentError::MessageTooLong(MAX_MESSAGE_LENGTH));
        }

        let ctx = AgentRequestContext::new(owner_id, &self.search);
        let mut messages = vec![
            ChatMessage::system(self.settings.instructions.clone()),
            ChatMessage::user(query),
        ];
        let mut invocations = Vec::new();
        let mut state = TurnState::Received;

        for round in 0..=self.settings.max_tool_rounds {
            state = self.advance(state, TurnState::Planning)?;

            let mut request = ChatRequest::new(self.settings.model.clone(), messages.clone());
            let final_round = round == self.settings.max_tool_rounds;
            if !final_round {
                request.tools = self.tools.definitions();
            }

            let completion = self.model.complete(request).await?;
            if let Some(reason) = completion.refusal {
                return Err(DocmindError::Refusal(reason).into());
            }

            if completion.tool_calls.is_empty() {
                state = self.advance(state, TurnState::Responding)?;
                let answer = completion
                    .content
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty())
                    .ok_or_else(|| DocmindError::upstream(SERVICE, "agent answer was empty"))?;
                self.advance(state, TurnState::Done)?;

                info!(
                    owner_id = %owner_id,
                    rounds = round + 1,
                    tool_calls = invocations.len(),
                    "Agent turn completed"
                );
                return Ok(AgentTurn {
                    answer,
                    tool_invocations: invocations,
                    rounds: round + 1,
                });
            }

            if final_round {
                return Err(DocmindError::upstream(
                    SERVICE,
                    format!(
                        "model requested tools after {} rounds",
                        self.settings.max_tool_rounds
                    ),
                )
                .into());
            }

            state = self.advance(state, TurnState::ToolInvocation)?;
            messages.push(ChatMessage::assistant_tool_calls(
                completion.content.clone(),
                completion.tool_calls.clone(),
            ));
            for call in &completion.tool_calls {
                let (arguments, output) = self.invoke(call, &ctx).await?;
                invocations.push(ToolInvocation {
                    name: call.name.clone(),
                    arguments,
                });
                messages.push(ChatMessage::tool_result(call.id.clone(), output.to_string()));
            }
        }

        // The final round either answers or returns above.
        Err(DocmindError::upstream(SERVICE, "agent turn ended without an answer").into())
    }

    fn advance(&self, from: TurnState, to: TurnState) -> Result<TurnState, AgentError> {
        validate_transition(from, to)?;
        debug!(from = ?from, to = ?to, "Agent state transition");
        Ok(to)
    }

    async fn invoke(
        &self,
        call: &ToolCall,
        ctx: &AgentRequestContext<'_>,
    ) -> Result<(Value, Value), AgentError> {
        let tool = self
            .tools
            .get(&call.name)
            .ok_or_else(|| AgentError::UnknownTool(call.name.clone()))?;

        let arguments: Value = if call.arguments.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(&call.arguments)
                .map_err(|e| AgentError::invalid_arguments(&call.name, e.to_string()))?
        };

        debug!(tool = %call.name, call_id = %call.id, "Invoking agent tool");
        let output = tool.execute(arguments.clone(), ctx).await?;
        Ok((arguments, output))
    }
}
