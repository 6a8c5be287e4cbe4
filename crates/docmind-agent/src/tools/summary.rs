use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use docmind_core::error::DocmindError;

use crate::context::AgentRequestContext;
use crate::error::AgentError;
use crate::llm::{ChatMessage, ChatModel, ChatRequest};
use crate::tools::{parse_arguments, AgentTool};

const SYSTEM_PROMPT: &str = "You are a helpful AI that summarizes documents.";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SummaryArgs {
    text: String,
    #[serde(default, rename = "documentId")]
    document_id: Option<String>,
}

/// One-shot summarization of text the agent already retrieved.
pub struct DocumentsSummaryTool {
    model: Arc<dyn ChatModel>,
    model_name: String,
}

impl DocumentsSummaryTool {
    pub fn new(model: Arc<dyn ChatModel>, model_name: impl Into<String>) -> Self {
        Self {
            model,
            model_name: model_name.into(),
        }
    }
}

fn user_prompt(args: &SummaryArgs) -> String {
    match args.document_id.as_deref().filter(|id| !id.is_empty()) {
        Some(id) => format!(
            "Please summarize the following document (ID: {id}):\n\n{}",
            args.text
        ),
        None => format!("Please summarize the following document:\n\n{}", args.text),
    }
}

#[async_trait]
impl AgentTool for DocumentsSummaryTool {
    fn name(&self) -> &'static str {
        "documents_summary"
    }

    fn description(&self) -> &'static str {
        "Summarize a document based on its text content. Returns a concise summary."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "documentId": {
                    "type": "string",
                    "description": "Identifier of the document being summarized, if known."
                },
                "text": {
                    "type": "string",
                    "description": "Document text to summarize."
                }
            },
            "required": ["text"],
            "additionalProperties": false
        })
    }

    async fn execute(
        &self,
        arguments: Value,
        _ctx: &AgentRequestContext<'_>,
    ) -> Result<Value, AgentError> {
        let args: SummaryArgs = parse_arguments(self.name(), arguments)?;
        if args.text.trim().is_empty() {
            return Err(AgentError::invalid_arguments(self.name(), "text cannot be empty"));
        }

        let request = ChatRequest::new(
            self.model_name.clone(),
            vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user_prompt(&args))],
        );
        let completion = self.model.complete(request).await?;
        let summary = completion
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| DocmindError::upstream("language model", "summary response was empty"))?;

        Ok(json!({ "summary": summary }))
    }
}
