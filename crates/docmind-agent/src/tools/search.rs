use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::context::AgentRequestContext;
use crate::error::AgentError;
use crate::tools::{parse_arguments, AgentTool};

/// Only the query is accepted; the owner comes from the request context.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SearchArgs {
    query: String,
}

/// Semantic search over the caller's documents.
pub struct DocumentsSearchTool;

#[async_trait]
impl AgentTool for DocumentsSearchTool {
    fn name(&self) -> &'static str {
        "documents_search"
    }

    fn description(&self) -> &'static str {
        "Search the user's documents in the vector store. Returns the passages \
         most relevant to the query."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "What to look for in the documents."
                }
            },
            "required": ["query"],
            "additionalProperties": false
        })
    }

    async fn execute(
        &self,
        arguments: Value,
        ctx: &AgentRequestContext<'_>,
    ) -> Result<Value, AgentError> {
        let args: SearchArgs = parse_arguments(self.name(), arguments)?;
        let hits = ctx.search().search(&args.query, ctx.owner_id()).await?;
        debug!(hits = hits.len(), "documents_search completed");
        Ok(json!({ "results": hits }))
    }
}
