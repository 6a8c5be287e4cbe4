//! Mind-map generation with structured model output.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use docmind_core::config::AgentConfig;
use docmind_core::error::DocmindError;

use crate::context::AgentRequestContext;
use crate::error::AgentError;
use crate::llm::{ChatMessage, ChatModel, ChatRequest, ResponseFormat};
use crate::tools::{parse_arguments, AgentTool};

const SYSTEM_PROMPT: &str = "You are a helpful AI that generates mind maps from documents. \
The mind map is a tree of nodes: every node has a short \"name\" and a list of \"children\" \
(empty for leaves). Use one root node for the main topic and group subtopics beneath it.";

/// One node of a mind map tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MindmapNode {
    pub name: String,
    #[serde(default)]
    pub children: Vec<MindmapNode>,
}

/// Bounds applied to model-produced trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MindmapLimits {
    /// Maximum number of levels, counting the root as 1.
    pub max_depth: usize,
    pub max_nodes: usize,
}

impl Default for MindmapLimits {
    fn default() -> Self {
        Self {
            max_depth: 6,
            max_nodes: 200,
        }
    }
}

impl MindmapLimits {
    pub fn from_config(config: &AgentConfig) -> Self {
        Self {
            max_depth: config.mindmap_max_depth,
            max_nodes: config.mindmap_max_nodes,
        }
    }
}

impl MindmapNode {
    pub fn leaf(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Check names, depth and size without recursing.
    pub fn validate(&self, limits: MindmapLimits) -> Result<(), String> {
        let mut stack = vec![(self, 1usize)];
        let mut count = 0usize;
        while let Some((node, depth)) = stack.pop() {
            count += 1;
            if count > limits.max_nodes {
                return Err(format!("mind map exceeds {} nodes", limits.max_nodes));
            }
            if depth > limits.max_depth {
                return Err(format!("mind map exceeds depth {}", limits.max_depth));
            }
            if node.name.trim().is_empty() {
                return Err("mind map node has an empty name".to_string());
            }
            stack.extend(node.children.iter().map(|child| (child, depth + 1)));
        }
        Ok(())
    }

    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(MindmapNode::node_count).sum::<usize>()
    }

    pub fn depth(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(MindmapNode::depth)
            .max()
            .unwrap_or(0)
    }
}

/// Strict JSON schema of a recursive node, for structured output.
pub fn mindmap_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "name": { "type": "string" },
            "children": {
                "type": "array",
                "items": { "$ref": "#" }
            }
        },
        "required": ["name", "children"],
        "additionalProperties": false
    })
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MindmapArgs {
    text: String,
}

pub struct MindmapGeneratorTool {
    model: Arc<dyn ChatModel>,
    model_name: String,
    limits: MindmapLimits,
}

impl MindmapGeneratorTool {
    pub fn new(model: Arc<dyn ChatModel>, model_name: impl Into<String>, limits: MindmapLimits) -> Self {
        Self {
            model,
            model_name: model_name.into(),
            limits,
        }
    }

    /// Ask the model for a tree and validate it.
    pub async fn generate(&self, text: &str) -> Result<MindmapNode, AgentError> {
        let mut request = ChatRequest::new(
            self.model_name.clone(),
            vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(format!(
                    "Please generate a mind map for the following text:\n\n{text}"
                )),
            ],
        );
        request.response_format = Some(ResponseFormat {
            name: "mindmap".to_string(),
            schema: mindmap_schema(),
        });

        let completion = self.model.complete(request).await?;
        if let Some(reason) = completion.refusal {
            return Err(DocmindError::Refusal(format!("mindmap generation failed: {reason}")).into());
        }

        let content = completion
            .content
            .ok_or_else(|| DocmindError::upstream("language model", "mind map response was empty"))?;
        let node: MindmapNode = serde_json::from_str(&content).map_err(|e| {
            DocmindError::upstream("language model", format!("malformed mind map: {e}"))
        })?;
        node.validate(self.limits)
            .map_err(|e| DocmindError::upstream("language model", e))?;
        debug!(
            nodes = node.node_count(),
            depth = node.depth(),
            "Mind map generated"
        );
        Ok(node)
    }
}

#[async_trait]
impl AgentTool for MindmapGeneratorTool {
    fn name(&self) -> &'static str {
        "mindmap_generator"
    }

    fn description(&self) -> &'static str {
        "Generates a mind map from the provided text. The mind map is a tree of nodes where \
         each node can have children. Use this whenever the user asks for a mind map."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "text": {
                    "type": "string",
                    "description": "Text to turn into a mind map."
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
        let args: MindmapArgs = parse_arguments(self.name(), arguments)?;
        if args.text.trim().is_empty() {
            return Err(AgentError::invalid_arguments(self.name(), "text cannot be empty"));
        }
        let mindmap = self.generate(&args.text).await?;
        Ok(json!({ "mindmap": mindmap }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatCompletion, ScriptedChatModel};

    fn chain(depth: usize) -> MindmapNode {
        let mut node = MindmapNode::leaf(format!("level {depth}"));
        for level in (1..depth).rev() {
            node = MindmapNode {
                name: format!("level {level}"),
                children: vec![node],
            };
        }
        node
    }

    fn tool(model: Arc<ScriptedChatModel>, limits: MindmapLimits) -> MindmapGeneratorTool {
        MindmapGeneratorTool::new(model, "gpt-4o-mini", limits)
    }

    #[test]
    fn test_children_default_to_empty() {
        let node: MindmapNode =
            serde_json::from_str(r#"{"name":"Root","children":[{"name":"Leaf"}]}"#).unwrap();
        assert_eq!(node.children[0].children.len(), 0);
        assert_eq!(node.node_count(), 2);
        assert_eq!(node.depth(), 2);
    }

    #[test]
    fn test_validate_depth_limit() {
        let limits = MindmapLimits {
            max_depth: 3,
            max_nodes: 100,
        };
        assert!(chain(3).validate(limits).is_ok());
        let err = chain(4).validate(limits).unwrap_err();
        assert!(err.contains("depth 3"));
    }

    #[test]
    fn test_validate_node_limit() {
        let root = MindmapNode {
            name: "root".into(),
            children: (0..10).map(|i| MindmapNode::leaf(format!("c{i}"))).collect(),
        };
        let limits = MindmapLimits {
            max_depth: 5,
            max_nodes: 10,
        };
        assert!(root.validate(limits).unwrap_err().contains("10 nodes"));
    }

    #[test]
    fn test_validate_rejects_blank_names() {
        let root = MindmapNode {
            name: "root".into(),
            children: vec![MindmapNode::leaf("  ")],
        };
        assert!(root.validate(MindmapLimits::default()).is_err());
    }

    #[test]
    fn test_schema_is_recursive_and_strict() {
        let schema = mindmap_schema();
        assert_eq!(schema["properties"]["children"]["items"]["$ref"], "#");
        assert_eq!(schema["additionalProperties"], false);
        assert_eq!(schema["required"], json!(["name", "children"]));
    }

    #[tokio::test]
    async fn test_generate_parses_tree_and_requests_structured_output() {
        let content = json!({
            "name": "Rust",
            "children": [
                {"name": "Ownership", "children": []},
                {"name": "Traits", "children": [{"name": "Generics", "children": []}]}
            ]
        })
        .to_string();
        let model = Arc::new(ScriptedChatModel::new([ChatCompletion::text(content)]));
        let generator = tool(model.clone(), MindmapLimits::default());

        let node = generator.generate("Rust notes").await.unwrap();
        assert_eq!(node.name, "Rust");
        assert_eq!(node.node_count(), 4);

        let request = &model.requests()[0];
        let format = request.response_format.as_ref().unwrap();
        assert_eq!(format.name, "mindmap");
        assert!(request.messages[1]
            .content
            .as_deref()
            .unwrap()
            .ends_with("Rust notes"));
    }

    #[tokio::test]
    async fn test_refusal_is_distinct_failure() {
        let model = Arc::new(ScriptedChatModel::new([ChatCompletion::refusal(
            "content not allowed",
        )]));
        let generator = tool(model, MindmapLimits::default());

        let err = generator.generate("text").await.unwrap_err();
        assert!(err.is_refusal());
        assert!(err.to_string().contains("content not allowed"));
    }

    #[tokio::test]
    async fn test_oversized_tree_is_upstream_failure() {
        let content = serde_json::to_string(&chain(5)).unwrap();
        let model = Arc::new(ScriptedChatModel::new([ChatCompletion::text(content)]));
        let generator = tool(
            model,
            MindmapLimits {
                max_depth: 4,
                max_nodes: 50,
            },
        );

        let err = generator.generate("text").await.unwrap_err();
        assert!(matches!(err, AgentError::Core(DocmindError::Upstream { .. })));
    }

    #[tokio::test]
    async fn test_malformed_json_is_upstream_failure() {
        let model = Arc::new(ScriptedChatModel::new([ChatCompletion::text("not json")]));
        let generator = tool(model, MindmapLimits::default());
        let err = generator.generate("text").await.unwrap_err();
        assert!(err.to_string().contains("malformed mind map"));
    }
}
