//! Per-request context handed to agent tools.

use docmind_core::types::OwnerId;
use docmind_vector::QueryPipeline;

/// Everything a tool may need about the current caller.
///
/// Built fresh for every agent invocation and borrowed by each tool call.
/// The owner is never taken from model-produced arguments, only from here.
pub struct AgentRequestContext<'a> {
    owner_id: &'a OwnerId,
    search: &'a QueryPipeline,
}

impl<'a> AgentRequestContext<'a> {
    pub fn new(owner_id: &'a OwnerId, search: &'a QueryPipeline) -> Self {
        Self { owner_id, search }
    }

    pub fn owner_id(&self) -> &OwnerId {
        self.owner_id
    }

    pub fn search(&self) -> &QueryPipeline {
        self.search
    }
}
