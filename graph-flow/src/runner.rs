//! FlowRunner: load a session, execute exactly one graph step, persist the session.
//!
//! Interactive services call it once per user request:
//!
//! ```rust,ignore
//! let result = state.flow_runner.run(&session_id).await?;
//! ```
//!
//! Use [`Graph::execute_session`] directly when the caller needs to look at or
//! change the session between executing and saving.

use std::sync::Arc;

use crate::{
    error::{GraphError, Result},
    graph::{ExecutionResult, Graph},
    storage::SessionStorage,
};

/// Orchestrates the common _load → execute → save_ pattern.
#[derive(Clone)]
pub struct FlowRunner {
    graph: Arc<Graph>,
    storage: Arc<dyn SessionStorage>,
}

impl FlowRunner {
    pub fn new(graph: Arc<Graph>, storage: Arc<dyn SessionStorage>) -> Self {
        Self { graph, storage }
    }

    /// Execute one step for `session_id` and save the updated session.
    ///
    /// The session is only saved when the step succeeds, so a failing task
    /// leaves the stored current task and history untouched.
    pub async fn run(&self, session_id: &str) -> Result<ExecutionResult> {
        let mut session = self
            .storage
            .get(session_id)
            .await?
            .ok_or_else(|| GraphError::SessionNotFound(session_id.to_string()))?;

        let result = self.graph.execute_session(&mut session).await?;

        self.storage.save(session).await?;

        Ok(result)
    }
}
