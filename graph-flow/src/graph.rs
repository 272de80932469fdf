use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::{
    context::Context,
    error::{GraphError, Result},
    storage::Session,
    task::{NextAction, Task, TaskResult},
};

/// Type alias for edge condition functions
pub type EdgeCondition = Arc<dyn Fn(&Context) -> bool + Send + Sync>;

/// Edge between tasks in the graph
#[derive(Clone)]
pub enum Edge {
    Direct {
        from: String,
        to: String,
    },
    /// Routes to `yes` when the condition holds, otherwise to `no`
    Conditional {
        from: String,
        condition: EdgeCondition,
        yes: String,
        no: String,
    },
}

impl Edge {
    fn from(&self) -> &str {
        match self {
            Edge::Direct { from, .. } | Edge::Conditional { from, .. } => from,
        }
    }

    fn target(&self, context: &Context) -> &str {
        match self {
            Edge::Direct { to, .. } => to,
            Edge::Conditional {
                condition, yes, no, ..
            } => {
                if condition(context) {
                    yes
                } else {
                    no
                }
            }
        }
    }
}

/// A graph of tasks that can be executed
pub struct Graph {
    pub id: String,
    tasks: HashMap<String, Arc<dyn Task>>,
    edges: Vec<Edge>,
}

impl Graph {
    /// Execute the current task of the session, following `ContinueAndExecute` chains,
    /// and leave the session resting on the task that should receive the next input.
    pub async fn execute_session(&self, session: &mut Session) -> Result<ExecutionResult> {
        let resting_on = session.current_task_id.clone();
        let mut task_id = resting_on.clone();

        let (response, status) = loop {
            let result = self
                .execute_single_task(&task_id, session.context.clone())
                .await?;
            session.status_message = result.status_message.clone();

            match result.next_action {
                NextAction::ContinueAndExecute => {
                    if let Some(next_task_id) = self.find_next_task(&task_id, &session.context) {
                        debug!(from = %task_id, to = %next_task_id, "Continuing to next task");
                        task_id = next_task_id;
                        continue;
                    }
                    session.current_task_id = task_id;
                    break (result.response, ExecutionStatus::WaitingForInput);
                }
                NextAction::Continue => {
                    session.current_task_id = self
                        .find_next_task(&task_id, &session.context)
                        .unwrap_or(task_id);
                    break (result.response, ExecutionStatus::WaitingForInput);
                }
                NextAction::WaitForInput => {
                    session.current_task_id = task_id;
                    break (result.response, ExecutionStatus::WaitingForInput);
                }
                NextAction::End => {
                    session.current_task_id = task_id;
                    break (result.response, ExecutionStatus::Completed);
                }
                NextAction::GoTo(target_id) => {
                    if !self.tasks.contains_key(&target_id) {
                        return Err(GraphError::TaskNotFound(target_id));
                    }
                    session.current_task_id = target_id;
                    break (result.response, ExecutionStatus::WaitingForInput);
                }
                NextAction::GoBack => {
                    session.current_task_id = session.history.pop().unwrap_or(task_id);
                    return Ok(ExecutionResult {
                        response: result.response,
                        status: ExecutionStatus::WaitingForInput,
                    });
                }
            }
        };

        if session.current_task_id != resting_on {
            session.history.push(resting_on);
        }

        Ok(ExecutionResult { response, status })
    }

    /// Execute a single task without following any edges
    async fn execute_single_task(&self, task_id: &str, context: Context) -> Result<TaskResult> {
        let task = self
            .tasks
            .get(task_id)
            .ok_or_else(|| GraphError::TaskNotFound(task_id.to_string()))?;

        let mut result = task.run(context).await?;
        result.task_id = task_id.to_string();
        Ok(result)
    }

    /// Find the next task based on edges and conditions. The first edge leaving
    /// `current_task_id` decides.
    pub fn find_next_task(&self, current_task_id: &str, context: &Context) -> Option<String> {
        self.edges
            .iter()
            .find(|edge| edge.from() == current_task_id)
            .map(|edge| edge.target(context).to_string())
    }
}

/// Builder for creating graphs
pub struct GraphBuilder {
    id: String,
    tasks: HashMap<String, Arc<dyn Task>>,
    edges: Vec<Edge>,
}

impl GraphBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tasks: HashMap::new(),
            edges: Vec::new(),
        }
    }

    /// Add a task, keyed by its [`Task::id`]
    pub fn add_task(mut self, task: Arc<dyn Task>) -> Self {
        self.tasks.insert(task.id().to_string(), task);
        self
    }

    pub fn add_edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.push(Edge::Direct {
            from: from.into(),
            to: to.into(),
        });
        self
    }

    pub fn add_conditional_edge<F>(
        mut self,
        from: impl Into<String>,
        condition: F,
        yes: impl Into<String>,
        no: impl Into<String>,
    ) -> Self
    where
        F: Fn(&Context) -> bool + Send + Sync + 'static,
    {
        self.edges.push(Edge::Conditional {
            from: from.into(),
            condition: Arc::new(condition),
            yes: yes.into(),
            no: no.into(),
        });
        self
    }

    pub fn build(self) -> Graph {
        Graph {
            id: self.id,
            tasks: self.tasks,
            edges: self.edges,
        }
    }
}

/// Status of graph execution
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub response: Option<String>,
    pub status: ExecutionStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionStatus {
    /// Waiting for user input to continue
    WaitingForInput,
    /// Workflow completed successfully
    Completed,
}
