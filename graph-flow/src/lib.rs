pub mod context;
pub mod error;
pub mod graph;
pub mod runner;
pub mod storage;
pub mod task;

// Re-export commonly used types
pub use context::Context;
pub use error::{GraphError, Result};
pub use graph::{ExecutionResult, ExecutionStatus, Graph, GraphBuilder};
pub use runner::FlowRunner;
pub use storage::{InMemorySessionStorage, Session, SessionStorage};
pub use task::{NextAction, Task, TaskResult};

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;

    /// Stores the pending input under its own id and moves on with `action`.
    struct FormTask {
        id: &'static str,
        action: NextAction,
    }

    #[async_trait]
    impl Task for FormTask {
        fn id(&self) -> &str {
            self.id
        }

        async fn run(&self, context: Context) -> Result<TaskResult> {
            let input: String = context.get("input").await.unwrap_or_default();
            context.set(self.id, input).await;
            Ok(TaskResult::new_with_status(
                Some(format!("{} done", self.id)),
                self.action.clone(),
                Some(format!("ran {}", self.id)),
            ))
        }
    }

    struct BackTask;

    #[async_trait]
    impl Task for BackTask {
        fn id(&self) -> &str {
            "back"
        }

        async fn run(&self, _context: Context) -> Result<TaskResult> {
            Ok(TaskResult::new_with_status(None, NextAction::GoBack, None))
        }
    }

    struct FailingTask;

    #[async_trait]
    impl Task for FailingTask {
        fn id(&self) -> &str {
            "failing"
        }

        async fn run(&self, _context: Context) -> Result<TaskResult> {
            Err(GraphError::TaskExecutionFailed("boom".to_string()))
        }
    }

    fn task(id: &'static str, action: NextAction) -> Arc<dyn Task> {
        Arc::new(FormTask { id, action })
    }

    #[tokio::test]
    async fn continue_moves_one_step_and_waits() {
        let graph = GraphBuilder::new("wizard")
            .add_task(task("first", NextAction::Continue))
            .add_task(task("second", NextAction::End))
            .add_edge("first", "second")
            .build();

        let mut session = Session::new_from_task("s1".to_string(), "first");
        session.context.set("input", "hello").await;

        let result = graph.execute_session(&mut session).await.unwrap();
        assert_eq!(result.status, ExecutionStatus::WaitingForInput);
        assert_eq!(result.response.as_deref(), Some("first done"));
        assert_eq!(session.current_task_id, "second");
        assert_eq!(session.history, vec!["first".to_string()]);
        assert_eq!(session.status_message.as_deref(), Some("ran first"));
        assert!(!session.context.contains_key("second"));

        let result = graph.execute_session(&mut session).await.unwrap();
        assert_eq!(result.status, ExecutionStatus::Completed);
        assert_eq!(session.current_task_id, "second");
    }

    #[tokio::test]
    async fn continue_and_execute_runs_the_chain() {
        let graph = GraphBuilder::new("chain")
            .add_task(task("a", NextAction::ContinueAndExecute))
            .add_task(task("b", NextAction::ContinueAndExecute))
            .add_task(task("c", NextAction::WaitForInput))
            .add_edge("a", "b")
            .add_edge("b", "c")
            .build();

        let mut session = Session::new_from_task("s".to_string(), "a");
        let result = graph.execute_session(&mut session).await.unwrap();

        assert_eq!(result.response.as_deref(), Some("c done"));
        assert_eq!(session.current_task_id, "c");
        assert!(session.context.contains_key("a"));
        assert!(session.context.contains_key("b"));
        assert_eq!(session.history, vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn conditional_edge_picks_branch_from_context() {
        let graph = GraphBuilder::new("branch")
            .add_task(task("decide", NextAction::Continue))
            .add_task(task("yes", NextAction::End))
            .add_task(task("no", NextAction::End))
            .add_conditional_edge(
                "decide",
                |ctx| ctx.get_sync::<bool>("flag").unwrap_or(false),
                "yes",
                "no",
            )
            .build();

        let mut session = Session::new_from_task("s".to_string(), "decide");
        graph.execute_session(&mut session).await.unwrap();
        assert_eq!(session.current_task_id, "no");

        let mut session = Session::new_from_task("s".to_string(), "decide");
        session.context.set("flag", true).await;
        graph.execute_session(&mut session).await.unwrap();
        assert_eq!(session.current_task_id, "yes");
    }

    #[tokio::test]
    async fn go_back_returns_to_previous_resting_task() {
        let graph = GraphBuilder::new("nav")
            .add_task(task("first", NextAction::Continue))
            .add_task(Arc::new(BackTask))
            .add_edge("first", "back")
            .build();

        let mut session = Session::new_from_task("s".to_string(), "first");
        graph.execute_session(&mut session).await.unwrap();
        assert_eq!(session.current_task_id, "back");

        graph.execute_session(&mut session).await.unwrap();
        assert_eq!(session.current_task_id, "first");
        assert!(session.history.is_empty());
    }

    #[tokio::test]
    async fn go_to_unknown_task_is_an_error() {
        let graph = GraphBuilder::new("goto")
            .add_task(task("start", NextAction::GoTo("missing".to_string())))
            .build();

        let mut session = Session::new_from_task("s".to_string(), "start");
        let err = graph.execute_session(&mut session).await.unwrap_err();
        assert!(matches!(err, GraphError::TaskNotFound(id) if id == "missing"));
    }

    #[tokio::test]
    async fn runner_persists_position_only_on_success() {
        let graph = Arc::new(
            GraphBuilder::new("runner")
                .add_task(task("start", NextAction::ContinueAndExecute))
                .add_task(Arc::new(FailingTask))
                .add_edge("start", "failing")
                .build(),
        );

        let storage: Arc<dyn SessionStorage> = Arc::new(InMemorySessionStorage::new());
        storage
            .save(Session::new_from_task("s".to_string(), "start"))
            .await
            .unwrap();

        let runner = FlowRunner::new(graph, storage.clone());
        assert!(runner.run("s").await.is_err());

        let stored = storage.get("s").await.unwrap().unwrap();
        assert_eq!(stored.current_task_id, "start");

        assert!(matches!(
            runner.run("nope").await,
            Err(GraphError::SessionNotFound(_))
        ));
    }
}
