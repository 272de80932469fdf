use async_trait::async_trait;
use graph_flow::{Context, GraphError, NextAction, Result, Task, TaskResult};
use std::sync::Arc;
use tracing::info;

use super::types::{AssessmentStep, session_keys, task_ids};
use super::utils::{PendingAnalysis, recover_from_failure};
use crate::analysis::HealthAnalyzer;
use crate::models::QuestionAnswer;

pub const FINAL_FAILURE_MESSAGE: &str = "An error occurred generating final report.";

/// Second analysis pass with the patient's clarifying answers. Its result is
/// the report, whatever its own final flag says.
pub struct FinalAnalysisTask {
    analyzer: Arc<dyn HealthAnalyzer>,
}

impl FinalAnalysisTask {
    pub fn new(analyzer: Arc<dyn HealthAnalyzer>) -> Self {
        Self { analyzer }
    }
}

#[async_trait]
impl Task for FinalAnalysisTask {
    fn id(&self) -> &str {
        task_ids::ANALYZING_FINAL
    }

    async fn run(&self, context: Context) -> Result<TaskResult> {
        let answers: Vec<QuestionAnswer> = context
            .get(session_keys::QUESTION_ANSWERS)
            .await
            .ok_or_else(|| GraphError::ContextError("question answers not found".to_string()))?;

        let session_id: String = context
            .get(session_keys::SESSION_ID)
            .await
            .unwrap_or_default();
        info!(
            task_id = %self.id(),
            session_id = %session_id,
            answers = answers.len(),
            "Starting final analysis"
        );

        let pending = PendingAnalysis::load(&context, answers).await?;
        match pending.send(self.analyzer.as_ref()).await {
            Ok(analysis) => {
                info!(
                    task_id = %self.id(),
                    risk = %analysis.risk_score,
                    "Final analysis complete"
                );
                context.set(session_keys::FINAL_ANALYSIS, analysis).await;
                Ok(TaskResult::new_with_status(
                    None,
                    NextAction::ContinueAndExecute,
                    Some("Final report ready".to_string()),
                ))
            }
            Err(e) => {
                recover_from_failure(
                    &context,
                    e,
                    AssessmentStep::ClarifyingQuiz,
                    FINAL_FAILURE_MESSAGE,
                )
                .await
            }
        }
    }
}
