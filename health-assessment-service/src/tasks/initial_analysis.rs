use async_trait::async_trait;
use graph_flow::{Context, NextAction, Result, Task, TaskResult};
use std::sync::Arc;
use tracing::info;

use super::types::{AssessmentStep, session_keys, task_ids};
use super::utils::{PendingAnalysis, recover_from_failure};
use crate::analysis::HealthAnalyzer;
use crate::models::AnalysisOutcome;

pub const INITIAL_FAILURE_MESSAGE: &str = "An error occurred. Please try again.";

/// First analysis pass. Decides once whether the wizard needs a clarifying round.
pub struct InitialAnalysisTask {
    analyzer: Arc<dyn HealthAnalyzer>,
}

impl InitialAnalysisTask {
    pub fn new(analyzer: Arc<dyn HealthAnalyzer>) -> Self {
        Self { analyzer }
    }
}

#[async_trait]
impl Task for InitialAnalysisTask {
    fn id(&self) -> &str {
        task_ids::ANALYZING_INITIAL
    }

    async fn run(&self, context: Context) -> Result<TaskResult> {
        let session_id: String = context
            .get(session_keys::SESSION_ID)
            .await
            .unwrap_or_default();
        info!(task_id = %self.id(), session_id = %session_id, "Starting initial analysis");

        let pending = PendingAnalysis::load(&context, Vec::new()).await?;
        let analysis = match pending.send(self.analyzer.as_ref()).await {
            Ok(analysis) => analysis,
            Err(e) => {
                return recover_from_failure(
                    &context,
                    e,
                    AssessmentStep::SymptomEntry,
                    INITIAL_FAILURE_MESSAGE,
                )
                .await;
            }
        };

        let outcome = AnalysisOutcome::classify(analysis);
        context.remove(session_keys::CLARIFYING_QUIZ).await;
        context.remove(session_keys::QUESTION_ANSWERS).await;

        let status_message = match &outcome {
            AnalysisOutcome::FinalReport(analysis) => {
                context.set(session_keys::FINAL_ANALYSIS, analysis).await;
                "Initial analysis is final, preparing report".to_string()
            }
            AnalysisOutcome::NeedsClarification { questions, .. } => {
                context.remove(session_keys::FINAL_ANALYSIS).await;
                format!(
                    "Initial analysis needs {} clarifying answers",
                    questions.len()
                )
            }
        };

        info!(
            task_id = %self.id(),
            needs_clarification = outcome.needs_clarification(),
            risk = %outcome.analysis().risk_score,
            "Initial analysis complete"
        );
        context.set(session_keys::INITIAL_OUTCOME, outcome).await;

        Ok(TaskResult::new_with_status(
            None,
            NextAction::ContinueAndExecute,
            Some(status_message),
        ))
    }
}
