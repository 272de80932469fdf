use async_trait::async_trait;
use graph_flow::{Context, GraphError, NextAction, Result, Task, TaskResult};
use tracing::info;

use super::types::{AssessmentStep, session_keys, task_ids};
use super::utils::{rejected, take_event};
use crate::models::{HealthAnalysis, PatientProfile, QuestionAnswer, SymptomData};
use crate::report::{HealthReportView, ReportInputs};

/// Terminal step. Renders the final analysis; only a reset leaves it.
pub struct ReportViewTask;

#[async_trait]
impl Task for ReportViewTask {
    fn id(&self) -> &str {
        task_ids::REPORT_VIEW
    }

    async fn run(&self, context: Context) -> Result<TaskResult> {
        if let Some(event) = take_event(&context).await? {
            return Err(rejected(&event, AssessmentStep::ReportView));
        }

        let analysis: HealthAnalysis = context
            .get(session_keys::FINAL_ANALYSIS)
            .await
            .ok_or_else(|| GraphError::ContextError("final analysis not found".to_string()))?;
        let profile: PatientProfile = context
            .get(session_keys::PROFILE)
            .await
            .unwrap_or_default();
        let symptoms: SymptomData = context
            .get(session_keys::SYMPTOMS)
            .await
            .unwrap_or_default();
        let answers: Vec<QuestionAnswer> = context
            .get(session_keys::QUESTION_ANSWERS)
            .await
            .unwrap_or_default();

        let report = HealthReportView::build(ReportInputs {
            analysis: &analysis,
            profile: &profile,
            symptoms: &symptoms,
            answers: &answers,
        });

        info!(
            task_id = %self.id(),
            risk = %analysis.risk_score,
            conditions = analysis.conditions.len(),
            "Report ready"
        );

        Ok(TaskResult::new_with_status(
            Some(report.to_markdown()),
            NextAction::End,
            Some("Assessment complete".to_string()),
        ))
    }
}
