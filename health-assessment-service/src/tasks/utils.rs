use graph_flow::{Context, GraphError, NextAction, TaskResult};
use tracing::{error, warn};

use super::types::{AssessmentStep, FlowError, WizardEvent, session_keys};
use crate::analysis::{AnalysisError, AnalysisRequest, Attachment, HealthAnalyzer};
use crate::models::{HealthAnalysis, Language, PatientProfile, QuestionAnswer, SymptomData};

/// Take the pending event out of the context so it is handled exactly once.
pub async fn take_event(context: &Context) -> Result<Option<WizardEvent>, GraphError> {
    match context.remove(session_keys::EVENT).await {
        None => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| GraphError::InvalidInput(format!("malformed event: {e}"))),
    }
}

pub fn rejected(event: &WizardEvent, step: AssessmentStep) -> GraphError {
    warn!(event = event.name(), step = %step, "Event not accepted at this step");
    GraphError::InvalidInput(format!(
        "{} is not accepted at step {}",
        event.name(),
        step
    ))
}

/// Inputs of one analysis pass, gathered from the session.
pub struct PendingAnalysis {
    request: AnalysisRequest,
    attachment: Option<Attachment>,
}

impl PendingAnalysis {
    pub async fn load(
        context: &Context,
        previous_answers: Vec<QuestionAnswer>,
    ) -> Result<Self, GraphError> {
        let symptoms: SymptomData = context
            .get(session_keys::SYMPTOMS)
            .await
            .ok_or_else(|| GraphError::ContextError("symptoms not found in context".to_string()))?;
        let profile: PatientProfile = context
            .get(session_keys::PROFILE)
            .await
            .unwrap_or_default();
        let language: Language = context
            .get(session_keys::LANGUAGE)
            .await
            .unwrap_or_default();

        Ok(Self {
            request: AnalysisRequest {
                symptoms,
                profile,
                language,
                file: None,
                previous_answers,
            },
            attachment: context.get(session_keys::ATTACHMENT).await,
        })
    }

    /// Encode the attachment, if any, then make the call.
    pub async fn send(
        mut self,
        analyzer: &dyn HealthAnalyzer,
    ) -> Result<HealthAnalysis, AnalysisError> {
        if let Some(attachment) = &self.attachment {
            self.request.file = Some(attachment.to_inline_file().await?);
        }
        analyzer.analyze(&self.request).await
    }
}

/// Turn a failed analysis into the error overlay and send the user back to `retry_step`.
/// Fatal failures end the step instead.
pub async fn recover_from_failure(
    context: &Context,
    err: AnalysisError,
    retry_step: AssessmentStep,
    message: &str,
) -> Result<TaskResult, GraphError> {
    if err.is_fatal() {
        error!(error = %err, "Fatal analysis failure");
        return Err(GraphError::TaskExecutionFailed(err.to_string()));
    }

    error!(error = %err, retry_step = %retry_step, "Analysis failed, returning to input step");
    context
        .set(
            session_keys::LAST_ERROR,
            FlowError {
                message: message.to_string(),
                retry_step,
            },
        )
        .await;

    Ok(TaskResult::new_with_status(
        Some(message.to_string()),
        NextAction::GoTo(retry_step.task_id().to_string()),
        Some(format!("Analysis failed: {err}")),
    ))
}
