use async_trait::async_trait;
use graph_flow::{Context, GraphError, NextAction, Result, Task, TaskResult};
use tracing::info;

use super::types::{AssessmentStep, WizardEvent, session_keys, task_ids};
use super::utils::{rejected, take_event};
use crate::models::SymptomData;

/// Second wizard step: symptom description, duration and severity.
/// Submitting starts the first analysis pass right away.
pub struct SymptomEntryTask;

#[async_trait]
impl Task for SymptomEntryTask {
    fn id(&self) -> &str {
        task_ids::SYMPTOM_ENTRY
    }

    async fn run(&self, context: Context) -> Result<TaskResult> {
        let symptoms = match take_event(&context).await? {
            None => {
                return Ok(TaskResult::new_with_status(
                    Some("Describe the symptoms, how long they have lasted and how severe they are.".to_string()),
                    NextAction::WaitForInput,
                    Some("Waiting for symptom details".to_string()),
                ));
            }
            Some(WizardEvent::Back) => {
                return Ok(TaskResult::new_with_status(
                    None,
                    NextAction::GoBack,
                    Some("Returned to patient information".to_string()),
                ));
            }
            Some(WizardEvent::SubmitSymptoms { symptoms }) => symptoms,
            Some(WizardEvent::Retry) => context
                .get::<SymptomData>(session_keys::SYMPTOMS)
                .await
                .ok_or_else(|| {
                    GraphError::InvalidInput("there is no earlier submission to retry".to_string())
                })?,
            Some(other) => return Err(rejected(&other, AssessmentStep::SymptomEntry)),
        };

        if symptoms.description.trim().is_empty() {
            return Err(GraphError::InvalidInput(
                "a symptom description is required".to_string(),
            ));
        }

        info!(
            task_id = %self.id(),
            severity = %symptoms.severity,
            "Symptoms submitted, starting initial analysis"
        );
        context.set(session_keys::SYMPTOMS, symptoms).await;
        context.remove(session_keys::LAST_ERROR).await;

        Ok(TaskResult::new_with_status(
            None,
            NextAction::ContinueAndExecute,
            Some("Symptoms saved, analyzing".to_string()),
        ))
    }
}
