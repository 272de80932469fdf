use async_trait::async_trait;
use graph_flow::{Context, NextAction, Result, Task, TaskResult};
use tracing::info;

use super::types::{AssessmentStep, WizardEvent, session_keys, task_ids};
use super::utils::{rejected, take_event};

/// First wizard step: optional patient demographics.
pub struct ProfileEntryTask;

#[async_trait]
impl Task for ProfileEntryTask {
    fn id(&self) -> &str {
        task_ids::PROFILE_ENTRY
    }

    async fn run(&self, context: Context) -> Result<TaskResult> {
        match take_event(&context).await? {
            None => Ok(TaskResult::new_with_status(
                Some("Tell us about the patient. Every field is optional.".to_string()),
                NextAction::WaitForInput,
                Some("Waiting for patient information".to_string()),
            )),
            Some(WizardEvent::SubmitProfile { profile }) => {
                info!(
                    task_id = %self.id(),
                    store_session = profile.store_session,
                    "Patient profile submitted"
                );
                context.set(session_keys::PROFILE, profile).await;
                context.remove(session_keys::LAST_ERROR).await;

                Ok(TaskResult::new_with_status(
                    Some("Describe the symptoms.".to_string()),
                    NextAction::Continue,
                    Some("Patient information saved".to_string()),
                ))
            }
            Some(other) => Err(rejected(&other, AssessmentStep::ProfileEntry)),
        }
    }
}
