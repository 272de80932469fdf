use async_trait::async_trait;
use graph_flow::{Context, GraphError, NextAction, Result, Task, TaskResult};
use tracing::info;

use super::types::{AssessmentStep, WizardEvent, session_keys, task_ids};
use super::utils::{rejected, take_event};
use crate::models::AnalysisOutcome;
use crate::quiz::{ClarifyingQuiz, QuizError};

/// Asks the clarifying questions from the first pass, one at a time.
pub struct ClarifyingQuizTask;

fn invalid(err: QuizError) -> GraphError {
    GraphError::InvalidInput(err.to_string())
}

/// The quiz in progress, or a fresh one built from the first-pass questions.
async fn load_quiz(context: &Context) -> Result<ClarifyingQuiz> {
    if let Some(quiz) = context.get(session_keys::CLARIFYING_QUIZ).await {
        return Ok(quiz);
    }

    let outcome: AnalysisOutcome = context
        .get(session_keys::INITIAL_OUTCOME)
        .await
        .ok_or_else(|| GraphError::ContextError("initial analysis not found".to_string()))?;

    match outcome {
        AnalysisOutcome::NeedsClarification { questions, .. } => ClarifyingQuiz::new(questions)
            .map_err(|e| GraphError::ContextError(e.to_string())),
        AnalysisOutcome::FinalReport(_) => Err(GraphError::ContextError(
            "initial analysis has no clarifying questions".to_string(),
        )),
    }
}

#[async_trait]
impl Task for ClarifyingQuizTask {
    fn id(&self) -> &str {
        task_ids::CLARIFYING_QUIZ
    }

    async fn run(&self, context: Context) -> Result<TaskResult> {
        let mut quiz = load_quiz(&context).await?;

        match take_event(&context).await? {
            None => {}
            Some(WizardEvent::AnswerQuestion { answer }) => quiz.answer(&answer).map_err(invalid)?,
            Some(WizardEvent::PreviousQuestion) => quiz.previous().map_err(invalid)?,
            Some(WizardEvent::NextQuestion) => quiz.next().map_err(invalid)?,
            Some(WizardEvent::FinishQuiz | WizardEvent::Retry) => {
                let answers = quiz.finish().map_err(invalid)?;
                info!(
                    task_id = %self.id(),
                    answers = answers.len(),
                    "Clarifying questions answered, starting final analysis"
                );
                context.set(session_keys::QUESTION_ANSWERS, answers).await;
                context.remove(session_keys::LAST_ERROR).await;

                return Ok(TaskResult::new_with_status(
                    None,
                    NextAction::ContinueAndExecute,
                    Some("Answers collected, generating final report".to_string()),
                ));
            }
            Some(other) => return Err(rejected(&other, AssessmentStep::ClarifyingQuiz)),
        }

        context.set(session_keys::CLARIFYING_QUIZ, &quiz).await;

        let view = quiz.view();
        Ok(TaskResult::new_with_status(
            Some(format!(
                "Question {} of {}: {}",
                view.position, view.total, view.question.text
            )),
            NextAction::WaitForInput,
            Some("Waiting for clarifying answers".to_string()),
        ))
    }
}
