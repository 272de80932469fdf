use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{PatientProfile, SymptomData};

pub mod session_keys {
    pub const SESSION_ID: &str = "session_id";
    /// Pending user input for the current step; consumed by the step.
    pub const EVENT: &str = "event";
    pub const DISCLAIMER_ACCEPTED: &str = "disclaimer_accepted";
    pub const LANGUAGE: &str = "language";
    pub const PROFILE: &str = "profile";
    pub const SYMPTOMS: &str = "symptoms";
    pub const ATTACHMENT: &str = "attachment";
    pub const INITIAL_OUTCOME: &str = "initial_outcome";
    pub const CLARIFYING_QUIZ: &str = "clarifying_quiz";
    pub const QUESTION_ANSWERS: &str = "question_answers";
    pub const FINAL_ANALYSIS: &str = "final_analysis";
    pub const LAST_ERROR: &str = "last_error";
}

/// Ids of the workflow tasks; each one is a wizard step.
pub mod task_ids {
    pub const PROFILE_ENTRY: &str = "profile_entry";
    pub const SYMPTOM_ENTRY: &str = "symptom_entry";
    pub const ANALYZING_INITIAL: &str = "analyzing_initial";
    pub const CLARIFYING_QUIZ: &str = "clarifying_quiz";
    pub const ANALYZING_FINAL: &str = "analyzing_final";
    pub const REPORT_VIEW: &str = "report_view";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentStep {
    ProfileEntry,
    SymptomEntry,
    AnalyzingInitial,
    ClarifyingQuiz,
    AnalyzingFinal,
    ReportView,
}

impl AssessmentStep {
    pub fn task_id(self) -> &'static str {
        match self {
            AssessmentStep::ProfileEntry => task_ids::PROFILE_ENTRY,
            AssessmentStep::SymptomEntry => task_ids::SYMPTOM_ENTRY,
            AssessmentStep::AnalyzingInitial => task_ids::ANALYZING_INITIAL,
            AssessmentStep::ClarifyingQuiz => task_ids::CLARIFYING_QUIZ,
            AssessmentStep::AnalyzingFinal => task_ids::ANALYZING_FINAL,
            AssessmentStep::ReportView => task_ids::REPORT_VIEW,
        }
    }

    pub fn from_task_id(task_id: &str) -> Option<Self> {
        [
            AssessmentStep::ProfileEntry,
            AssessmentStep::SymptomEntry,
            AssessmentStep::AnalyzingInitial,
            AssessmentStep::ClarifyingQuiz,
            AssessmentStep::AnalyzingFinal,
            AssessmentStep::ReportView,
        ]
        .into_iter()
        .find(|step| step.task_id() == task_id)
    }
}

impl fmt::Display for AssessmentStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.task_id())
    }
}

/// User input for the wizard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WizardEvent {
    SubmitProfile { profile: PatientProfile },
    SubmitSymptoms { symptoms: SymptomData },
    Back,
    AnswerQuestion { answer: String },
    PreviousQuestion,
    NextQuestion,
    FinishQuiz,
    /// Repeat the analysis call that last failed.
    Retry,
}

impl WizardEvent {
    pub fn name(&self) -> &'static str {
        match self {
            WizardEvent::SubmitProfile { .. } => "submit_profile",
            WizardEvent::SubmitSymptoms { .. } => "submit_symptoms",
            WizardEvent::Back => "back",
            WizardEvent::AnswerQuestion { .. } => "answer_question",
            WizardEvent::PreviousQuestion => "previous_question",
            WizardEvent::NextQuestion => "next_question",
            WizardEvent::FinishQuiz => "finish_quiz",
            WizardEvent::Retry => "retry",
        }
    }
}

/// Error overlay shown after a failed analysis call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowError {
    pub message: String,
    /// Step the user was returned to; `retry` is accepted there.
    pub retry_step: AssessmentStep,
}
