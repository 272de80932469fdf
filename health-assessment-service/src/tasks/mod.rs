pub mod clarifying_quiz;
pub mod final_analysis;
pub mod initial_analysis;
pub mod profile_entry;
pub mod report_view;
pub mod symptom_entry;
pub mod types;
pub mod utils;

pub use clarifying_quiz::ClarifyingQuizTask;
pub use final_analysis::{FINAL_FAILURE_MESSAGE, FinalAnalysisTask};
pub use initial_analysis::{INITIAL_FAILURE_MESSAGE, InitialAnalysisTask};
pub use profile_entry::ProfileEntryTask;
pub use report_view::ReportViewTask;
pub use symptom_entry::SymptomEntryTask;
pub use types::{AssessmentStep, FlowError, WizardEvent, session_keys, task_ids};
