//! Client side of the generative-AI analysis call.
//!
//! One request per pass: the first pass asks for an initial analysis plus
//! clarifying questions, the second pass adds the patient's answers and asks
//! for the final report. There is no retry; a failed call is reported to the
//! caller as is.

pub mod attachment;
pub mod gemini;
pub mod prompt;
pub mod schema;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{HealthAnalysis, Language, PatientProfile, QuestionAnswer, SymptomData};

pub use attachment::{Attachment, AttachmentError, InlineFile};
pub use gemini::GeminiAnalyzer;

/// Everything one analysis pass needs.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub symptoms: SymptomData,
    pub profile: PatientProfile,
    pub language: Language,
    pub file: Option<InlineFile>,
    /// Answers to clarifying questions; non-empty only on the second pass.
    pub previous_answers: Vec<QuestionAnswer>,
}

impl AnalysisRequest {
    pub fn is_follow_up(&self) -> bool {
        !self.previous_answers.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("API key is missing")]
    MissingCredentials,

    #[error("request to analysis service failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("analysis service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("no response from AI")]
    EmptyResponse,

    #[error("AI response is not a valid analysis: {0}")]
    InvalidResponse(#[from] serde_json::Error),

    #[error(transparent)]
    Attachment(#[from] AttachmentError),
}

impl AnalysisError {
    /// Fatal errors end the step instead of returning the user to the form.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AnalysisError::MissingCredentials)
    }
}

/// Seam between the workflow and the model provider.
#[async_trait]
pub trait HealthAnalyzer: Send + Sync {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<HealthAnalysis, AnalysisError>;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned replies in order and records every request it receives.
    #[derive(Default)]
    pub struct ScriptedAnalyzer {
        replies: Mutex<VecDeque<Result<HealthAnalysis, AnalysisError>>>,
        requests: Mutex<Vec<AnalysisRequest>>,
    }

    impl ScriptedAnalyzer {
        pub fn new(replies: Vec<Result<HealthAnalysis, AnalysisError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::default(),
            }
        }

        pub fn requests(&self) -> Vec<AnalysisRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HealthAnalyzer for ScriptedAnalyzer {
        async fn analyze(
            &self,
            request: &AnalysisRequest,
        ) -> Result<HealthAnalysis, AnalysisError> {
            self.requests.lock().unwrap().push(request.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(AnalysisError::EmptyResponse))
        }
    }
}
