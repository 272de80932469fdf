use graph_flow::{FlowRunner, Graph, GraphBuilder, GraphError, Session, SessionStorage};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::analysis::HealthAnalyzer;
use crate::models::{AnalysisOutcome, Language, PatientProfile};
use crate::tasks::*;

pub const WORKFLOW_ID: &str = "health_assessment";

pub fn build_assessment_workflow(analyzer: Arc<dyn HealthAnalyzer>) -> Graph {
    GraphBuilder::new(WORKFLOW_ID)
        .add_task(Arc::new(ProfileEntryTask))
        .add_task(Arc::new(SymptomEntryTask))
        .add_task(Arc::new(InitialAnalysisTask::new(analyzer.clone())))
        .add_task(Arc::new(ClarifyingQuizTask))
        .add_task(Arc::new(FinalAnalysisTask::new(analyzer)))
        .add_task(Arc::new(ReportViewTask))
        .add_edge(task_ids::PROFILE_ENTRY, task_ids::SYMPTOM_ENTRY)
        .add_edge(task_ids::SYMPTOM_ENTRY, task_ids::ANALYZING_INITIAL)
        .add_conditional_edge(
            task_ids::ANALYZING_INITIAL,
            |context| {
                context
                    .get_sync::<AnalysisOutcome>(session_keys::INITIAL_OUTCOME)
                    .is_some_and(|outcome| outcome.needs_clarification())
            },
            task_ids::CLARIFYING_QUIZ,
            task_ids::REPORT_VIEW,
        )
        .add_edge(task_ids::CLARIFYING_QUIZ, task_ids::ANALYZING_FINAL)
        .add_edge(task_ids::ANALYZING_FINAL, task_ids::REPORT_VIEW)
        .build()
}

/// A fresh session resting on the profile step, disclaimer not yet accepted.
pub async fn create_assessment_session(language: Language) -> Session {
    let session_id = Uuid::new_v4().to_string();
    let mut session = Session::new_from_task(session_id.clone(), task_ids::PROFILE_ENTRY);
    session.graph_id = WORKFLOW_ID.to_string();

    session.context.set(session_keys::SESSION_ID, &session_id).await;
    session.context.set(session_keys::LANGUAGE, language).await;
    session
        .context
        .set(session_keys::DISCLAIMER_ACCEPTED, false)
        .await;

    session
}

pub fn create_flow_runner(
    session_storage: Arc<dyn SessionStorage>,
    analyzer: Arc<dyn HealthAnalyzer>,
) -> FlowRunner {
    let graph = Arc::new(build_assessment_workflow(analyzer));
    FlowRunner::new(graph, session_storage)
}

/// Start over from the profile step. Language and disclaimer acceptance
/// survive; the profile survives only with the patient's consent.
pub async fn reset_assessment(session: &mut Session) {
    let keep_profile = session
        .context
        .get::<PatientProfile>(session_keys::PROFILE)
        .await
        .is_some_and(|profile| profile.store_session);

    for key in [
        session_keys::EVENT,
        session_keys::SYMPTOMS,
        session_keys::ATTACHMENT,
        session_keys::INITIAL_OUTCOME,
        session_keys::CLARIFYING_QUIZ,
        session_keys::QUESTION_ANSWERS,
        session_keys::FINAL_ANALYSIS,
        session_keys::LAST_ERROR,
    ] {
        session.context.remove(key).await;
    }
    if !keep_profile {
        session.context.remove(session_keys::PROFILE).await;
    }

    session.restart_at(task_ids::PROFILE_ENTRY);
    info!(session_id = %session.id, keep_profile, "Assessment reset");
}

pub fn current_step(session: &Session) -> Result<AssessmentStep, GraphError> {
    AssessmentStep::from_task_id(&session.current_task_id)
        .ok_or_else(|| GraphError::TaskNotFound(session.current_task_id.clone()))
}

/// The step to report while `event` is being processed from `resting`.
/// Submissions that trigger an analysis call show the analyzing step.
pub fn pending_step(resting: AssessmentStep, event: &WizardEvent) -> AssessmentStep {
    match (resting, event) {
        (
            AssessmentStep::SymptomEntry,
            WizardEvent::SubmitSymptoms { .. } | WizardEvent::Retry,
        ) => AssessmentStep::AnalyzingInitial,
        (AssessmentStep::ClarifyingQuiz, WizardEvent::FinishQuiz | WizardEvent::Retry) => {
            AssessmentStep::AnalyzingFinal
        }
        (step, _) => step,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalysisError;
    use crate::analysis::testing::ScriptedAnalyzer;
    use crate::models::{HealthAnalysis, Severity, SymptomData, fixtures};
    use graph_flow::{ExecutionResult, ExecutionStatus, InMemorySessionStorage};

    struct Harness {
        storage: Arc<InMemorySessionStorage>,
        analyzer: Arc<ScriptedAnalyzer>,
        runner: FlowRunner,
        session_id: String,
    }

    impl Harness {
        async fn new(replies: Vec<Result<HealthAnalysis, AnalysisError>>) -> Self {
            let storage = Arc::new(InMemorySessionStorage::new());
            let analyzer = Arc::new(ScriptedAnalyzer::new(replies));
            let runner = create_flow_runner(storage.clone(), analyzer.clone());
            let session = create_assessment_session(Language::English).await;
            let session_id = session.id.clone();
            storage.save(session).await.unwrap();
            Self {
                storage,
                analyzer,
                runner,
                session_id,
            }
        }

        async fn session(&self) -> Session {
            self.storage.get(&self.session_id).await.unwrap().unwrap()
        }

        async fn send(&self, event: WizardEvent) -> graph_flow::Result<ExecutionResult> {
            let session = self.session().await;
            session.context.set(session_keys::EVENT, event).await;
            self.storage.save(session).await.unwrap();
            self.runner.run(&self.session_id).await
        }

        async fn step(&self) -> AssessmentStep {
            current_step(&self.session().await).unwrap()
        }

        async fn submit_profile(&self, profile: PatientProfile) {
            self.send(WizardEvent::SubmitProfile { profile }).await.unwrap();
        }

        async fn submit_fever(&self) -> graph_flow::Result<ExecutionResult> {
            self.send(WizardEvent::SubmitSymptoms {
                symptoms: SymptomData {
                    description: "fever".to_string(),
                    duration: "2 days".to_string(),
                    severity: Severity::Mild,
                },
            })
            .await
        }
    }

    #[tokio::test]
    async fn final_first_pass_goes_straight_to_report() {
        let reply = fixtures::analysis(true, 0);
        let harness = Harness::new(vec![Ok(reply.clone())]).await;

        harness.submit_profile(PatientProfile::default()).await;
        assert_eq!(harness.step().await, AssessmentStep::SymptomEntry);

        let result = harness.submit_fever().await.unwrap();
        assert_eq!(result.status, ExecutionStatus::Completed);
        assert!(result.response.unwrap().contains("Viral fever"));
        assert_eq!(harness.step().await, AssessmentStep::ReportView);

        let session = harness.session().await;
        let rendered: HealthAnalysis = session
            .context
            .get(session_keys::FINAL_ANALYSIS)
            .await
            .unwrap();
        assert_eq!(rendered, reply);
        assert!(!session.context.contains_key(session_keys::CLARIFYING_QUIZ));

        let requests = harness.analyzer.requests();
        assert_eq!(requests.len(), 1);
        assert!(!requests[0].is_follow_up());
        assert_eq!(requests[0].symptoms.description, "fever");
    }

    #[tokio::test]
    async fn final_flag_with_questions_skips_the_quiz() {
        let harness = Harness::new(vec![Ok(fixtures::analysis(true, 4))]).await;
        harness.submit_profile(PatientProfile::default()).await;
        harness.submit_fever().await.unwrap();
        assert_eq!(harness.step().await, AssessmentStep::ReportView);
    }

    #[tokio::test]
    async fn clarifying_round_asks_every_question_in_order() {
        let harness = Harness::new(vec![
            Ok(fixtures::analysis(false, 3)),
            Ok(fixtures::analysis(true, 0)),
        ])
        .await;
        harness.submit_profile(PatientProfile::default()).await;

        let result = harness.submit_fever().await.unwrap();
        assert_eq!(result.status, ExecutionStatus::WaitingForInput);
        assert_eq!(result.response.as_deref(), Some("Question 1 of 3: Question 1?"));
        assert_eq!(harness.step().await, AssessmentStep::ClarifyingQuiz);

        for (position, answer) in ["Yes", "No", "Yes"].into_iter().enumerate() {
            let result = harness
                .send(WizardEvent::AnswerQuestion {
                    answer: answer.to_string(),
                })
                .await
                .unwrap();
            let shown = (position + 2).min(3);
            assert_eq!(
                result.response,
                Some(format!("Question {shown} of 3: Question {shown}?"))
            );
        }
        assert_eq!(harness.analyzer.requests().len(), 1);

        let result = harness.send(WizardEvent::FinishQuiz).await.unwrap();
        assert_eq!(result.status, ExecutionStatus::Completed);

        let requests = harness.analyzer.requests();
        assert_eq!(requests.len(), 2);
        let answers = &requests[1].previous_answers;
        assert_eq!(
            answers.iter().map(|a| a.question_id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(
            answers.iter().map(|a| a.answer.as_str()).collect::<Vec<_>>(),
            vec!["Yes", "No", "Yes"]
        );
    }

    #[tokio::test]
    async fn finishing_early_is_rejected() {
        let harness = Harness::new(vec![Ok(fixtures::analysis(false, 2))]).await;
        harness.submit_profile(PatientProfile::default()).await;
        harness.submit_fever().await.unwrap();

        harness
            .send(WizardEvent::AnswerQuestion {
                answer: "Yes".to_string(),
            })
            .await
            .unwrap();
        let err = harness.send(WizardEvent::FinishQuiz).await.unwrap_err();
        assert!(matches!(err, GraphError::InvalidInput(_)));
        assert_eq!(harness.step().await, AssessmentStep::ClarifyingQuiz);
        assert_eq!(harness.analyzer.requests().len(), 1);
    }

    #[tokio::test]
    async fn back_from_symptoms_returns_to_profile() {
        let harness = Harness::new(vec![]).await;
        harness.submit_profile(PatientProfile::default()).await;
        harness.send(WizardEvent::Back).await.unwrap();
        assert_eq!(harness.step().await, AssessmentStep::ProfileEntry);
    }

    #[tokio::test]
    async fn blank_symptoms_are_rejected_without_a_call() {
        let harness = Harness::new(vec![]).await;
        harness.submit_profile(PatientProfile::default()).await;
        let err = harness
            .send(WizardEvent::SubmitSymptoms {
                symptoms: SymptomData {
                    description: "   ".to_string(),
                    ..SymptomData::default()
                },
            })
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::InvalidInput(_)));
        assert!(harness.analyzer.requests().is_empty());
    }

    #[tokio::test]
    async fn failed_first_pass_shows_error_and_retry_recovers() {
        let harness = Harness::new(vec![
            Err(AnalysisError::Status {
                status: 503,
                body: "overloaded".to_string(),
            }),
            Ok(fixtures::analysis(true, 0)),
        ])
        .await;
        harness.submit_profile(PatientProfile::default()).await;

        let result = harness.submit_fever().await.unwrap();
        assert_eq!(result.response.as_deref(), Some(INITIAL_FAILURE_MESSAGE));
        assert_eq!(harness.step().await, AssessmentStep::SymptomEntry);

        let session = harness.session().await;
        let overlay: FlowError = session.context.get(session_keys::LAST_ERROR).await.unwrap();
        assert_eq!(overlay.retry_step, AssessmentStep::SymptomEntry);
        let kept: SymptomData = session.context.get(session_keys::SYMPTOMS).await.unwrap();
        assert_eq!(kept.description, "fever");

        let result = harness.send(WizardEvent::Retry).await.unwrap();
        assert_eq!(result.status, ExecutionStatus::Completed);
        assert!(
            !harness
                .session()
                .await
                .context
                .contains_key(session_keys::LAST_ERROR)
        );
    }

    #[tokio::test]
    async fn failed_second_pass_keeps_answers_for_retry() {
        let harness = Harness::new(vec![
            Ok(fixtures::analysis(false, 1)),
            Err(AnalysisError::EmptyResponse),
            Ok(fixtures::analysis(true, 0)),
        ])
        .await;
        harness.submit_profile(PatientProfile::default()).await;
        harness.submit_fever().await.unwrap();
        harness
            .send(WizardEvent::AnswerQuestion {
                answer: "No".to_string(),
            })
            .await
            .unwrap();

        let result = harness.send(WizardEvent::FinishQuiz).await.unwrap();
        assert_eq!(result.response.as_deref(), Some(FINAL_FAILURE_MESSAGE));
        assert_eq!(harness.step().await, AssessmentStep::ClarifyingQuiz);

        let result = harness.send(WizardEvent::Retry).await.unwrap();
        assert_eq!(result.status, ExecutionStatus::Completed);

        let requests = harness.analyzer.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[2].previous_answers, requests[1].previous_answers);
        assert_eq!(requests[2].previous_answers[0].answer, "No");
    }

    #[tokio::test]
    async fn missing_credentials_fail_the_step() {
        let harness = Harness::new(vec![Err(AnalysisError::MissingCredentials)]).await;
        harness.submit_profile(PatientProfile::default()).await;

        let err = harness.submit_fever().await.unwrap_err();
        assert!(matches!(err, GraphError::TaskExecutionFailed(_)));
        assert_eq!(harness.step().await, AssessmentStep::SymptomEntry);
    }

    #[tokio::test]
    async fn report_accepts_no_events() {
        let harness = Harness::new(vec![Ok(fixtures::analysis(true, 0))]).await;
        harness.submit_profile(PatientProfile::default()).await;
        harness.submit_fever().await.unwrap();

        let err = harness.send(WizardEvent::Back).await.unwrap_err();
        assert!(matches!(err, GraphError::InvalidInput(_)));
        assert_eq!(harness.step().await, AssessmentStep::ReportView);
    }

    #[tokio::test]
    async fn reset_clears_profile_without_consent() {
        let harness = Harness::new(vec![Ok(fixtures::analysis(true, 0))]).await;
        harness
            .submit_profile(PatientProfile {
                name: Some("Asha".to_string()),
                age: Some("41".to_string()),
                contact: Some("asha@example.com".to_string()),
                ..PatientProfile::default()
            })
            .await;
        harness.submit_fever().await.unwrap();

        let mut session = harness.session().await;
        session.context.set(session_keys::LANGUAGE, Language::Hindi).await;
        reset_assessment(&mut session).await;

        assert_eq!(current_step(&session).unwrap(), AssessmentStep::ProfileEntry);
        assert!(session.history.is_empty());
        for key in [
            session_keys::PROFILE,
            session_keys::SYMPTOMS,
            session_keys::INITIAL_OUTCOME,
            session_keys::FINAL_ANALYSIS,
        ] {
            assert!(!session.context.contains_key(key), "{key} survived reset");
        }
        let language: Language = session.context.get(session_keys::LANGUAGE).await.unwrap();
        assert_eq!(language, Language::Hindi);
    }

    #[tokio::test]
    async fn reset_keeps_profile_with_consent() {
        let harness = Harness::new(vec![]).await;
        let profile = PatientProfile {
            name: Some("Asha".to_string()),
            store_session: true,
            ..PatientProfile::default()
        };
        harness.submit_profile(profile.clone()).await;

        let mut session = harness.session().await;
        reset_assessment(&mut session).await;
        let kept: PatientProfile = session.context.get(session_keys::PROFILE).await.unwrap();
        assert_eq!(kept, profile);
    }

    #[test]
    fn analysis_submissions_report_the_analyzing_step() {
        let submit = WizardEvent::SubmitSymptoms {
            symptoms: SymptomData::default(),
        };
        assert_eq!(
            pending_step(AssessmentStep::SymptomEntry, &submit),
            AssessmentStep::AnalyzingInitial
        );
        assert_eq!(
            pending_step(AssessmentStep::ClarifyingQuiz, &WizardEvent::FinishQuiz),
            AssessmentStep::AnalyzingFinal
        );
        assert_eq!(
            pending_step(AssessmentStep::ClarifyingQuiz, &WizardEvent::NextQuestion),
            AssessmentStep::ClarifyingQuiz
        );
    }
}
