use axum::{
    Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
};
use chrono::Utc;
use dashmap::{DashMap, mapref::entry::Entry};
use graph_flow::{ExecutionStatus, FlowRunner, GraphError, Session, SessionStorage};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::{
    analysis::{Attachment, AttachmentError, HealthAnalyzer, attachment::MAX_ATTACHMENT_BYTES},
    models::{HealthAnalysis, Language, PatientProfile, QuestionAnswer, SymptomData},
    quiz::{ClarifyingQuiz, QuestionView},
    report::{
        HealthReportView, ReportInputs,
        concept_map::{ConceptNode, concept_tree, render_svg},
        infographic::InfographicView,
        pdf::{render_pdf, report_file_name},
        study::{FlashcardView, QuizGrade, QuizSelections, flashcard_at, grade_quiz},
    },
    tasks::{AssessmentStep, FlowError, WizardEvent, session_keys},
    workflow::{
        create_assessment_session, create_flow_runner, current_step, pending_step,
        reset_assessment,
    },
};

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<Value>)>;
type ApiError = (StatusCode, Json<Value>);

fn bad_request_error(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn not_found_error(message: &str, id: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": message,
            "session_id": id
        })),
    )
}

fn forbidden_error(message: &str) -> ApiError {
    (StatusCode::FORBIDDEN, Json(json!({ "error": message })))
}

fn conflict_error(message: &str, step: AssessmentStep) -> ApiError {
    (
        StatusCode::CONFLICT,
        Json(json!({
            "error": message,
            "step": step
        })),
    )
}

fn unprocessable_error(message: &str) -> ApiError {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "error": message })),
    )
}

fn internal_error(message: &str, details: &str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": message,
            "details": details
        })),
    )
}

fn step_error(session_id: &str, err: GraphError) -> ApiError {
    match err {
        GraphError::InvalidInput(message) => unprocessable_error(&message),
        GraphError::SessionNotFound(_) => not_found_error("Session not found", session_id),
        other => {
            error!(session_id = %session_id, error = %other, "Assessment step failed");
            internal_error("Failed to run assessment step", &other.to_string())
        }
    }
}

fn attachment_error(err: AttachmentError) -> ApiError {
    match err {
        AttachmentError::TooLarge { .. } => (
            StatusCode::PAYLOAD_TOO_LARGE,
            Json(json!({ "error": err.to_string() })),
        ),
        AttachmentError::Encoding(details) => internal_error("Failed to read attachment", &details),
        other => unprocessable_error(&other.to_string()),
    }
}

#[derive(Clone)]
pub struct AppState {
    pub session_storage: Arc<dyn SessionStorage>,
    pub flow_runner: FlowRunner,
    /// Sessions with a step in progress, and the step to report meanwhile.
    in_flight: Arc<DashMap<String, AssessmentStep>>,
}

impl AppState {
    pub fn new(session_storage: Arc<dyn SessionStorage>, analyzer: Arc<dyn HealthAnalyzer>) -> Self {
        let flow_runner = create_flow_runner(session_storage.clone(), analyzer);
        Self {
            session_storage,
            flow_runner,
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// Claim the session for one step. The claim is released when the guard drops.
    fn begin_step(&self, session_id: &str, step: AssessmentStep) -> Result<StepGuard, ApiError> {
        match self.in_flight.entry(session_id.to_string()) {
            Entry::Occupied(entry) => {
                warn!(session_id = %session_id, step = %entry.get(), "Step already in progress");
                Err(conflict_error(
                    "A step is already in progress for this session",
                    *entry.get(),
                ))
            }
            Entry::Vacant(entry) => {
                entry.insert(step);
                Ok(StepGuard {
                    in_flight: self.in_flight.clone(),
                    session_id: session_id.to_string(),
                })
            }
        }
    }

    fn in_flight_step(&self, session_id: &str) -> Option<AssessmentStep> {
        self.in_flight.get(session_id).map(|entry| *entry)
    }
}

struct StepGuard {
    in_flight: Arc<DashMap<String, AssessmentStep>>,
    session_id: String,
}

impl Drop for StepGuard {
    fn drop(&mut self) {
        self.in_flight.remove(&self.session_id);
    }
}

pub fn create_app(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/assessments", post(create_assessment))
        .route("/assessments/{session_id}", get(get_assessment))
        .route("/assessments/{session_id}/disclaimer", post(accept_disclaimer))
        .route("/assessments/{session_id}/language", put(set_language))
        .route(
            "/assessments/{session_id}/attachment",
            put(upload_attachment)
                .delete(remove_attachment)
                .layer(DefaultBodyLimit::max(MAX_ATTACHMENT_BYTES + 1)),
        )
        .route("/assessments/{session_id}/events", post(apply_event))
        .route("/assessments/{session_id}/reset", post(reset))
        .route("/assessments/{session_id}/report", get(get_report))
        .route(
            "/assessments/{session_id}/report/concept-map.svg",
            get(get_concept_map),
        )
        .route(
            "/assessments/{session_id}/report/flashcards/{index}",
            get(get_flashcard),
        )
        .route(
            "/assessments/{session_id}/report/knowledge-quiz",
            post(grade_knowledge_quiz),
        )
        .route("/assessments/{session_id}/report.pdf", get(download_pdf))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "HealthAware Assessment Service",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Symptom-awareness assessment with AI analysis, clarifying questions and an educational report",
        "endpoints": {
            "POST /assessments": "Start a new assessment",
            "GET /assessments/{id}": "Current step and inputs",
            "POST /assessments/{id}/disclaimer": "Accept the disclaimer",
            "PUT /assessments/{id}/language": "Choose the report language",
            "PUT /assessments/{id}/attachment": "Attach an image or PDF",
            "DELETE /assessments/{id}/attachment": "Remove the attachment",
            "POST /assessments/{id}/events": "Submit input for the current step",
            "POST /assessments/{id}/reset": "Start over",
            "GET /assessments/{id}/report": "Health report and infographic",
            "GET /assessments/{id}/report/concept-map.svg": "Concept map",
            "GET /assessments/{id}/report/flashcards/{index}": "Flashcard",
            "POST /assessments/{id}/report/knowledge-quiz": "Grade the knowledge quiz",
            "GET /assessments/{id}/report.pdf": "Download the report",
            "GET /health": "Health check"
        }
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339()
    }))
}

#[derive(Debug, Serialize)]
pub struct AttachmentInfo {
    pub file_name: String,
    pub media_type: String,
    pub size: usize,
}

#[derive(Debug, Serialize)]
pub struct AssessmentState {
    pub session_id: String,
    pub step: AssessmentStep,
    pub in_flight: bool,
    pub disclaimer_accepted: bool,
    pub language: Language,
    pub profile: Option<PatientProfile>,
    pub symptoms: Option<SymptomData>,
    pub attachment: Option<AttachmentInfo>,
    pub error: Option<FlowError>,
    pub question: Option<QuestionView>,
    pub status_message: Option<String>,
}

async fn describe(state: &AppState, session: &Session) -> Result<AssessmentState, ApiError> {
    let context = &session.context;
    let stored_step = current_step(session)
        .map_err(|e| internal_error("Session is in an unknown step", &e.to_string()))?;
    let in_flight = state.in_flight_step(&session.id);

    let question = match stored_step {
        AssessmentStep::ClarifyingQuiz => context
            .get::<ClarifyingQuiz>(session_keys::CLARIFYING_QUIZ)
            .await
            .map(|quiz| quiz.view()),
        _ => None,
    };

    Ok(AssessmentState {
        session_id: session.id.clone(),
        step: in_flight.unwrap_or(stored_step),
        in_flight: in_flight.is_some(),
        disclaimer_accepted: context
            .get(session_keys::DISCLAIMER_ACCEPTED)
            .await
            .unwrap_or(false),
        language: context
            .get(session_keys::LANGUAGE)
            .await
            .unwrap_or_default(),
        profile: context.get(session_keys::PROFILE).await,
        symptoms: context.get(session_keys::SYMPTOMS).await,
        attachment: context
            .get::<Attachment>(session_keys::ATTACHMENT)
            .await
            .map(|a| AttachmentInfo {
                size: a.data.len(),
                file_name: a.file_name,
                media_type: a.media_type,
            }),
        error: context.get(session_keys::LAST_ERROR).await,
        question,
        status_message: session.status_message.clone(),
    })
}

async fn load_session(state: &AppState, session_id: &str) -> Result<Session, ApiError> {
    match state.session_storage.get(session_id).await {
        Ok(Some(session)) => Ok(session),
        Ok(None) => Err(not_found_error("Session not found", session_id)),
        Err(e) => {
            error!(session_id = %session_id, error = %e, "Failed to load session");
            Err(internal_error("Failed to load session", &e.to_string()))
        }
    }
}

/// Load a session whose disclaimer has been accepted.
async fn load_accepted_session(state: &AppState, session_id: &str) -> Result<Session, ApiError> {
    let session = load_session(state, session_id).await?;
    let accepted: bool = session
        .context
        .get(session_keys::DISCLAIMER_ACCEPTED)
        .await
        .unwrap_or(false);
    if !accepted {
        return Err(forbidden_error("The disclaimer must be accepted first"));
    }
    Ok(session)
}

async fn save_session(state: &AppState, session: Session) -> Result<(), ApiError> {
    state.session_storage.save(session).await.map_err(|e| {
        error!(error = %e, "Failed to save session");
        internal_error("Failed to save session", &e.to_string())
    })
}

async fn create_assessment(State(state): State<AppState>) -> ApiResult<AssessmentState> {
    let session = create_assessment_session(Language::default()).await;
    info!(session_id = %session.id, "Assessment created");

    let response = describe(&state, &session).await?;
    save_session(&state, session).await?;
    Ok(Json(response))
}

async fn get_assessment(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<AssessmentState> {
    let session = load_accepted_session(&state, &session_id).await?;
    Ok(Json(describe(&state, &session).await?))
}

async fn accept_disclaimer(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<AssessmentState> {
    let session = load_session(&state, &session_id).await?;
    session
        .context
        .set(session_keys::DISCLAIMER_ACCEPTED, true)
        .await;
    info!(session_id = %session_id, "Disclaimer accepted");

    let response = describe(&state, &session).await?;
    save_session(&state, session).await?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct LanguageRequest {
    language: Language,
}

async fn set_language(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<LanguageRequest>,
) -> ApiResult<AssessmentState> {
    let session = load_accepted_session(&state, &session_id).await?;
    let step = current_step(&session).map_err(|e| step_error(&session_id, e))?;
    let guard = state.begin_step(&session_id, step)?;

    session
        .context
        .set(session_keys::LANGUAGE, request.language)
        .await;
    info!(session_id = %session_id, language = %request.language, "Language changed");

    save_session(&state, session.clone()).await?;
    drop(guard);
    Ok(Json(describe(&state, &session).await?))
}

#[derive(Debug, Deserialize)]
struct AttachmentQuery {
    file_name: Option<String>,
}

async fn upload_attachment(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<AttachmentQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<AssessmentState> {
    let session = load_accepted_session(&state, &session_id).await?;
    let step = current_step(&session).map_err(|e| step_error(&session_id, e))?;
    if step != AssessmentStep::SymptomEntry {
        return Err(conflict_error(
            "Attachments can only be changed while entering symptoms",
            step,
        ));
    }
    let guard = state.begin_step(&session_id, step)?;

    let declared_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());
    let file_name = query.file_name.unwrap_or_else(|| "attachment".to_string());
    let attachment =
        Attachment::from_upload(file_name, declared_type, body.to_vec()).map_err(attachment_error)?;

    info!(
        session_id = %session_id,
        file_name = %attachment.file_name,
        media_type = %attachment.media_type,
        size = attachment.data.len(),
        "Attachment stored"
    );
    session
        .context
        .set(session_keys::ATTACHMENT, &attachment)
        .await;

    save_session(&state, session.clone()).await?;
    drop(guard);
    Ok(Json(describe(&state, &session).await?))
}

async fn remove_attachment(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<AssessmentState> {
    let session = load_accepted_session(&state, &session_id).await?;
    let step = current_step(&session).map_err(|e| step_error(&session_id, e))?;
    if step != AssessmentStep::SymptomEntry {
        return Err(conflict_error(
            "Attachments can only be changed while entering symptoms",
            step,
        ));
    }
    let guard = state.begin_step(&session_id, step)?;

    session.context.remove(session_keys::ATTACHMENT).await;
    save_session(&state, session.clone()).await?;
    drop(guard);
    Ok(Json(describe(&state, &session).await?))
}

#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub response: Option<String>,
    pub completed: bool,
    pub state: AssessmentState,
}

async fn apply_event(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(event): Json<WizardEvent>,
) -> ApiResult<EventResponse> {
    let session = load_accepted_session(&state, &session_id).await?;
    let resting = current_step(&session).map_err(|e| step_error(&session_id, e))?;
    let guard = state.begin_step(&session_id, pending_step(resting, &event))?;

    info!(
        session_id = %session_id,
        event = event.name(),
        step = %resting,
        "Applying event"
    );
    session.context.set(session_keys::EVENT, &event).await;
    save_session(&state, session).await?;

    let outcome = state.flow_runner.run(&session_id).await;
    drop(guard);

    let session = load_session(&state, &session_id).await?;
    let result = match outcome {
        Ok(result) => result,
        Err(e) => {
            // a step that failed before reading its input must not see it again
            session.context.remove(session_keys::EVENT).await;
            return Err(step_error(&session_id, e));
        }
    };

    info!(
        session_id = %session_id,
        step = %session.current_task_id,
        status = ?result.status,
        "Step finished"
    );
    Ok(Json(EventResponse {
        response: result.response,
        completed: result.status == ExecutionStatus::Completed,
        state: describe(&state, &session).await?,
    }))
}

async fn reset(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<AssessmentState> {
    let mut session = load_accepted_session(&state, &session_id).await?;
    let step = current_step(&session).map_err(|e| step_error(&session_id, e))?;
    let guard = state.begin_step(&session_id, step)?;

    reset_assessment(&mut session).await;
    save_session(&state, session.clone()).await?;
    drop(guard);
    Ok(Json(describe(&state, &session).await?))
}

/// Inputs and result of an assessment that reached the report.
struct FinishedAssessment {
    analysis: HealthAnalysis,
    profile: PatientProfile,
    symptoms: SymptomData,
    answers: Vec<QuestionAnswer>,
}

impl FinishedAssessment {
    fn inputs(&self) -> ReportInputs<'_> {
        ReportInputs {
            analysis: &self.analysis,
            profile: &self.profile,
            symptoms: &self.symptoms,
            answers: &self.answers,
        }
    }
}

async fn load_finished(state: &AppState, session_id: &str) -> Result<FinishedAssessment, ApiError> {
    let session = load_accepted_session(state, session_id).await?;
    let step = current_step(&session).map_err(|e| step_error(session_id, e))?;
    if step != AssessmentStep::ReportView {
        return Err(conflict_error("The report is not ready yet", step));
    }

    let context = &session.context;
    let analysis = context
        .get(session_keys::FINAL_ANALYSIS)
        .await
        .ok_or_else(|| internal_error("Report data is missing", "final analysis not found"))?;

    Ok(FinishedAssessment {
        analysis,
        profile: context.get(session_keys::PROFILE).await.unwrap_or_default(),
        symptoms: context
            .get(session_keys::SYMPTOMS)
            .await
            .unwrap_or_default(),
        answers: context
            .get(session_keys::QUESTION_ANSWERS)
            .await
            .unwrap_or_default(),
    })
}

#[derive(Debug, Serialize)]
pub struct QuizPrompt {
    pub position: usize,
    pub question: String,
    pub options: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub report: HealthReportView,
    pub markdown: String,
    pub infographic: InfographicView,
    pub concept_map: ConceptNode,
    pub flashcards: usize,
    pub knowledge_quiz: Vec<QuizPrompt>,
    pub answers: Vec<QuestionAnswer>,
}

async fn get_report(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<ReportResponse> {
    let finished = load_finished(&state, &session_id).await?;
    let report = HealthReportView::build(finished.inputs());
    let analysis = &finished.analysis;

    Ok(Json(ReportResponse {
        markdown: report.to_markdown(),
        report,
        infographic: InfographicView::build(analysis),
        concept_map: concept_tree(analysis),
        flashcards: analysis.flashcards.len(),
        knowledge_quiz: analysis
            .knowledge_quiz
            .iter()
            .enumerate()
            .map(|(position, q)| QuizPrompt {
                position,
                question: q.question.clone(),
                options: q.options.clone(),
            })
            .collect(),
        answers: finished.answers.clone(),
    }))
}

async fn get_concept_map(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Response, ApiError> {
    let finished = load_finished(&state, &session_id).await?;
    let svg = render_svg(&finished.analysis);
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response())
}

async fn get_flashcard(
    State(state): State<AppState>,
    Path((session_id, index)): Path<(String, i64)>,
) -> ApiResult<FlashcardView> {
    let finished = load_finished(&state, &session_id).await?;
    flashcard_at(&finished.analysis.flashcards, index)
        .map(Json)
        .ok_or_else(|| not_found_error("This report has no flashcards", &session_id))
}

async fn grade_knowledge_quiz(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(selections): Json<QuizSelections>,
) -> ApiResult<QuizGrade> {
    let finished = load_finished(&state, &session_id).await?;
    if finished.analysis.knowledge_quiz.is_empty() {
        return Err(bad_request_error("This report has no knowledge quiz"));
    }
    Ok(Json(grade_quiz(&finished.analysis.knowledge_quiz, &selections)))
}

async fn download_pdf(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Response, ApiError> {
    let finished = load_finished(&state, &session_id).await?;
    let generated_at = Utc::now();

    let bytes = tokio::task::spawn_blocking(move || render_pdf(finished.inputs(), generated_at))
        .await
        .map_err(|e| internal_error("Failed to render PDF", &e.to_string()))?
        .map_err(|e| internal_error("Failed to render PDF", &e.to_string()))?;

    info!(session_id = %session_id, size = bytes.len(), "PDF report rendered");
    let disposition = format!("attachment; filename=\"{}\"", report_file_name(generated_at));
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}
