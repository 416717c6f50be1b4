//! JSON-over-HTTP adapter for a UI client.
//!
//! Handlers are thin: they call the engine or the translator and turn every
//! [`Error`] into `{ "error": <code>, "message": <localized notice> }`.

use crate::error::Error;
use crate::games::{FindSummary, MatchPair, MatchSummary};
use crate::i18n::{LanguageConfig, LanguageRegistry, MetricsReport, Notice, Translator};
use crate::progress::{
    AnswerOutcome, AttemptId, MilestoneProgress, MilestoneSummary, ProgressionEngine,
    QuestionView, ScoreReport, WordStatus, WrongAnswer,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ProgressionEngine>,
    pub translator: Arc<Translator>,
}

impl AppState {
    pub fn new(engine: Arc<ProgressionEngine>, translator: Arc<Translator>) -> Self {
        Self { engine, translator }
    }

    /// Run an engine call on the blocking pool, since the store writes files
    /// synchronously.
    async fn run<T, F>(&self, call: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&ProgressionEngine) -> crate::error::Result<T> + Send + 'static,
    {
        let engine = self.engine.clone();
        tokio::task::spawn_blocking(move || call(&engine))
            .await
            .unwrap_or_else(|e| Err(Error::Storage(format!("engine task failed: {e}"))))
            .map_err(|e| self.reject(e))
    }

    /// Localize an error for the response body.
    fn reject(&self, error: Error) -> ApiError {
        let message = self.translator.render(&Notice::from(&error));
        ApiError { error, message }
    }
}

#[derive(Debug)]
pub struct ApiError {
    error: Error,
    message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

fn status_for(error: &Error) -> StatusCode {
    match error {
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::UnknownLanguage(_) | Error::SameAsDisplay(_) => StatusCode::BAD_REQUEST,
        Error::InvalidTransition(_)
        | Error::QuizLocked { .. }
        | Error::MilestoneLocked { .. }
        | Error::AttemptAlreadyFinished(_) => StatusCode::CONFLICT,
        Error::LoadFailure { .. } => StatusCode::SERVICE_UNAVAILABLE,
        Error::CorruptState { .. } | Error::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.error);
        if status.is_server_error() {
            warn!("Request failed: {}", self.error);
        } else {
            debug!("Request rejected: {}", self.error);
        }

        let body = ErrorBody {
            error: self.error.code().to_string(),
            message: self.message,
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// ==================== Request / response bodies ====================

#[derive(Debug, Serialize)]
pub struct LanguagesResponse {
    pub languages: Vec<LanguageConfig>,
    pub display_language: String,
    pub learning_language: Option<String>,
    pub direction: String,
}

#[derive(Debug, Serialize)]
pub struct GotItResponse {
    pub status: WordStatus,
    pub progress: MilestoneProgress,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct EligibilityResponse {
    pub eligible: bool,
    pub remaining: usize,
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartQuizResponse {
    pub attempt_id: AttemptId,
    pub question: Option<QuestionView>,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub word_id: String,
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct FinishResponse {
    pub report: ScoreReport,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct TranslateQuery {
    #[serde(default)]
    pub learn: bool,
}

#[derive(Debug, Serialize)]
pub struct TranslationResponse {
    pub namespace: String,
    pub key: String,
    pub text: String,
    pub direction: String,
}

#[derive(Debug, Deserialize)]
pub struct DisplayLanguageRequest {
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct LearningLanguageRequest {
    pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    pub pairs: Vec<MatchPair>,
}

#[derive(Debug, Deserialize)]
pub struct FindRequest {
    pub word_ids: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NoteBody {
    pub note: Option<String>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/languages", get(list_languages))
        .route("/milestones/:lang", get(list_milestones))
        .route("/progress/:lang/:milestone", get(visit_milestone).delete(reset_milestone))
        .route("/progress/:lang/:milestone/words/:word/got-it", post(mark_got_it))
        .route("/notes/:lang/:milestone/:word", get(get_note).put(put_note))
        .route("/review/:lang/:milestone", get(wrong_answers))
        .route("/quiz/:lang/:milestone/eligibility", get(quiz_eligibility))
        .route("/quiz/:lang/:milestone", post(start_quiz))
        .route("/quiz/attempts/:id", get(current_question))
        .route("/quiz/attempts/:id/answers", post(submit_answer))
        .route("/quiz/attempts/:id/finish", post(finish_quiz))
        .route("/games/:lang/:milestone/match", post(score_match))
        .route("/games/:lang/:milestone/find", post(score_find))
        .route("/i18n/metrics", get(translation_metrics))
        .route("/i18n/:namespace/:key", get(translate))
        .route("/preferences/display", put(set_display_language))
        .route("/preferences/learning", put(set_learning_language))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn list_languages(State(state): State<AppState>) -> Json<LanguagesResponse> {
    let translator = &state.translator;
    Json(LanguagesResponse {
        languages: LanguageRegistry::get().list_all().into_iter().cloned().collect(),
        display_language: translator.display_language().code().to_string(),
        learning_language: translator.learning_language().map(|l| l.code().to_string()),
        direction: translator.direction().as_str().to_string(),
    })
}

async fn list_milestones(
    State(state): State<AppState>,
    Path(lang): Path<String>,
) -> ApiResult<Vec<MilestoneSummary>> {
    state
        .run(move |engine| engine.milestones(&lang))
        .await
        .map(Json)
}

async fn visit_milestone(
    State(state): State<AppState>,
    Path((lang, milestone)): Path<(String, String)>,
) -> ApiResult<MilestoneProgress> {
    state
        .run(move |engine| engine.visit_milestone(&lang, &milestone))
        .await
        .map(Json)
}

async fn reset_milestone(
    State(state): State<AppState>,
    Path((lang, milestone)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state
        .run(move |engine| engine.reset_milestone(&lang, &milestone))
        .await
        .map(|_| StatusCode::NO_CONTENT)
}

async fn mark_got_it(
    State(state): State<AppState>,
    Path((lang, milestone, word)): Path<(String, String, String)>,
) -> ApiResult<GotItResponse> {
    let (status, progress) = state
        .run(move |engine| {
            let status = engine.mark_got_it(&lang, &milestone, &word)?;
            Ok((status, engine.milestone_progress(&lang, &milestone)?))
        })
        .await?;

    Ok(Json(GotItResponse {
        status,
        progress,
        message: state.translator.render(&Notice::word_completed()),
    }))
}

async fn get_note(
    State(state): State<AppState>,
    Path((lang, milestone, word)): Path<(String, String, String)>,
) -> ApiResult<NoteBody> {
    state
        .run(move |engine| engine.word_note(&lang, &milestone, &word))
        .await
        .map(|note| Json(NoteBody { note }))
}

async fn put_note(
    State(state): State<AppState>,
    Path((lang, milestone, word)): Path<(String, String, String)>,
    Json(body): Json<NoteBody>,
) -> Result<StatusCode, ApiError> {
    let note = body.note.unwrap_or_default();
    state
        .run(move |engine| engine.set_word_note(&lang, &milestone, &word, &note))
        .await
        .map(|_| StatusCode::NO_CONTENT)
}

async fn wrong_answers(
    State(state): State<AppState>,
    Path((lang, milestone)): Path<(String, String)>,
) -> ApiResult<Vec<WrongAnswer>> {
    state
        .run(move |engine| engine.wrong_answers(&lang, &milestone))
        .await
        .map(Json)
}

async fn quiz_eligibility(
    State(state): State<AppState>,
    Path((lang, milestone)): Path<(String, String)>,
) -> ApiResult<EligibilityResponse> {
    let progress = state
        .run(move |engine| engine.milestone_progress(&lang, &milestone))
        .await?;

    let message = (!progress.quiz_eligible).then(|| {
        state.translator.render(&Notice::from(&Error::QuizLocked {
            remaining: progress.remaining,
        }))
    });
    Ok(Json(EligibilityResponse {
        eligible: progress.quiz_eligible,
        remaining: progress.remaining,
        message,
    }))
}

async fn start_quiz(
    State(state): State<AppState>,
    Path((lang, milestone)): Path<(String, String)>,
) -> Result<(StatusCode, Json<StartQuizResponse>), ApiError> {
    let (attempt_id, question) = state
        .run(move |engine| {
            let attempt_id = engine.start_quiz(&lang, &milestone)?;
            Ok((attempt_id, engine.current_question(attempt_id)?))
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(StartQuizResponse {
            attempt_id,
            question,
        }),
    ))
}

async fn current_question(
    State(state): State<AppState>,
    Path(id): Path<AttemptId>,
) -> ApiResult<Option<QuestionView>> {
    state
        .run(move |engine| engine.current_question(id))
        .await
        .map(Json)
}

async fn submit_answer(
    State(state): State<AppState>,
    Path(id): Path<AttemptId>,
    Json(body): Json<AnswerRequest>,
) -> ApiResult<AnswerOutcome> {
    state
        .run(move |engine| engine.submit_answer(id, &body.word_id, &body.answer))
        .await
        .map(Json)
}

async fn finish_quiz(
    State(state): State<AppState>,
    Path(id): Path<AttemptId>,
) -> ApiResult<FinishResponse> {
    let report = state.run(move |engine| engine.finish_quiz(id)).await?;

    let notice = if report.passed {
        Notice::quiz_passed(report.score)
    } else {
        Notice::quiz_failed(report.score, state.engine.pass_threshold())
    };
    Ok(Json(FinishResponse {
        message: state.translator.render(&notice),
        report,
    }))
}

async fn score_match(
    State(state): State<AppState>,
    Path((lang, milestone)): Path<(String, String)>,
    Json(body): Json<MatchRequest>,
) -> ApiResult<MatchSummary> {
    state
        .run(move |engine| engine.score_match(&lang, &milestone, &body.pairs))
        .await
        .map(Json)
}

async fn score_find(
    State(state): State<AppState>,
    Path((lang, milestone)): Path<(String, String)>,
    Json(body): Json<FindRequest>,
) -> ApiResult<FindSummary> {
    state
        .run(move |engine| engine.score_find(&lang, &milestone, &body.word_ids))
        .await
        .map(Json)
}

async fn translate(
    State(state): State<AppState>,
    Path((namespace, key)): Path<(String, String)>,
    Query(query): Query<TranslateQuery>,
) -> Json<TranslationResponse> {
    let translator = &state.translator;
    let text = if query.learn {
        translator.t_learn(&key, &namespace)
    } else {
        translator.t(&key, &namespace)
    };

    Json(TranslationResponse {
        namespace,
        key,
        text,
        direction: translator.direction().as_str().to_string(),
    })
}

async fn translation_metrics(State(state): State<AppState>) -> Json<MetricsReport> {
    Json(state.translator.metrics())
}

async fn set_display_language(
    State(state): State<AppState>,
    Json(body): Json<DisplayLanguageRequest>,
) -> Result<Json<LanguagesResponse>, ApiError> {
    state
        .translator
        .set_display_language(&body.code)
        .await
        .map_err(|e| state.reject(e))?;
    Ok(list_languages(State(state)).await)
}

async fn set_learning_language(
    State(state): State<AppState>,
    Json(body): Json<LearningLanguageRequest>,
) -> Result<Json<LanguagesResponse>, ApiError> {
    state
        .translator
        .set_learning_language(body.code.as_deref())
        .await
        .map_err(|e| state.reject(e))?;
    Ok(list_languages(State(state)).await)
}
