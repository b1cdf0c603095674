use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json, Response,
    },
    routing::{get, post},
    Router,
};
use nyaya_core::{
    error::CourtError,
    intent::{classify_intent, decide_responders},
    llm::GenerationError,
    types::{CaseConfig, PracticeConfig, Speaker},
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tokio_stream::{wrappers::UnboundedReceiverStream, StreamExt};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;

// ── Error mapping ─────────────────────────────────────────────────────────

pub(crate) enum ApiError {
    Court(CourtError),
    /// Body could not be read as the expected JSON.
    Request(JsonRejection),
    Internal(String),
}

impl From<CourtError> for ApiError {
    fn from(e: CourtError) -> Self {
        Self::Court(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        Self::Request(e)
    }
}

pub(crate) fn status_for(e: &CourtError) -> StatusCode {
    match e {
        CourtError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        CourtError::InvalidTurn { .. }
        | CourtError::SessionEnded(_)
        | CourtError::TurnInFlight(_) => StatusCode::CONFLICT,
        CourtError::Configuration(_) | CourtError::InvalidInput(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        },
        CourtError::GenerationFailed(GenerationError::Terminal(_)) => StatusCode::BAD_GATEWAY,
        CourtError::GenerationFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message, retryable) = match self {
            Self::Court(e) => (status_for(&e), e.kind(), e.to_string(), e.is_retryable()),
            Self::Request(e) => (e.status(), "invalid_request", e.body_text(), false),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal", msg, false),
        };
        if status.is_server_error() {
            tracing::error!(kind, "request failed: {message}");
        }
        let body = json!({
            "error": message,
            "kind": kind,
            "retryable": retryable,
        });
        (status, Json(body)).into_response()
    }
}

type ApiResult = Result<Json<Value>, ApiError>;

fn to_json(v: impl serde::Serialize) -> ApiResult {
    serde_json::to_value(v)
        .map(Json)
        .map_err(|e| ApiError::Internal(format!("unserializable response: {e}")))
}

/// `Json` whose rejections use the API error body.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub(crate) struct ApiJson<T>(pub T);

// ── Request body types ────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(crate) struct StartSessionBody {
    pub case: CaseConfig,
    #[serde(default)]
    pub practice: PracticeConfig,
}

#[derive(Deserialize)]
pub(crate) struct TurnBody {
    #[serde(default = "default_speaker")]
    pub speaker: Speaker,
    pub text: String,
}

fn default_speaker() -> Speaker {
    Speaker::User
}

#[derive(Deserialize)]
pub(crate) struct ClassifyBody {
    pub text: String,
}

// ── Router ────────────────────────────────────────────────────────────────

pub(crate) fn router(state: Arc<AppState>, cors_permissive: bool) -> Router {
    let cors = if cors_permissive {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    };
    Router::new()
        .route("/api/health", get(health))
        .route("/api/sessions", get(list_sessions).post(start_session))
        .route("/api/sessions/:id", get(get_session))
        .route("/api/sessions/:id/turns", post(submit_turn))
        .route("/api/sessions/:id/direction", post(direct))
        .route("/api/sessions/:id/verdict", post(deliver_verdict))
        .route("/api/sessions/:id/end", post(end_session))
        .route("/api/classify", post(classify))
        .route("/api/logs", get(sse_logs))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ── Handlers ──────────────────────────────────────────────────────────────

pub(crate) async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "backend": state.coordinator.generator_name(),
        "sessions": state.coordinator.session_count().await,
        "uptime_s": state.start_time.elapsed().as_secs(),
    }))
}

pub(crate) async fn list_sessions(State(state): State<Arc<AppState>>) -> ApiResult {
    to_json(state.coordinator.list_sessions().await)
}

pub(crate) async fn start_session(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<StartSessionBody>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let started = state
        .coordinator
        .start_session(body.case, body.practice)
        .await?;
    Ok((StatusCode::CREATED, to_json(started)?))
}

pub(crate) async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult {
    to_json(state.coordinator.get_state(&id).await?)
}

pub(crate) async fn submit_turn(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<TurnBody>,
) -> ApiResult {
    to_json(
        state
            .coordinator
            .submit_turn(&id, body.speaker, &body.text)
            .await?,
    )
}

pub(crate) async fn direct(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult {
    to_json(state.coordinator.direct(&id).await?)
}

pub(crate) async fn deliver_verdict(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult {
    to_json(state.coordinator.deliver_verdict(&id).await?)
}

pub(crate) async fn end_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult {
    to_json(state.coordinator.end_session(&id).await?)
}

/// Routing preview without touching any session or model.
pub(crate) async fn classify(ApiJson(body): ApiJson<ClassifyBody>) -> Json<Value> {
    let tags = classify_intent(&body.text);
    let responders = decide_responders(&tags);
    Json(json!({ "tags": tags, "responders": responders }))
}

pub(crate) async fn sse_logs(
    State(state): State<Arc<AppState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, std::convert::Infallible>>> {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<String>();
    // Subscribe before snapshotting ring to avoid race
    let live_rx = state.log_tx.subscribe();
    let history: Vec<String> = state
        .log_ring
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .iter()
        .cloned()
        .collect();
    tokio::spawn(async move {
        for line in history {
            if tx.send(line).is_err() {
                return;
            }
        }
        let mut live_rx = live_rx;
        loop {
            match live_rx.recv().await {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        return;
                    }
                },
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
    });
    let stream = UnboundedReceiverStream::new(rx)
        .map(|data| Ok::<_, std::convert::Infallible>(Event::default().data(data)));
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(std::time::Duration::from_secs(15))
            .text("ping"),
    )
}
