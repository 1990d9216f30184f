use crate::analyzer::sessions::SessionSummary;
use crate::analyzer::{self, DashboardState};
use crate::config::Config;
use crate::db::{
    ClearedHistory, Database, ExerciseDefinition, ExerciseSelection, HistoryWindow,
    NewWorkoutSession,
};
use anyhow::anyhow;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub struct ApiState {
    pub config: Arc<Config>,
    /// Last-known dashboard and aggregation memo per user.
    dashboards: Arc<Mutex<HashMap<String, DashboardState>>>,
}

impl ApiState {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            dashboards: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/status", get(status))
        .route("/api/v1/dashboard/weekly", get(weekly_dashboard))
        .route("/api/v1/sessions/recent", get(recent_sessions))
        .route("/api/v1/sessions", post(log_session))
        .route("/api/v1/muscle-groups", get(muscle_groups))
        .route("/api/v1/exercises", get(exercises))
        .route("/api/v1/history/clear", post(clear_history))
        .fallback(not_found)
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct UserQuery {
    user: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClearHistoryPayload {
    user: Option<String>,
    days: Option<u32>,
    exercise_ids: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct StatusPayload {
    user_id: String,
    session_count: usize,
    last_completed_at: Option<DateTime<Utc>>,
    canonical_muscle_groups: usize,
    api_port: u16,
}

#[derive(Debug, Serialize)]
struct SessionsPayload {
    user_id: String,
    window_days: u32,
    count: usize,
    sessions: Vec<SessionSummary>,
}

#[derive(Debug, Serialize)]
struct ClearHistoryResponse {
    user_id: String,
    #[serde(flatten)]
    cleared: ClearedHistory,
}

async fn status(
    State(state): State<ApiState>,
    Query(query): Query<UserQuery>,
) -> ApiResult<Json<StatusPayload>> {
    let user_id = resolve_user(&state.config, query.user);
    let database = Database::open(&state.config.db_path)?;

    let payload = StatusPayload {
        session_count: database.session_count(&user_id)?,
        last_completed_at: database.latest_completed_at(&user_id)?,
        canonical_muscle_groups: database.canonical_muscle_groups()?.len(),
        api_port: state.config.api_port,
        user_id,
    };

    Ok(Json(payload))
}

async fn weekly_dashboard(
    State(state): State<ApiState>,
    Query(query): Query<UserQuery>,
) -> ApiResult<Response> {
    let user_id = resolve_user(&state.config, query.user);
    refresh_dashboard(&state, user_id)
}

fn refresh_dashboard(state: &ApiState, user_id: String) -> ApiResult<Response> {
    let rules = analyzer::load_muscle_rules(&state.config)?;
    let now = Local::now();

    let mut dashboards = state
        .dashboards
        .lock()
        .map_err(|_| anyhow!("Dashboard state lock poisoned"))?;
    let dashboard = dashboards.entry(user_id.clone()).or_default();

    dashboard.refresh(
        || {
            let database = Database::open(&state.config.db_path)?;
            analyzer::fetch_snapshot(
                &database,
                &user_id,
                state.config.recent_window_days,
                now.with_timezone(&Utc),
            )
        },
        &rules,
        state.config.weekly_target_workouts,
        &now,
    );

    let status = if dashboard.error.is_some() {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    };

    Ok((status, Json(&*dashboard)).into_response())
}

async fn recent_sessions(
    State(state): State<ApiState>,
    Query(query): Query<UserQuery>,
) -> ApiResult<Json<SessionsPayload>> {
    let user_id = resolve_user(&state.config, query.user);
    let sessions = analyzer::load_recent_sessions(&state.config, &user_id)?;

    Ok(Json(SessionsPayload {
        window_days: state.config.recent_window_days,
        count: sessions.len(),
        sessions,
        user_id,
    }))
}

async fn log_session(
    State(state): State<ApiState>,
    Json(payload): Json<NewWorkoutSession>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    if let Some(set_log) = payload
        .set_logs
        .iter()
        .find(|set_log| set_log.exercise_id.trim().is_empty())
    {
        return Err(ApiError::BadRequest(format!(
            "Set log {} has no exercise_id",
            set_log.id.as_deref().unwrap_or("(new)")
        )));
    }

    let mut database = Database::open(&state.config.db_path)?;
    let session_id = database.insert_session(&state.config.user_id, &payload)?;

    info!(session = %session_id, sets = payload.set_logs.len(), "workout session logged");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "saved": true, "id": session_id })),
    ))
}

async fn muscle_groups(State(state): State<ApiState>) -> ApiResult<Json<Value>> {
    let database = Database::open(&state.config.db_path)?;
    let groups = database.canonical_muscle_groups()?;

    Ok(Json(json!({ "muscle_groups": groups })))
}

async fn exercises(State(state): State<ApiState>) -> ApiResult<Json<Vec<ExerciseDefinition>>> {
    let database = Database::open(&state.config.db_path)?;

    Ok(Json(database.list_exercises()?))
}

async fn clear_history(
    State(state): State<ApiState>,
    Json(payload): Json<ClearHistoryPayload>,
) -> ApiResult<Json<ClearHistoryResponse>> {
    let user_id = resolve_user(&state.config, payload.user);
    let window = HistoryWindow::from_days(payload.days)
        .map_err(|error| ApiError::BadRequest(error.to_string()))?;
    let selection = match payload.exercise_ids {
        None => ExerciseSelection::All,
        Some(ids) if ids.is_empty() => {
            return Err(ApiError::BadRequest(
                "exercise_ids must contain at least one id".to_string(),
            ));
        }
        Some(ids) => ExerciseSelection::Only(ids),
    };

    let mut database = Database::open(&state.config.db_path)?;
    let cleared = database.clear_exercise_history(&user_id, window, &selection, Utc::now())?;

    info!(
        user = %user_id,
        set_logs = cleared.set_logs_deleted,
        sessions = cleared.sessions_deleted,
        "exercise history cleared"
    );

    Ok(Json(ClearHistoryResponse { user_id, cleared }))
}

async fn not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}

fn resolve_user(config: &Config, requested: Option<String>) -> String {
    requested
        .map(|user| user.trim().to_string())
        .filter(|user| !user.is_empty())
        .unwrap_or_else(|| config.user_id.clone())
}

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Internal(error) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": format!("{error:#}") })),
            )
                .into_response(),
        }
    }
}
