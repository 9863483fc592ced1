mod rate_limit;

use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::{Query, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use coral_agents::{MessageInput, ResortAgent};
use coral_core::{AgentConfig, Category, HandlerInput};
use coral_knowledge::PolicyKnowledgeBase;
use coral_observability::AppMetrics;
use coral_storage::Store;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::rate_limit::IpRateLimiter;

const MAX_BODY_BYTES: usize = 64 * 1024;
const RATE_WINDOW: Duration = Duration::from_secs(60);
const RATE_MAX_REQUESTS: usize = 120;

#[derive(Clone)]
pub struct ApiState {
    pub agent: Arc<ResortAgent<Store>>,
    pub metrics: Arc<AppMetrics>,
    pub api_key: String,
    pub limiter: IpRateLimiter,
    pub store_kind: &'static str,
    pub knowledge_entries: usize,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp_utc: String,
    store: &'static str,
    knowledge_entries: usize,
    metrics: coral_observability::MetricsSnapshot,
}

#[derive(Debug, Deserialize)]
struct ScheduleRequest {
    employee_id: String,
    shift_type: String,
    date: String,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    q: String,
}

#[derive(Debug, Deserialize)]
struct ReservationQuery {
    guest: String,
}

/// Builds the full router. Store, agent config, and policy directory come
/// from the environment (`CORAL_DATABASE_URL`, `CORAL_AGENT_CONFIG`,
/// `CORAL_POLICY_DIR`); everything defaults to the seeded in-memory setup.
pub async fn build_app() -> Result<Router> {
    let metrics = AppMetrics::shared();

    let config = match env::var("CORAL_AGENT_CONFIG") {
        Ok(path) => AgentConfig::from_json_file(&path)?,
        Err(_) => AgentConfig::default(),
    };

    let knowledge = match env::var("CORAL_POLICY_DIR") {
        Ok(dir) => PolicyKnowledgeBase::from_dir(&dir)
            .with_context(|| format!("failed loading policy documents from {dir}"))?,
        Err(_) => PolicyKnowledgeBase::builtin(),
    };
    let knowledge_entries = knowledge.stats().entries;

    let store = if let Ok(database_url) = env::var("CORAL_DATABASE_URL") {
        Store::sqlite(&database_url).await?
    } else {
        Store::memory()
    };
    let store_kind = store.kind();

    let agent = ResortAgent::new(
        config,
        Arc::new(knowledge),
        Arc::new(store),
        metrics.clone(),
    )?;

    let state = ApiState {
        agent: Arc::new(agent),
        metrics,
        api_key: env::var("CORAL_API_KEY").unwrap_or_else(|_| "dev-coral-key".to_string()),
        limiter: IpRateLimiter::new(RATE_WINDOW, RATE_MAX_REQUESTS),
        store_kind,
        knowledge_entries,
    };

    let protected = Router::new()
        .route("/messages", post(post_message))
        .route("/schedule", post(post_schedule))
        .route("/reservations", get(get_reservation))
        .route("/activities", get(get_activities))
        .route("/policies", get(get_policies))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    let app = Router::new()
        .route("/health", get(health))
        .nest("/v1", protected)
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state);

    Ok(app)
}

async fn require_api_key(
    State(state): State<ApiState>,
    request: Request,
    next: Next,
) -> Response {
    let client_key = client_key(request.headers());
    if !state.limiter.allow(&client_key) {
        return error_response(StatusCode::TOO_MANY_REQUESTS, "rate limit exceeded");
    }

    let provided = request
        .headers()
        .get("x-api-key")
        .and_then(|value| value.to_str().ok());

    if provided != Some(state.api_key.as_str()) {
        return error_response(StatusCode::UNAUTHORIZED, "invalid api key");
    }

    next.run(request).await
}

fn client_key(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .unwrap_or_else(|| "local".to_string())
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        timestamp_utc: Utc::now().to_rfc3339(),
        store: state.store_kind,
        knowledge_entries: state.knowledge_entries,
        metrics: state.metrics.snapshot(),
    })
}

async fn post_message(
    State(state): State<ApiState>,
    Json(message): Json<MessageInput>,
) -> impl IntoResponse {
    let outcome = state.agent.handle_message(message).await;
    Json(outcome)
}

async fn post_schedule(
    State(state): State<ApiState>,
    Json(request): Json<ScheduleRequest>,
) -> impl IntoResponse {
    let input = HandlerInput {
        employee_id: Some(request.employee_id),
        shift_type: Some(request.shift_type),
        date: Some(request.date),
        ..HandlerInput::default()
    };

    let record = state.agent.dispatch(Category::ScheduleUpdate, &input).await;
    Json(record)
}

async fn get_reservation(
    State(state): State<ApiState>,
    Query(query): Query<ReservationQuery>,
) -> impl IntoResponse {
    let input = HandlerInput {
        customer_name: Some(query.guest),
        ..HandlerInput::default()
    };

    let record = state
        .agent
        .dispatch(Category::ReservationLookup, &input)
        .await;
    Json(record)
}

async fn get_activities(
    State(state): State<ApiState>,
    Query(query): Query<SearchQuery>,
) -> impl IntoResponse {
    let input = HandlerInput {
        guest_preferences: Some(query.q),
        ..HandlerInput::default()
    };

    let record = state
        .agent
        .dispatch(Category::ActivityRecommendation, &input)
        .await;
    Json(record)
}

async fn get_policies(
    State(state): State<ApiState>,
    Query(query): Query<SearchQuery>,
) -> impl IntoResponse {
    let policies = state.agent.search_policies(&query.q);
    let count = policies.len();
    Json(json!({ "policies": policies, "count": count }))
}
