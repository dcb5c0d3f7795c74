mod rate_limit;

use std::collections::HashSet;
use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::extract::{Json, State};
use axum::http::{header, HeaderValue, Method, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{body::Body, Router};
use chrono::{Local, NaiveDate};
use itinera_agents::{
    AgentConfig, HttpPlanningBackend, OpenWeatherProvider, PlanInput, PlannerAgent, ReplanInput,
};
use itinera_core::{
    build_itinerary, parse_start_date, prepare_for_display, replan_by_distance, Itinerary,
    NameTable, PlannerError, Poi, SelectionOverrides, TripRequest,
};
use itinera_observability::AppMetrics;
use rand::RngExt;
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

pub use crate::rate_limit::IpRateLimiter;

pub type Agent = PlannerAgent<HttpPlanningBackend, OpenWeatherProvider>;

#[derive(Clone)]
pub struct ApiState {
    pub agent: Arc<Agent>,
    pub metrics: Arc<AppMetrics>,
    pub limiter: IpRateLimiter,
    pub weather_enabled: bool,
    pub allowed_origins: Arc<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp_utc: String,
    metrics: itinera_observability::MetricsSnapshot,
    capabilities: HealthCapabilities,
}

#[derive(Debug, Serialize)]
struct HealthCapabilities {
    weather_fallback: bool,
}

#[derive(Debug, Deserialize)]
struct ParseRequest {
    query: String,
    #[serde(default)]
    today: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct BuildRequest {
    #[serde(flatten)]
    trip: TripRequest,
    #[serde(default)]
    pois: Vec<Poi>,
}

#[derive(Debug, Deserialize)]
struct RebuildRequest {
    previous: Itinerary,
    #[serde(default)]
    selected: Vec<String>,
    #[serde(default)]
    days: Option<u32>,
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    interests: Option<Vec<String>>,
}

pub fn build_app() -> Result<Router> {
    let metrics = AppMetrics::shared();
    let config = AgentConfig::from_env();

    let backend = Arc::new(HttpPlanningBackend::new(&config)?);
    let weather_enabled = config.openweather_api_key.is_some();
    let weather = match config.openweather_api_key.as_deref() {
        Some(key) => Some(Arc::new(OpenWeatherProvider::new(key, config.http_timeout)?)),
        None => None,
    };
    let agent = Arc::new(PlannerAgent::new(backend, weather, metrics.clone()));

    let rate_limit_window = Duration::from_secs(
        env::var("ITINERA_RATE_LIMIT_WINDOW_SECONDS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(60),
    );
    let rate_limit_max = env::var("ITINERA_RATE_LIMIT_MAX")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(120);

    let state = ApiState {
        agent,
        metrics,
        limiter: IpRateLimiter::new(rate_limit_window, rate_limit_max),
        weather_enabled,
        allowed_origins: Arc::new(parse_allowed_origins()),
    };

    Ok(build_router(state))
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/parse", post(parse_query))
        .route("/v1/plan", post(plan))
        .route("/v1/replan", post(replan))
        .route("/v1/itinerary/build", post(itinerary_build))
        .route("/v1/itinerary/replan_distance", post(itinerary_replan_distance))
        .route("/v1/itinerary/display", post(itinerary_display))
        .route("/v1/itinerary/rebuild", post(itinerary_rebuild))
        .layer(build_cors_layer(&state.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(RequestBodyLimitLayer::new(64 * 1024))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .with_state(state)
}

async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let payload = HealthResponse {
        status: "ok",
        timestamp_utc: chrono::Utc::now().to_rfc3339(),
        metrics: state.metrics.snapshot(),
        capabilities: HealthCapabilities {
            weather_fallback: state.weather_enabled,
        },
    };
    (StatusCode::OK, Json(payload))
}

async fn parse_query(
    State(state): State<ApiState>,
    Json(request): Json<ParseRequest>,
) -> impl IntoResponse {
    state.metrics.inc_request();
    let today = request.today.unwrap_or_else(today);
    let parsed = state.agent.parse_query(&request.query, today);
    (StatusCode::OK, Json(parsed))
}

async fn plan(State(state): State<ApiState>, Json(input): Json<PlanInput>) -> Response {
    match state.agent.plan(input, today()).await {
        Ok(itinerary) => (StatusCode::OK, Json(itinerary)).into_response(),
        Err(error) => agent_error("plan_failed", &error),
    }
}

async fn replan(State(state): State<ApiState>, Json(input): Json<ReplanInput>) -> Response {
    match state.agent.replan(input, today()).await {
        Ok(itinerary) => (StatusCode::OK, Json(itinerary)).into_response(),
        Err(error) => agent_error("replan_failed", &error),
    }
}

async fn itinerary_build(
    State(state): State<ApiState>,
    Json(request): Json<BuildRequest>,
) -> Response {
    state.metrics.inc_request();
    let trip = match request.trip.normalize(today()) {
        Ok(trip) => trip,
        Err(error) => return bad_request("invalid_trip", &error),
    };

    let itinerary = build_itinerary(
        &request.pois,
        trip.days,
        trip.start_date,
        &trip.city,
        &trip.interests,
    );
    state.metrics.inc_itinerary_built();
    tracing::info!(
        city = %itinerary.city,
        days = itinerary.days.len(),
        pois = itinerary.selected_pois.len(),
        "itinerary built locally"
    );
    (StatusCode::OK, Json(itinerary)).into_response()
}

async fn itinerary_replan_distance(
    State(state): State<ApiState>,
    Json(itinerary): Json<Itinerary>,
) -> impl IntoResponse {
    state.metrics.inc_request();
    state.metrics.inc_replan();
    (StatusCode::OK, Json(replan_by_distance(&itinerary)))
}

async fn itinerary_display(
    State(state): State<ApiState>,
    Json(itinerary): Json<Itinerary>,
) -> impl IntoResponse {
    state.metrics.inc_request();
    (StatusCode::OK, Json(display(&itinerary)))
}

async fn itinerary_rebuild(
    State(state): State<ApiState>,
    Json(request): Json<RebuildRequest>,
) -> Response {
    let today = today();
    let start_date = match request.start_date.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => match parse_start_date(raw, today) {
            Some(date) => Some(date),
            None => {
                return bad_request("invalid_date", &PlannerError::InvalidDate(raw.to_string()))
            }
        },
        _ => None,
    };

    let selected = request.selected.into_iter().collect::<HashSet<_>>();
    let overrides = SelectionOverrides {
        days: request.days,
        start_date,
        city: request.city,
        interests: request.interests,
    };
    let rebuilt = state
        .agent
        .rebuild(&request.previous, &selected, overrides, today);
    (StatusCode::OK, Json(rebuilt)).into_response()
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn display(itinerary: &Itinerary) -> Itinerary {
    let mut names = NameTable::new();
    let mut rng = rand::rng();
    prepare_for_display(itinerary, &mut names, |len| rng.random_range(0..len))
}

fn agent_error(code: &str, error: &anyhow::Error) -> Response {
    if let Some(planner_error) = error.downcast_ref::<PlannerError>() {
        return bad_request(code, planner_error);
    }

    tracing::warn!(error = %format!("{error:#}"), code, "backend request failed");
    (
        StatusCode::BAD_GATEWAY,
        Json(serde_json::json!({
            "error": code,
            "message": format!("{error:#}")
        })),
    )
        .into_response()
}

fn bad_request(code: &str, error: &PlannerError) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({
            "error": code,
            "message": error.to_string()
        })),
    )
        .into_response()
}

fn parse_allowed_origins() -> Vec<String> {
    let default_origins = [
        "http://localhost:5500",
        "http://127.0.0.1:5500",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
    ];

    env::var("ITINERA_ALLOWED_ORIGINS")
        .ok()
        .map(|value| {
            value
                .split(',')
                .map(|origin| origin.trim().trim_end_matches('/').to_string())
                .filter(|origin| !origin.is_empty())
                .collect::<Vec<_>>()
        })
        .unwrap_or_else(|| {
            default_origins
                .iter()
                .map(|value| value.to_string())
                .collect()
        })
}

fn build_cors_layer(allowed_origins: &Arc<Vec<String>>) -> CorsLayer {
    let origins = allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect::<Vec<_>>();
    let origins = if origins.is_empty() {
        vec![HeaderValue::from_static("http://localhost:5500")]
    } else {
        origins
    };

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

async fn rate_limit_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS || request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let ip = request_ip(&request);
    if !state.limiter.allow(&ip) {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(serde_json::json!({
                "error": "rate_limited",
                "message": "rate limit exceeded for this IP"
            })),
        )
            .into_response();
    }

    next.run(request).await
}

fn request_ip(request: &Request<Body>) -> String {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .map(|value| {
            value
                .split(',')
                .next()
                .unwrap_or("unknown")
                .trim()
                .to_string()
        })
        .unwrap_or_else(|| "local".to_string())
}
