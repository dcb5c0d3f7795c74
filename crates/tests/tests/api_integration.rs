use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use itinera_agents::{AgentConfig, HttpPlanningBackend, PlannerAgent};
use itinera_api::{build_app, build_router, ApiState, IpRateLimiter};
use itinera_observability::AppMetrics;
use serde_json::{json, Value};
use tower::ServiceExt;

// Nothing listens on the discard port, so backend calls fail fast.
const DEAD_BACKEND: &str = "http://127.0.0.1:9";

fn app_with(max_requests: usize) -> Router {
    let metrics = AppMetrics::shared();
    let config = AgentConfig {
        http_timeout: Duration::from_secs(2),
        ..AgentConfig::default().with_backend_url(DEAD_BACKEND)
    };
    let backend = Arc::new(HttpPlanningBackend::new(&config).expect("client should build"));
    let agent = Arc::new(PlannerAgent::new(backend, None, metrics.clone()));

    build_router(ApiState {
        agent,
        metrics,
        limiter: IpRateLimiter::new(Duration::from_secs(60), max_requests),
        weather_enabled: false,
        allowed_origins: Arc::new(Vec::new()),
    })
}

fn app() -> Router {
    app_with(100)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn line_itinerary() -> Value {
    json!({
        "city": "Line",
        "all_pois": [
            { "name": "Zero", "category": "park", "lat": 0.0, "lon": 0.0 },
            { "name": "One", "category": "park", "lat": 0.0, "lon": 1.0 },
            { "name": "Ten", "category": "park", "lat": 0.0, "lon": 10.0 },
            { "name": "Noodle Bar", "category": "catering.restaurant" }
        ],
        "days": [{
            "day": 1,
            "date": "2024-05-01",
            "schedule": [
                { "time": "08:30", "activity": "Breakfast", "place": "Noodle Bar" },
                { "time": "10:00", "activity": "Sightseeing", "place": "Zero" },
                { "time": "15:00", "activity": "Sightseeing", "place": "Ten" },
                { "time": "18:00", "activity": "Short Sight", "place": "One" }
            ]
        }]
    })
}

#[tokio::test]
async fn health_is_public() {
    let app = build_app().expect("app should build");

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let parsed = json_body(response).await;
    assert_eq!(parsed["status"], "ok");
    assert!(parsed["metrics"].get("requests_total").is_some());
}

#[tokio::test]
async fn parse_extracts_trip_fields() {
    let response = app()
        .oneshot(post_json(
            "/v1/parse",
            json!({
                "query": "Plan a 3-day trip to Paris starting from 12th Oct",
                "today": "2024-01-01"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({ "city": "Paris", "days": 3, "start_date": "2024-10-12" })
    );
}

#[tokio::test]
async fn build_returns_a_schedule_per_day() {
    let response = app()
        .oneshot(post_json(
            "/v1/itinerary/build",
            json!({
                "city": "Delhi",
                "days": 2,
                "start_date": "2024-10-12",
                "pois": [
                    { "name": "Karim's", "category": "catering.restaurant" },
                    { "name": "Red Fort", "category": "heritage", "lat": 28.656, "lon": 77.241 }
                ]
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let itinerary = json_body(response).await;
    let days = itinerary["days"].as_array().unwrap();
    assert_eq!(days.len(), 2);
    assert_eq!(days[1]["date"], "2024-10-13");
    assert_eq!(days[0]["schedule"][0]["activity"], "Breakfast");
    assert_eq!(days[0]["schedule"][1]["place"], "Red Fort");
}

#[tokio::test]
async fn build_without_city_is_a_bad_request() {
    let response = app()
        .oneshot(post_json("/v1/itinerary/build", json!({ "days": 2 })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let parsed = json_body(response).await;
    assert_eq!(parsed["error"], "invalid_trip");
    assert_eq!(parsed["message"], "missing 'city'");
}

#[tokio::test]
async fn distance_replan_reorders_sights() {
    let response = app()
        .oneshot(post_json("/v1/itinerary/replan_distance", line_itinerary()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let itinerary = json_body(response).await;
    let places = itinerary["days"][0]["schedule"]
        .as_array()
        .unwrap()
        .iter()
        .map(|slot| slot["place"].as_str().unwrap().to_string())
        .collect::<Vec<_>>();
    assert_eq!(places, vec!["Noodle Bar", "Zero", "One", "Ten"]);
    assert_eq!(itinerary["days"][0]["schedule"][3]["activity"], "Short Sight");
}

#[tokio::test]
async fn display_sanitizes_and_fills_places() {
    let mut itinerary = line_itinerary();
    itinerary["all_pois"][0]["name"] = json!("Zéro Café");
    itinerary["days"][0]["schedule"][1]["place"] = json!("Zéro Café");
    itinerary["days"][0]["schedule"][2]["place"] = json!("");

    let response = app()
        .oneshot(post_json("/v1/itinerary/display", itinerary))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let prepared = json_body(response).await;
    assert_eq!(prepared["all_pois"][0]["name"], "Zero Cafe");
    assert_eq!(prepared["days"][0]["schedule"][1]["place"], "Zero Cafe");
    let filled = prepared["days"][0]["schedule"][2]["place"].as_str().unwrap();
    assert!(filled.starts_with("Line "), "unexpected filler {filled}");
}

#[tokio::test]
async fn rebuild_uses_selected_pois() {
    let response = app()
        .oneshot(post_json(
            "/v1/itinerary/rebuild",
            json!({
                "previous": line_itinerary(),
                "selected": ["Zero", "Noodle Bar"],
                "days": 3
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let rebuilt = json_body(response).await;
    assert_eq!(rebuilt["days"].as_array().unwrap().len(), 3);
    assert_eq!(rebuilt["days"][0]["date"], "2024-05-01");
    assert_eq!(rebuilt["selected_pois"].as_array().unwrap().len(), 2);
    assert_eq!(rebuilt["all_pois"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn rebuild_rejects_unreadable_dates() {
    let response = app()
        .oneshot(post_json(
            "/v1/itinerary/rebuild",
            json!({
                "previous": line_itinerary(),
                "selected": ["Zero"],
                "start_date": "someday"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "invalid_date");
}

#[tokio::test]
async fn build_ignores_out_of_range_iso_dates() {
    let response = app()
        .oneshot(post_json(
            "/v1/itinerary/build",
            json!({ "city": "X", "days": 2, "start_date": "+262142-12-31" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let itinerary = json_body(response).await;
    let days = itinerary["days"].as_array().unwrap();
    assert_eq!(days.len(), 2);
    // falls back to today rather than the far-future date
    assert!(!days[0]["date"].as_str().unwrap().starts_with('+'));
}

#[tokio::test]
async fn rebuild_caps_the_day_count() {
    let response = app()
        .oneshot(post_json(
            "/v1/itinerary/rebuild",
            json!({
                "previous": line_itinerary(),
                "selected": ["Zero"],
                "days": u32::MAX,
                "start_date": "9999-12-31"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let rebuilt = json_body(response).await;
    let days = rebuilt["days"].as_array().unwrap();
    assert_eq!(days.len(), 10);
    assert_eq!(days[0]["date"], "9999-12-31");
}

#[tokio::test]
async fn plan_reports_backend_failure_as_bad_gateway() {
    let response = app()
        .oneshot(post_json(
            "/v1/plan",
            json!({ "query": "3 days in Rome", "interests": ["food"] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(json_body(response).await["error"], "plan_failed");
}

#[tokio::test]
async fn plan_without_city_never_reaches_backend() {
    let response = app()
        .oneshot(post_json("/v1/plan", json!({ "query": "a relaxing trip" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn distance_replan_falls_back_when_backend_is_down() {
    let response = app()
        .oneshot(post_json(
            "/v1/replan",
            json!({
                "city": "Line",
                "days": 1,
                "mode": "distance",
                "previous": line_itinerary()
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let itinerary = json_body(response).await;
    assert_eq!(itinerary["days"][0]["schedule"][2]["place"], "One");
}

#[tokio::test]
async fn rate_limit_applies_per_ip() {
    let app = app_with(1);

    let first = app
        .clone()
        .oneshot(post_json("/v1/parse", json!({ "query": "Goa" })))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .clone()
        .oneshot(post_json("/v1/parse", json!({ "query": "Goa" })))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);

    let health = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);
}
