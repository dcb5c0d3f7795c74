use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

#[derive(Debug, Default)]
pub struct AppMetrics {
    requests_total: AtomicU64,
    queries_parsed_total: AtomicU64,
    itineraries_built_total: AtomicU64,
    replans_total: AtomicU64,
    fallback_places_total: AtomicU64,
    backend_failures_total: AtomicU64,
    total_latency_millis: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub queries_parsed_total: u64,
    pub itineraries_built_total: u64,
    pub replans_total: u64,
    pub fallback_places_total: u64,
    pub backend_failures_total: u64,
    pub avg_latency_millis: f64,
}

impl AppMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("itinera_requests_total").increment(1);
    }

    pub fn inc_query_parsed(&self) {
        self.queries_parsed_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("itinera_queries_parsed_total").increment(1);
    }

    pub fn inc_itinerary_built(&self) {
        self.itineraries_built_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("itinera_itineraries_built_total").increment(1);
    }

    pub fn inc_replan(&self) {
        self.replans_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("itinera_replans_total").increment(1);
    }

    pub fn add_fallback_places(&self, filled: usize) {
        self.fallback_places_total
            .fetch_add(filled as u64, Ordering::Relaxed);
        metrics::counter!("itinera_fallback_places_total").increment(filled as u64);
    }

    pub fn inc_backend_failure(&self) {
        self.backend_failures_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("itinera_backend_failures_total").increment(1);
    }

    pub fn observe_latency(&self, duration: Duration) {
        self.total_latency_millis
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let requests = self.requests_total.load(Ordering::Relaxed);
        let latency = self.total_latency_millis.load(Ordering::Relaxed);

        MetricsSnapshot {
            requests_total: requests,
            queries_parsed_total: self.queries_parsed_total.load(Ordering::Relaxed),
            itineraries_built_total: self.itineraries_built_total.load(Ordering::Relaxed),
            replans_total: self.replans_total.load(Ordering::Relaxed),
            fallback_places_total: self.fallback_places_total.load(Ordering::Relaxed),
            backend_failures_total: self.backend_failures_total.load(Ordering::Relaxed),
            avg_latency_millis: if requests == 0 {
                0.0
            } else {
                latency as f64 / requests as f64
            },
        }
    }
}

pub fn init_tracing(service_name: &str) {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}=info,itinera_api=info,itinera_agents=info",
                service_name
            ))
        });

        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .with_span_list(true)
            .init();
    });
}
