use anyhow::{bail, Context, Result};
use itinera_core::{Itinerary, NormalizedTrip, ReplanRequest};
use reqwest::Client;
use serde::Serialize;

use crate::config::{normalize_prefix, AgentConfig};

const ERROR_BODY_PREVIEW: usize = 200;

/// The remote service that selects POIs and returns a full itinerary.
pub trait PlanningBackend: Send + Sync {
    async fn plan_trip(&self, trip: &NormalizedTrip) -> Result<Itinerary>;
    async fn replan(&self, request: &ReplanRequest) -> Result<Itinerary>;
}

#[derive(Debug, Clone)]
pub struct HttpPlanningBackend {
    client: Client,
    base_url: String,
    prefix: String,
}

impl HttpPlanningBackend {
    pub fn new(config: &AgentConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.http_timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.backend_url.trim_end_matches('/').to_string(),
            prefix: normalize_prefix(&config.backend_prefix),
        })
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}/{}", self.base_url, self.prefix, path)
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<Itinerary> {
        let url = self.endpoint(path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("planning backend unreachable at {url}"))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let preview = text.chars().take(ERROR_BODY_PREVIEW).collect::<String>();
            bail!("planning backend returned {status}: {preview}");
        }

        response
            .json::<Itinerary>()
            .await
            .with_context(|| format!("malformed itinerary from {url}"))
    }
}

impl PlanningBackend for HttpPlanningBackend {
    async fn plan_trip(&self, trip: &NormalizedTrip) -> Result<Itinerary> {
        self.post("plan_trip", trip).await
    }

    async fn replan(&self, request: &ReplanRequest) -> Result<Itinerary> {
        self.post("replan", request).await
    }
}
