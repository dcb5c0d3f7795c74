mod backend;
mod config;
mod weather;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use itinera_core::{
    annotate_with_weather, clean_for_display, fill_missing_places, parse_with_today,
    rebuild_from_selection, replan_by_distance, Itinerary, NameTable, ParsedQuery, ReplanMode,
    ReplanRequest, SelectionOverrides, TripRequest, WeatherDay,
};
use itinera_observability::AppMetrics;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

pub use backend::{HttpPlanningBackend, PlanningBackend};
pub use config::{normalize_prefix, AgentConfig, DEFAULT_BACKEND_URL};
pub use weather::{
    aggregate_forecast, ForecastCondition, ForecastEntry, ForecastMain, OpenWeatherProvider,
    WeatherProvider, MAX_FORECAST_DAYS,
};

/// A trip request plus an optional free-text query that fills its gaps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanInput {
    #[serde(default)]
    pub query: String,
    #[serde(flatten)]
    pub trip: TripRequest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplanInput {
    #[serde(default)]
    pub query: String,
    #[serde(flatten)]
    pub request: ReplanRequest,
    /// Plan to reorder locally if the backend cannot replan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<Itinerary>,
}

#[derive(Clone)]
pub struct PlannerAgent<B, W>
where
    B: PlanningBackend,
    W: WeatherProvider,
{
    backend: Arc<B>,
    weather: Option<Arc<W>>,
    metrics: Arc<AppMetrics>,
}

impl<B, W> PlannerAgent<B, W>
where
    B: PlanningBackend,
    W: WeatherProvider,
{
    pub fn new(backend: Arc<B>, weather: Option<Arc<W>>, metrics: Arc<AppMetrics>) -> Self {
        Self {
            backend,
            weather,
            metrics,
        }
    }

    pub fn metrics(&self) -> Arc<AppMetrics> {
        self.metrics.clone()
    }

    #[instrument(skip(self))]
    pub fn parse_query(&self, query: &str, today: NaiveDate) -> ParsedQuery {
        self.metrics.inc_query_parsed();
        let parsed = parse_with_today(query, today);
        info!(
            city = parsed.city.as_deref().unwrap_or(""),
            days = ?parsed.days,
            start_date = ?parsed.start_date,
            "query parsed"
        );
        parsed
    }

    #[instrument(skip(self, input), fields(city = %input.trip.city))]
    pub async fn plan(&self, input: PlanInput, today: NaiveDate) -> Result<Itinerary> {
        let started = Instant::now();
        self.metrics.inc_request();

        let trip = self.merge_query(input.trip, &input.query, today);
        let normalized = trip.normalize(today)?;

        let itinerary = match self.backend.plan_trip(&normalized).await {
            Ok(itinerary) => itinerary,
            Err(error) => {
                self.metrics.inc_backend_failure();
                return Err(error.context("trip planning failed"));
            }
        };

        let prepared = self.finish(itinerary).await;
        self.metrics.inc_itinerary_built();
        self.metrics.observe_latency(started.elapsed());
        info!(
            city = %prepared.city,
            days = prepared.days.len(),
            pois = prepared.all_pois.len(),
            "itinerary planned"
        );

        Ok(prepared)
    }

    /// Asks the backend for a new plan. In distance mode a backend failure
    /// falls back to reordering `previous` locally.
    #[instrument(skip(self, input), fields(mode = ?input.request.mode))]
    pub async fn replan(&self, input: ReplanInput, today: NaiveDate) -> Result<Itinerary> {
        let started = Instant::now();
        self.metrics.inc_request();
        self.metrics.inc_replan();

        let ReplanInput {
            query,
            request,
            previous,
        } = input;
        let trip = self.merge_query(request.trip, &query, today);
        let normalized = trip.normalize(today)?;
        let request = ReplanRequest {
            trip: TripRequest::from(normalized),
            ..request
        };

        let itinerary = match self.backend.replan(&request).await {
            Ok(itinerary) => itinerary,
            Err(error) => {
                self.metrics.inc_backend_failure();
                match (request.mode, previous.as_ref()) {
                    (ReplanMode::Distance, Some(previous)) => {
                        warn!(error = %error, "backend replan failed, reordering locally");
                        replan_by_distance(previous)
                    }
                    _ => return Err(error.context("replanning failed")),
                }
            }
        };

        let prepared = self.finish(itinerary).await;
        self.metrics.observe_latency(started.elapsed());
        info!(
            city = %prepared.city,
            days = prepared.days.len(),
            "itinerary replanned"
        );

        Ok(prepared)
    }

    #[instrument(skip(self, previous, selected_names, overrides))]
    pub fn rebuild(
        &self,
        previous: &Itinerary,
        selected_names: &HashSet<String>,
        overrides: SelectionOverrides,
        today: NaiveDate,
    ) -> Itinerary {
        self.metrics.inc_request();
        let rebuilt = rebuild_from_selection(previous, selected_names, overrides, today);
        self.metrics.inc_itinerary_built();
        info!(
            selected = rebuilt.selected_pois.len(),
            days = rebuilt.days.len(),
            "itinerary rebuilt from selection"
        );
        rebuilt
    }

    pub async fn forecast(&self, city: &str) -> Result<Vec<WeatherDay>> {
        let provider = self
            .weather
            .as_ref()
            .context("weather provider is not configured")?;
        provider.forecast(city).await
    }

    fn merge_query(&self, trip: TripRequest, query: &str, today: NaiveDate) -> TripRequest {
        if query.trim().is_empty() {
            return trip;
        }
        let parsed = self.parse_query(query, today);
        trip.merge_parsed(&parsed)
    }

    async fn finish(&self, mut itinerary: Itinerary) -> Itinerary {
        if itinerary.weather.is_empty() {
            if let Some(provider) = self.weather.as_ref() {
                let forecast = provider.forecast(&itinerary.city).await;
                match forecast {
                    Ok(days) => itinerary.weather = days,
                    Err(error) => {
                        warn!(error = %error, city = %itinerary.city, "weather fallback failed")
                    }
                }
            }
        }

        let annotated = annotate_with_weather(&itinerary);
        let mut names = NameTable::new();
        let mut prepared = clean_for_display(&annotated, &mut names);
        let filled = fill_missing_places(&mut prepared);
        if filled > 0 {
            self.metrics.add_fallback_places(filled);
        }
        prepared
    }
}
