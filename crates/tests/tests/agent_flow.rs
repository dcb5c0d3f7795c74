use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use itinera_agents::{PlanInput, PlannerAgent, PlanningBackend, ReplanInput, WeatherProvider};
use itinera_core::{
    Itinerary, NormalizedTrip, PlannerError, ReplanMode, ReplanRequest, SelectionOverrides,
    TripRequest, WeatherDay,
};
use itinera_observability::AppMetrics;
use parking_lot::Mutex;
use serde_json::json;

#[derive(Default)]
struct FakeBackend {
    response: Option<Itinerary>,
    planned: Mutex<Vec<NormalizedTrip>>,
    replans: Mutex<Vec<ReplanRequest>>,
}

impl FakeBackend {
    fn answering(itinerary: Itinerary) -> Self {
        Self {
            response: Some(itinerary),
            ..Self::default()
        }
    }

    fn failing() -> Self {
        Self::default()
    }

    fn reply(&self) -> Result<Itinerary> {
        self.response
            .clone()
            .ok_or_else(|| anyhow!("backend returned 500 Internal Server Error"))
    }
}

impl PlanningBackend for FakeBackend {
    async fn plan_trip(&self, trip: &NormalizedTrip) -> Result<Itinerary> {
        self.planned.lock().push(trip.clone());
        self.reply()
    }

    async fn replan(&self, request: &ReplanRequest) -> Result<Itinerary> {
        self.replans.lock().push(request.clone());
        self.reply()
    }
}

struct FakeWeather {
    days: Vec<WeatherDay>,
    cities: Mutex<Vec<String>>,
}

impl FakeWeather {
    fn sunny() -> Self {
        Self {
            days: vec![WeatherDay {
                date: date(2024, 10, 12),
                temp_min: Some(11.2),
                temp_max: Some(19.8),
                summary: "clear sky".to_string(),
                icon: "01d".to_string(),
            }],
            cities: Mutex::new(Vec::new()),
        }
    }
}

impl WeatherProvider for FakeWeather {
    async fn forecast(&self, city: &str) -> Result<Vec<WeatherDay>> {
        self.cities.lock().push(city.to_string());
        Ok(self.days.clone())
    }
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn today() -> NaiveDate {
    date(2024, 1, 1)
}

fn paris_itinerary() -> Itinerary {
    serde_json::from_value(json!({
        "city": "Paris",
        "interests": ["food"],
        "all_pois": [
            { "name": "Café de Flore", "category": "catering.cafe", "lat": 48.854, "lon": 2.333 },
            { "name": "Louvre", "category": "tourism.attraction", "lat": 48.861, "lon": 2.336 },
            { "name": "Tour Eiffel", "category": "tourism.attraction", "lat": 48.858, "lon": 2.294 },
            { "name": "Musée d'Orsay", "category": "entertainment.museum", "lat": 48.860, "lon": 2.326 }
        ],
        "days": [{
            "day": 1,
            "date": "2024-10-12",
            "schedule": [
                { "time": "08:30", "activity": "Breakfast", "place": "Café de Flore" },
                { "time": "10:00", "activity": "Sightseeing", "place": "Tour Eiffel" },
                { "time": "12:30", "activity": "Lunch", "place": "Unknown" },
                { "time": "15:00", "activity": "Sightseeing", "place": "Louvre" },
                { "time": "17:00", "activity": "Sightseeing", "place": "Musée d'Orsay" }
            ]
        }]
    }))
    .unwrap()
}

fn agent(
    backend: FakeBackend,
    weather: Option<FakeWeather>,
) -> (PlannerAgent<FakeBackend, FakeWeather>, Arc<FakeBackend>) {
    let backend = Arc::new(backend);
    let agent = PlannerAgent::new(
        backend.clone(),
        weather.map(Arc::new),
        AppMetrics::shared(),
    );
    (agent, backend)
}

fn places(itinerary: &Itinerary) -> Vec<&str> {
    itinerary.days[0]
        .schedule
        .iter()
        .map(|slot| slot.place.as_str())
        .collect()
}

#[tokio::test]
async fn plan_merges_query_and_prepares_result() {
    let (agent, backend) = agent(
        FakeBackend::answering(paris_itinerary()),
        Some(FakeWeather::sunny()),
    );

    let input = PlanInput {
        query: "Plan a 3-day trip to Paris starting from 12th Oct".to_string(),
        trip: TripRequest {
            interests: vec!["food".to_string(), " art ".to_string()],
            ..TripRequest::default()
        },
    };
    let itinerary = agent.plan(input, today()).await.unwrap();

    let planned = backend.planned.lock().clone();
    assert_eq!(planned.len(), 1);
    assert_eq!(planned[0].city, "Paris");
    assert_eq!(planned[0].days, 3);
    assert_eq!(planned[0].start_date, date(2024, 10, 12));
    assert_eq!(planned[0].interests, vec!["food", "art"]);

    assert_eq!(itinerary.weather.len(), 1);
    assert_eq!(itinerary.days[0].notes, "clear sky (Min 11°C / Max 20°C)");
    assert_eq!(itinerary.all_pois[0].name, "Cafe de Flore");

    let places = places(&itinerary);
    assert_eq!(places[0], "Cafe de Flore");
    assert!(places[2].starts_with("Paris "), "filler was {}", places[2]);
    assert_eq!(places[4], "Musee d'Orsay");

    let snapshot = agent.metrics().snapshot();
    assert_eq!(snapshot.queries_parsed_total, 1);
    assert_eq!(snapshot.itineraries_built_total, 1);
    assert_eq!(snapshot.fallback_places_total, 1);
    assert_eq!(snapshot.backend_failures_total, 0);
}

#[tokio::test]
async fn explicit_fields_win_over_the_query() {
    let (agent, backend) = agent(FakeBackend::answering(paris_itinerary()), None);

    let input = PlanInput {
        query: "5 days in Rome".to_string(),
        trip: TripRequest {
            city: "Paris".to_string(),
            days: Some(42),
            start_date: Some("next week".to_string()),
            interests: Vec::new(),
        },
    };
    agent.plan(input, today()).await.unwrap();

    let planned = backend.planned.lock().clone();
    assert_eq!(planned[0].city, "Paris");
    assert_eq!(planned[0].days, 10);
    assert_eq!(planned[0].start_date, date(2024, 1, 8));
}

#[tokio::test]
async fn backend_weather_is_not_replaced() {
    let mut itinerary = paris_itinerary();
    itinerary.weather = vec![WeatherDay {
        date: date(2024, 10, 12),
        temp_min: None,
        temp_max: None,
        summary: "Backend drizzle".to_string(),
        icon: String::new(),
    }];
    let weather = FakeWeather::sunny();
    let backend = Arc::new(FakeBackend::answering(itinerary));
    let weather = Arc::new(weather);
    let agent = PlannerAgent::new(backend, Some(weather.clone()), AppMetrics::shared());

    let input = PlanInput {
        trip: TripRequest {
            city: "Paris".to_string(),
            ..TripRequest::default()
        },
        ..PlanInput::default()
    };
    let planned = agent.plan(input, today()).await.unwrap();

    assert!(weather.cities.lock().is_empty());
    assert_eq!(planned.days[0].notes, "Backend drizzle");
}

#[tokio::test]
async fn missing_city_is_rejected_before_the_backend() {
    let (agent, backend) = agent(FakeBackend::answering(paris_itinerary()), None);

    let error = agent
        .plan(PlanInput::default(), today())
        .await
        .expect_err("city is required");

    assert_eq!(
        error.downcast_ref::<PlannerError>(),
        Some(&PlannerError::MissingCity)
    );
    assert!(backend.planned.lock().is_empty());
}

#[tokio::test]
async fn backend_failure_is_counted_and_returned() {
    let (agent, _) = agent(FakeBackend::failing(), None);

    let input = PlanInput {
        query: "weekend in Lisbon".to_string(),
        ..PlanInput::default()
    };
    let error = agent.plan(input, today()).await.expect_err("backend is down");

    assert!(format!("{error:#}").contains("500"));
    assert!(error.downcast_ref::<PlannerError>().is_none());
    assert_eq!(agent.metrics().snapshot().backend_failures_total, 1);
}

#[tokio::test]
async fn replan_forwards_options_to_backend() {
    let (agent, backend) = agent(FakeBackend::answering(paris_itinerary()), None);

    let input = ReplanInput {
        query: String::new(),
        request: ReplanRequest {
            trip: TripRequest {
                city: "Paris".to_string(),
                days: Some(2),
                start_date: Some("2024-10-12".to_string()),
                interests: vec!["art".to_string()],
            },
            shuffle: false,
            seed: Some(7),
            mode: ReplanMode::Default,
        },
        previous: None,
    };
    agent.replan(input, today()).await.unwrap();

    let sent = backend.replans.lock().clone();
    assert_eq!(sent.len(), 1);
    assert!(!sent[0].shuffle);
    assert_eq!(sent[0].seed, Some(7));
    assert_eq!(sent[0].trip.days, Some(2));
    assert_eq!(sent[0].trip.start_date.as_deref(), Some("2024-10-12"));
    assert_eq!(agent.metrics().snapshot().replans_total, 1);
}

#[tokio::test]
async fn distance_replan_falls_back_to_local_ordering() {
    let (agent, _) = agent(FakeBackend::failing(), None);

    let input = ReplanInput {
        query: String::new(),
        request: ReplanRequest {
            trip: TripRequest {
                city: "Paris".to_string(),
                ..TripRequest::default()
            },
            shuffle: true,
            seed: None,
            mode: ReplanMode::Distance,
        },
        previous: Some(paris_itinerary()),
    };
    let itinerary = agent.replan(input, today()).await.unwrap();

    // Eiffel -> Orsay -> Louvre is the nearest-neighbour walk
    let places = places(&itinerary);
    assert_eq!(places[1], "Tour Eiffel");
    assert_eq!(places[3], "Musee d'Orsay");
    assert_eq!(places[4], "Louvre");
    assert_eq!(itinerary.days[0].schedule[3].time, "15:00");
}

#[tokio::test]
async fn default_replan_does_not_fall_back() {
    let (agent, _) = agent(FakeBackend::failing(), None);

    let input = ReplanInput {
        query: String::new(),
        request: ReplanRequest {
            trip: TripRequest {
                city: "Paris".to_string(),
                ..TripRequest::default()
            },
            shuffle: true,
            seed: None,
            mode: ReplanMode::Default,
        },
        previous: Some(paris_itinerary()),
    };

    assert!(agent.replan(input, today()).await.is_err());
}

#[tokio::test]
async fn rebuild_keeps_the_full_pool() {
    let (agent, _) = agent(FakeBackend::failing(), None);
    let previous = paris_itinerary();

    let selected = ["Louvre", "Tour Eiffel"]
        .iter()
        .map(ToString::to_string)
        .collect::<HashSet<_>>();
    let rebuilt = agent.rebuild(
        &previous,
        &selected,
        SelectionOverrides {
            days: Some(2),
            ..SelectionOverrides::default()
        },
        today(),
    );

    assert_eq!(rebuilt.days.len(), 2);
    assert_eq!(rebuilt.days[1].date, date(2024, 10, 13));
    assert_eq!(rebuilt.selected_pois.len(), 2);
    assert_eq!(rebuilt.all_pois, previous.all_pois);
    assert!(rebuilt
        .days
        .iter()
        .flat_map(|day| &day.schedule)
        .all(|slot| slot.activity.is_sightseeing()));
}

#[tokio::test]
async fn forecast_requires_a_provider() {
    let (agent, _) = agent(FakeBackend::failing(), None);
    assert!(agent.forecast("Paris").await.is_err());

    let (agent, _) = agent_with_weather();
    assert_eq!(agent.forecast("Paris").await.unwrap().len(), 1);
}

fn agent_with_weather() -> (PlannerAgent<FakeBackend, FakeWeather>, Arc<FakeBackend>) {
    agent(FakeBackend::failing(), Some(FakeWeather::sunny()))
}
