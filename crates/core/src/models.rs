use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poi {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

impl Poi {
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            lat: None,
            lon: None,
        }
    }

    pub fn at(mut self, lat: f64, lon: f64) -> Self {
        self.lat = Some(lat);
        self.lon = Some(lon);
        self
    }

    /// Coordinates when both are present and on the globe.
    pub fn geo_point(&self) -> Option<GeoPoint> {
        let point = GeoPoint::new(self.lat?, self.lon?);
        point.is_valid().then_some(point)
    }
}

/// Fields pulled out of a free-form trip request. `None` means the parser
/// found nothing, never a default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
}

impl ParsedQuery {
    pub fn is_empty(&self) -> bool {
        self.city.is_none() && self.days.is_none() && self.start_date.is_none()
    }
}

/// Activity label of a schedule slot. Labels produced by other planners are
/// carried through untouched as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Activity {
    Breakfast,
    Sightseeing,
    Lunch,
    CafeTea,
    Dinner,
    Other(String),
}

impl Activity {
    pub fn label(&self) -> &str {
        match self {
            Self::Breakfast => "Breakfast",
            Self::Sightseeing => "Sightseeing",
            Self::Lunch => "Lunch",
            Self::CafeTea => "Cafe/Tea",
            Self::Dinner => "Dinner",
            Self::Other(label) => label,
        }
    }

    pub fn is_sightseeing(&self) -> bool {
        self.label().to_lowercase().contains("sight")
    }
}

impl From<String> for Activity {
    fn from(value: String) -> Self {
        match value.trim() {
            "Breakfast" => Self::Breakfast,
            "Sightseeing" => Self::Sightseeing,
            "Lunch" => Self::Lunch,
            "Cafe/Tea" => Self::CafeTea,
            "Dinner" => Self::Dinner,
            _ => Self::Other(value),
        }
    }
}

impl From<Activity> for String {
    fn from(value: Activity) -> Self {
        match value {
            Activity::Other(label) => label,
            known => known.label().to_string(),
        }
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSlot {
    pub time: String,
    pub activity: Activity,
    #[serde(default)]
    pub place: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayPlan {
    pub day: u32,
    pub date: NaiveDate,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub schedule: Vec<ScheduleSlot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherDay {
    pub date: NaiveDate,
    #[serde(default)]
    pub temp_min: Option<f64>,
    #[serde(default)]
    pub temp_max: Option<f64>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Itinerary {
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub weather: Vec<WeatherDay>,
    #[serde(default)]
    pub all_pois: Vec<Poi>,
    #[serde(default)]
    pub selected_pois: Vec<Poi>,
    #[serde(default)]
    pub days: Vec<DayPlan>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplanMode {
    #[default]
    Default,
    Distance,
}

/// Input document of the external planning backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TripRequest {
    #[serde(default)]
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default)]
    pub interests: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplanRequest {
    #[serde(flatten)]
    pub trip: TripRequest,
    #[serde(default = "default_shuffle")]
    pub shuffle: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default)]
    pub mode: ReplanMode,
}

fn default_shuffle() -> bool {
    true
}

/// A `TripRequest` after validation: every field is concrete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedTrip {
    pub city: String,
    pub days: u32,
    pub start_date: NaiveDate,
    pub interests: Vec<String>,
}
