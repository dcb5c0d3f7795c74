use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use itinera_core::WeatherDay;
use reqwest::Client;
use serde::Deserialize;

pub const OPENWEATHER_FORECAST_URL: &str = "https://api.openweathermap.org/data/2.5/forecast";
pub const MAX_FORECAST_DAYS: usize = 5;

const MISSING_SUMMARY: &str = "n/a";

/// Daily forecast for a city, used when the backend sends no weather.
pub trait WeatherProvider: Send + Sync {
    async fn forecast(&self, city: &str) -> Result<Vec<WeatherDay>>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastEntry {
    pub dt_txt: String,
    pub main: ForecastMain,
    #[serde(default)]
    pub weather: Vec<ForecastCondition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastMain {
    pub temp_min: f64,
    pub temp_max: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForecastCondition {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    list: Vec<ForecastEntry>,
}

/// Folds 3-hour entries into days: lowest min, highest max, and the first
/// entry's description. Dates keep their first-seen order, capped at
/// [`MAX_FORECAST_DAYS`]. Entries with an unreadable `dt_txt` are skipped.
pub fn aggregate_forecast(entries: &[ForecastEntry]) -> Vec<WeatherDay> {
    let mut days: Vec<WeatherDay> = Vec::new();

    for entry in entries {
        let Some(date) = entry_date(&entry.dt_txt) else {
            continue;
        };

        if let Some(day) = days.iter_mut().find(|day| day.date == date) {
            day.temp_min = Some(day.temp_min.map_or(entry.main.temp_min, |min| {
                min.min(entry.main.temp_min)
            }));
            day.temp_max = Some(day.temp_max.map_or(entry.main.temp_max, |max| {
                max.max(entry.main.temp_max)
            }));
            continue;
        }

        if days.len() == MAX_FORECAST_DAYS {
            continue;
        }

        let condition = entry.weather.first().cloned().unwrap_or_default();
        let summary = match condition.description.trim() {
            "" => MISSING_SUMMARY.to_string(),
            description => description.to_string(),
        };
        days.push(WeatherDay {
            date,
            temp_min: Some(entry.main.temp_min),
            temp_max: Some(entry.main.temp_max),
            summary,
            icon: condition.icon,
        });
    }

    days
}

fn entry_date(dt_txt: &str) -> Option<NaiveDate> {
    let day = dt_txt.split_whitespace().next()?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    client: Client,
    api_key: String,
    forecast_url: String,
}

impl OpenWeatherProvider {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            forecast_url: OPENWEATHER_FORECAST_URL.to_string(),
        })
    }
}

impl WeatherProvider for OpenWeatherProvider {
    async fn forecast(&self, city: &str) -> Result<Vec<WeatherDay>> {
        let city = city.trim();
        if city.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .get(&self.forecast_url)
            .query(&[("q", city), ("appid", self.api_key.as_str()), ("units", "metric")])
            .send()
            .await
            .context("weather service unreachable")?;

        let status = response.status();
        if !status.is_success() {
            bail!("weather service returned {status} for '{city}'");
        }

        let payload = response
            .json::<ForecastResponse>()
            .await
            .context("malformed forecast payload")?;
        Ok(aggregate_forecast(&payload.list))
    }
}
