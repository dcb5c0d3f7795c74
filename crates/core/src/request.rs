use std::collections::HashSet;

use chrono::NaiveDate;

use crate::error::PlannerError;
use crate::models::{NormalizedTrip, ParsedQuery, TripRequest};
use crate::query::match_start_date;

pub const MIN_TRIP_DAYS: u32 = 1;
pub const MAX_TRIP_DAYS: u32 = 10;

impl TripRequest {
    /// Fills a request from parsed text, keeping anything already set.
    pub fn merge_parsed(mut self, parsed: &ParsedQuery) -> Self {
        if self.city.trim().is_empty() {
            if let Some(city) = &parsed.city {
                self.city = city.clone();
            }
        }
        if self.days.is_none() {
            self.days = parsed.days.map(i64::from);
        }
        if self.start_date.is_none() {
            self.start_date = parsed.start_date.map(|date| date.to_string());
        }
        self
    }

    /// Validates the request the way the planning backend does.
    pub fn normalize(&self, today: NaiveDate) -> Result<NormalizedTrip, PlannerError> {
        let city = self.city.trim();
        if city.is_empty() {
            return Err(PlannerError::MissingCity);
        }

        let days = self
            .days
            .unwrap_or(i64::from(MIN_TRIP_DAYS))
            .clamp(i64::from(MIN_TRIP_DAYS), i64::from(MAX_TRIP_DAYS)) as u32;

        let start_date = self
            .start_date
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .and_then(|raw| parse_start_date(raw, today))
            .unwrap_or(today);

        Ok(NormalizedTrip {
            city: city.to_string(),
            days,
            start_date,
            interests: clean_interests(&self.interests),
        })
    }
}

impl From<NormalizedTrip> for TripRequest {
    fn from(trip: NormalizedTrip) -> Self {
        Self {
            city: trip.city,
            days: Some(i64::from(trip.days)),
            start_date: Some(trip.start_date.to_string()),
            interests: trip.interests,
        }
    }
}

/// ISO first, then the natural-language date rules.
pub fn parse_start_date(raw: &str, today: NaiveDate) -> Option<NaiveDate> {
    parse_iso_date(raw)
        .ok()
        .or_else(|| match_start_date(raw, today).map(|hit| hit.value))
}

/// Strict `YYYY-MM-DD` with a four-digit year.
pub fn parse_iso_date(raw: &str) -> Result<NaiveDate, PlannerError> {
    let trimmed = raw.trim();
    let bytes = trimmed.as_bytes();
    let shaped = bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(idx, byte)| idx == 4 || idx == 7 || byte.is_ascii_digit());
    if !shaped {
        return Err(PlannerError::InvalidDate(raw.to_string()));
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map_err(|_| PlannerError::InvalidDate(raw.to_string()))
}

/// Splits free text on commas, semicolons and newlines.
pub fn split_interests(text: &str) -> Vec<String> {
    text.split([',', ';', '\n'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Trims, drops blanks and keeps the first spelling of each interest,
/// comparing case-insensitively.
pub(crate) fn clean_interests(interests: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    interests
        .iter()
        .map(|interest| interest.trim())
        .filter(|interest| !interest.is_empty())
        .filter(|interest| seen.insert(interest.to_lowercase()))
        .map(ToString::to_string)
        .collect()
}
