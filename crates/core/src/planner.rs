use std::collections::HashSet;

use chrono::{Days, NaiveDate};
use rand::RngExt;

use crate::classify::classify;
use crate::geo::sequence;
use crate::models::{Activity, DayPlan, Itinerary, Poi, ScheduleSlot};
use crate::request::{clean_interests, MAX_TRIP_DAYS};

pub const FALLBACK_LANDMARKS: [&str; 16] = [
    "Central Park",
    "City Museum",
    "Old Town Market",
    "Fort",
    "Riverfront Walk",
    "Food Street",
    "Art Gallery",
    "Heritage Walk",
    "Botanical Garden",
    "Science Center",
    "Palace",
    "Temple",
    "Night Bazaar",
    "Viewpoint",
    "Lakeside Promenade",
    "Street Food Lane",
];

const PLACEHOLDER_PLACES: [&str; 3] = ["place", "unnamed", "unknown"];

#[derive(Debug, Clone, Copy)]
enum Source {
    Eats,
    Sights,
}

/// One day: time, activity, and which list feeds the slot.
const DAILY_TEMPLATE: [(&str, Activity, Source); 6] = [
    ("08:30", Activity::Breakfast, Source::Eats),
    ("10:00", Activity::Sightseeing, Source::Sights),
    ("12:30", Activity::Lunch, Source::Eats),
    ("15:00", Activity::Sightseeing, Source::Sights),
    ("17:30", Activity::CafeTea, Source::Eats),
    ("19:30", Activity::Dinner, Source::Eats),
];

/// Round-robin over a list; yields nothing when the list is empty.
#[derive(Debug)]
struct CyclicCursor<'a> {
    items: &'a [Poi],
    next: usize,
}

impl<'a> CyclicCursor<'a> {
    fn new(items: &'a [Poi]) -> Self {
        Self { items, next: 0 }
    }

    fn take(&mut self) -> Option<&'a Poi> {
        if self.items.is_empty() {
            return None;
        }
        let item = &self.items[self.next % self.items.len()];
        self.next += 1;
        Some(item)
    }
}

/// Builds a multi-day schedule from the selected POIs and fills placeholder
/// places from the themed pool using the thread RNG.
pub fn build_itinerary(
    selected_pois: &[Poi],
    days: u32,
    start_date: NaiveDate,
    city: &str,
    interests: &[String],
) -> Itinerary {
    let mut rng = rand::rng();
    build_itinerary_with_picker(selected_pois, days, start_date, city, interests, |len| {
        rng.random_range(0..len)
    })
}

/// Same as [`build_itinerary`] with an explicit index picker for the filler.
pub fn build_itinerary_with_picker(
    selected_pois: &[Poi],
    days: u32,
    start_date: NaiveDate,
    city: &str,
    interests: &[String],
    pick: impl FnMut(usize) -> usize,
) -> Itinerary {
    let selection = dedup_by_name(selected_pois);
    let buckets = classify(&selection);
    let eats = buckets.restaurants.clone();
    let sights_ordered = sequence(&buckets.sights());

    let mut eat_cursor = CyclicCursor::new(&eats);
    let mut sight_cursor = CyclicCursor::new(&sights_ordered);

    // Days past the last representable date are dropped.
    let day_plans = (0..days)
        .map_while(|offset| {
            let date = start_date.checked_add_days(Days::new(u64::from(offset)))?;
            let schedule = DAILY_TEMPLATE
                .iter()
                .filter_map(|(time, activity, source)| {
                    let poi = match source {
                        Source::Eats => eat_cursor.take(),
                        Source::Sights => sight_cursor.take(),
                    }?;
                    Some(ScheduleSlot {
                        time: (*time).to_string(),
                        activity: activity.clone(),
                        place: poi.name.clone(),
                    })
                })
                .collect::<Vec<_>>();

            Some(DayPlan {
                day: offset + 1,
                date,
                notes: String::new(),
                schedule,
            })
        })
        .collect::<Vec<_>>();

    let mut itinerary = Itinerary {
        city: city.to_string(),
        interests: clean_interests(interests),
        weather: Vec::new(),
        all_pois: selection.clone(),
        selected_pois: selection,
        days: day_plans,
    };
    fill_missing_places_with(&mut itinerary, pick);
    itinerary
}

/// The sixteen themed stand-in names for a city.
pub fn fallback_places(city: &str) -> Vec<String> {
    let city = match city.trim() {
        "" => "City",
        trimmed => trimmed,
    };
    FALLBACK_LANDMARKS
        .iter()
        .map(|landmark| format!("{city} {landmark}"))
        .collect()
}

pub fn is_placeholder_place(place: &str) -> bool {
    let trimmed = place.trim().to_lowercase();
    trimmed.is_empty() || PLACEHOLDER_PLACES.contains(&trimmed.as_str())
}

pub fn fill_missing_places(itinerary: &mut Itinerary) -> usize {
    let mut rng = rand::rng();
    fill_missing_places_with(itinerary, |len| rng.random_range(0..len))
}

/// Replaces blank or placeholder places with a pick from the city's pool.
/// `pick` receives the pool size and returns an index. Returns how many
/// slots were filled.
pub fn fill_missing_places_with(
    itinerary: &mut Itinerary,
    mut pick: impl FnMut(usize) -> usize,
) -> usize {
    let pool = fallback_places(&itinerary.city);
    let mut filled = 0;

    for slot in itinerary
        .days
        .iter_mut()
        .flat_map(|day| day.schedule.iter_mut())
    {
        if is_placeholder_place(&slot.place) {
            slot.place = pool[pick(pool.len()) % pool.len()].clone();
            filled += 1;
        }
    }

    filled
}

/// Keeps the first POI per case-insensitive name. Nameless POIs have no
/// identity to collapse on and are all kept.
pub fn dedup_by_name(pois: &[Poi]) -> Vec<Poi> {
    let mut seen = HashSet::new();
    pois.iter()
        .filter(|poi| {
            let key = poi.name.trim().to_lowercase();
            key.is_empty() || seen.insert(key)
        })
        .cloned()
        .collect()
}

/// Fills each day's empty notes from the weather entry at the same index.
pub fn annotate_with_weather(itinerary: &Itinerary) -> Itinerary {
    let mut annotated = itinerary.clone();
    for (day, weather) in annotated.days.iter_mut().zip(&itinerary.weather) {
        if !day.notes.trim().is_empty() {
            continue;
        }
        let mut notes = weather.summary.clone();
        if let (Some(min), Some(max)) = (weather.temp_min, weather.temp_max) {
            notes.push_str(&format!(" (Min {min:.0}°C / Max {max:.0}°C)"));
        }
        day.notes = notes.trim().to_string();
    }
    annotated
}

#[derive(Debug, Clone, Default)]
pub struct SelectionOverrides {
    pub days: Option<u32>,
    pub start_date: Option<NaiveDate>,
    pub city: Option<String>,
    pub interests: Option<Vec<String>>,
}

/// Rebuilds a plan from a subset of a previous itinerary's POIs, inheriting
/// whatever the overrides leave open.
pub fn rebuild_from_selection(
    previous: &Itinerary,
    selected_names: &HashSet<String>,
    overrides: SelectionOverrides,
    today: NaiveDate,
) -> Itinerary {
    let selected = previous
        .all_pois
        .iter()
        .filter(|poi| selected_names.contains(&poi.name))
        .cloned()
        .collect::<Vec<_>>();

    let days = overrides
        .days
        .filter(|days| *days > 0)
        .or_else(|| u32::try_from(previous.days.len()).ok().filter(|n| *n > 0))
        .unwrap_or(2)
        .min(MAX_TRIP_DAYS);
    let start_date = overrides
        .start_date
        .or_else(|| previous.days.first().map(|day| day.date))
        .unwrap_or(today);
    let city = overrides
        .city
        .filter(|city| !city.trim().is_empty())
        .unwrap_or_else(|| previous.city.clone());
    let interests = overrides
        .interests
        .unwrap_or_else(|| previous.interests.clone());

    let mut itinerary = build_itinerary(&selected, days, start_date, &city, &interests);
    itinerary.weather = previous.weather.clone();
    itinerary.all_pois = previous.all_pois.clone();
    itinerary
}
