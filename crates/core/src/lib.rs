pub mod classify;
pub mod display;
pub mod error;
pub mod geo;
pub mod models;
pub mod planner;
pub mod query;
pub mod replan;
pub mod request;
pub mod sanitize;

pub use classify::{category_of, classify, CategoryBuckets, PoiCategory};
pub use display::{clean_for_display, prepare_for_display};
pub use error::PlannerError;
pub use geo::{haversine_meters, sequence, tour_length_meters, Located};
pub use models::*;
pub use planner::{
    annotate_with_weather, build_itinerary, build_itinerary_with_picker, dedup_by_name,
    fallback_places, fill_missing_places, fill_missing_places_with, is_placeholder_place,
    rebuild_from_selection, SelectionOverrides,
};
pub use query::{extract_days, match_city, match_start_date, parse, parse_with_today};
pub use replan::replan_by_distance;
pub use request::{parse_start_date, split_interests, MAX_TRIP_DAYS, MIN_TRIP_DAYS};
pub use sanitize::{sanitize, sanitize_or_fallback, NameTable};
