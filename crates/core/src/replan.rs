use std::collections::HashMap;

use crate::geo::{sequence, Located};
use crate::models::{GeoPoint, Itinerary, Poi};

#[derive(Debug, Clone)]
struct SightStop {
    name: String,
    point: GeoPoint,
}

impl Located for SightStop {
    fn location(&self) -> Option<GeoPoint> {
        Some(self.point)
    }
}

fn coordinates_by_name(pois: &[Poi]) -> HashMap<&str, GeoPoint> {
    pois.iter()
        .filter(|poi| !poi.name.is_empty())
        .filter_map(|poi| poi.geo_point().map(|point| (poi.name.as_str(), point)))
        .collect()
}

/// Re-orders each day's sightseeing places by nearest neighbour.
///
/// Only the `place` of sightseeing slots whose place has coordinates in
/// `all_pois` moves; times, activities and every other slot stay put. Days
/// with fewer than two such slots are copied unchanged.
pub fn replan_by_distance(itinerary: &Itinerary) -> Itinerary {
    let lookup = coordinates_by_name(&itinerary.all_pois);
    let mut replanned = itinerary.clone();

    for day in &mut replanned.days {
        let (indices, stops): (Vec<usize>, Vec<SightStop>) = day
            .schedule
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.activity.is_sightseeing())
            .filter_map(|(idx, slot)| {
                lookup.get(slot.place.as_str()).map(|point| {
                    (
                        idx,
                        SightStop {
                            name: slot.place.clone(),
                            point: *point,
                        },
                    )
                })
            })
            .unzip();

        if stops.len() < 2 {
            continue;
        }

        for (idx, stop) in indices.into_iter().zip(sequence(&stops)) {
            day.schedule[idx].place = stop.name;
        }
    }

    replanned
}
