use crate::models::{GeoPoint, Poi};

/// Anything that may sit on the map.
pub trait Located {
    fn location(&self) -> Option<GeoPoint>;
}

impl Located for GeoPoint {
    fn location(&self) -> Option<GeoPoint> {
        Some(*self)
    }
}

impl Located for Poi {
    fn location(&self) -> Option<GeoPoint> {
        self.geo_point()
    }
}

impl<T: Located> Located for &T {
    fn location(&self) -> Option<GeoPoint> {
        (*self).location()
    }
}

/// Great-circle distance in meters.
pub fn haversine_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    let km = haversine::distance(
        haversine::Location {
            latitude: a.lat,
            longitude: a.lon,
        },
        haversine::Location {
            latitude: b.lat,
            longitude: b.lon,
        },
        haversine::Units::Kilometers,
    );
    km * 1_000.0
}

fn distance_between<P: Located>(a: &P, b: &P) -> Option<f64> {
    Some(haversine_meters(a.location()?, b.location()?))
}

/// Greedy nearest-neighbour ordering starting from the first point.
///
/// Returns a permutation of `points`. Ties go to the earliest remaining
/// point. A point without coordinates is never preferred over one with a
/// measurable distance.
pub fn sequence<P: Located + Clone>(points: &[P]) -> Vec<P> {
    let mut remaining = points.to_vec();
    if remaining.is_empty() {
        return remaining;
    }

    let mut tour = Vec::with_capacity(remaining.len());
    tour.push(remaining.remove(0));

    while !remaining.is_empty() {
        let last = &tour[tour.len() - 1];
        let mut best_idx = 0;
        let mut best_dist = f64::INFINITY;

        for (idx, candidate) in remaining.iter().enumerate() {
            if let Some(dist) = distance_between(last, candidate) {
                if dist < best_dist {
                    best_dist = dist;
                    best_idx = idx;
                }
            }
        }

        tour.push(remaining.remove(best_idx));
    }

    tour
}

/// Total open-tour length in meters, skipping legs with a missing endpoint.
pub fn tour_length_meters<P: Located>(points: &[P]) -> f64 {
    points
        .windows(2)
        .filter_map(|pair| distance_between(&pair[0], &pair[1]))
        .sum()
}
