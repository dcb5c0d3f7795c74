use crate::models::{Itinerary, Poi};
use crate::planner::fill_missing_places_with;
use crate::sanitize::{sanitize_raw, NameTable};

/// Cleans an itinerary for display.
///
/// POI names are registered in `names` before being replaced by their
/// sanitized labels, so schedule places that only sanitize to nothing can
/// still be resolved. Placeholder places are then filled from the city pool.
pub fn prepare_for_display(
    itinerary: &Itinerary,
    names: &mut NameTable,
    pick: impl FnMut(usize) -> usize,
) -> Itinerary {
    let mut prepared = clean_for_display(itinerary, names);
    fill_missing_places_with(&mut prepared, pick);
    prepared
}

/// Sanitizes POIs and schedule places without filling placeholders.
pub fn clean_for_display(itinerary: &Itinerary, names: &mut NameTable) -> Itinerary {
    let mut prepared = itinerary.clone();

    for poi in &itinerary.all_pois {
        names.register_poi(&poi.name, &poi.category);
    }

    prepared.all_pois = clean_pois(&itinerary.all_pois, names);
    prepared.selected_pois = clean_pois(&itinerary.selected_pois, names);

    for slot in prepared
        .days
        .iter_mut()
        .flat_map(|day| day.schedule.iter_mut())
    {
        slot.place = names.resolve(&slot.place);
    }

    prepared
}

fn clean_pois(pois: &[Poi], names: &mut NameTable) -> Vec<Poi> {
    pois.iter()
        .map(|poi| {
            let name = match names.label_for(&poi.name) {
                Some(label) => label.to_string(),
                None => names.register_poi(&poi.name, &poi.category),
            };
            Poi {
                name,
                category: sanitize_raw(&poi.category),
                ..poi.clone()
            }
        })
        .collect()
}
