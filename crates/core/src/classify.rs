use serde::{Deserialize, Serialize};

use crate::models::Poi;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoiCategory {
    Attractions,
    Restaurants,
    Worship,
    Shopping,
    Others,
}

const KEYWORD_GROUPS: &[(PoiCategory, &[&str])] = &[
    (
        PoiCategory::Attractions,
        &["tourism", "attraction", "museum", "heritage", "park"],
    ),
    (PoiCategory::Restaurants, &["catering", "restaurant", "cafe"]),
    (
        PoiCategory::Worship,
        &["religion", "mosque", "temple", "church"],
    ),
    (PoiCategory::Shopping, &["shopping", "market", "mall"]),
];

pub fn category_of(category: &str) -> PoiCategory {
    let lower = category.to_lowercase();

    KEYWORD_GROUPS
        .iter()
        .find(|(_, keywords)| contains_any(&lower, keywords))
        .map(|(group, _)| *group)
        .unwrap_or(PoiCategory::Others)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryBuckets {
    pub attractions: Vec<Poi>,
    pub restaurants: Vec<Poi>,
    pub worship: Vec<Poi>,
    pub shopping: Vec<Poi>,
    pub others: Vec<Poi>,
}

impl CategoryBuckets {
    pub fn bucket(&self, category: PoiCategory) -> &[Poi] {
        match category {
            PoiCategory::Attractions => &self.attractions,
            PoiCategory::Restaurants => &self.restaurants,
            PoiCategory::Worship => &self.worship,
            PoiCategory::Shopping => &self.shopping,
            PoiCategory::Others => &self.others,
        }
    }

    fn bucket_mut(&mut self, category: PoiCategory) -> &mut Vec<Poi> {
        match category {
            PoiCategory::Attractions => &mut self.attractions,
            PoiCategory::Restaurants => &mut self.restaurants,
            PoiCategory::Worship => &mut self.worship,
            PoiCategory::Shopping => &mut self.shopping,
            PoiCategory::Others => &mut self.others,
        }
    }

    /// Attractions, then worship, then shopping.
    pub fn sights(&self) -> Vec<Poi> {
        self.attractions
            .iter()
            .chain(&self.worship)
            .chain(&self.shopping)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.attractions.len()
            + self.restaurants.len()
            + self.worship.len()
            + self.shopping.len()
            + self.others.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn classify(pois: &[Poi]) -> CategoryBuckets {
    let mut buckets = CategoryBuckets::default();
    for poi in pois {
        buckets.bucket_mut(category_of(&poi.category)).push(poi.clone());
    }
    buckets
}

fn contains_any(input: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| input.contains(needle))
}
