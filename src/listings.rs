// Browse filters and local search over fetched listings.

use serde::{Deserialize, Serialize};

use crate::models::ListingSummary;

pub const CONDITIONS: [&str; 2] = ["New", "Used"];
pub const BODY_TYPES: [&str; 6] = ["SUV", "Sedan", "Hatchback", "Pickup", "Coupe", "Minivan"];
pub const FUEL_TYPES: [&str; 4] = ["Gasoline", "Diesel", "Electric", "Hybrid"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingQuery {
    pub q: Option<String>,
    pub condition: Option<String>,
    pub body_type: Option<String>,
    pub fuel_type: Option<String>,
}

impl ListingQuery {
    // Only non-empty filters are sent
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        [
            ("q", &self.q),
            ("condition", &self.condition),
            ("body_type", &self.body_type),
            ("fuel_type", &self.fuel_type),
        ]
        .into_iter()
        .filter_map(|(key, value)| {
            let value = value.as_deref()?.trim();
            (!value.is_empty()).then(|| (key, value.to_string()))
        })
        .collect()
    }

    pub fn clear_filters(&mut self) {
        self.condition = None;
        self.body_type = None;
        self.fuel_type = None;
    }
}

/// Case-insensitive match of `needle` against "year make model".
pub fn filter_listings<'a>(listings: &'a [ListingSummary], needle: &str) -> Vec<&'a ListingSummary> {
    let needle = needle.trim().to_lowercase();
    if needle.is_empty() {
        return listings.iter().collect();
    }
    listings
        .iter()
        .filter(|listing| listing.title().to_lowercase().contains(&needle))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ListingType;

    fn listing(id: &str, year: i32, make: &str, model: &str) -> ListingSummary {
        ListingSummary {
            id: id.into(),
            year,
            make: make.into(),
            model: model.into(),
            price: "N/A".into(),
            price_value: None,
            mileage: 0,
            listing_type: ListingType::Sale,
            image: None,
        }
    }

    #[test]
    fn query_pairs_skip_blank_filters() {
        let query = ListingQuery {
            q: Some("byd".into()),
            condition: Some("  ".into()),
            body_type: Some("SUV".into()),
            fuel_type: None,
        };
        assert_eq!(
            query.to_query_pairs(),
            vec![("q", "byd".to_string()), ("body_type", "SUV".to_string())]
        );
    }

    #[test]
    fn clearing_filters_keeps_the_search_text() {
        let mut query = ListingQuery {
            q: Some("ioniq".into()),
            condition: Some(CONDITIONS[0].into()),
            body_type: Some(BODY_TYPES[0].into()),
            fuel_type: Some(FUEL_TYPES[2].into()),
        };
        query.clear_filters();
        assert_eq!(query.to_query_pairs(), vec![("q", "ioniq".to_string())]);
    }

    #[test]
    fn local_search_matches_title_case_insensitively() {
        let listings = vec![
            listing("1", 2022, "Hyundai", "Ioniq 5"),
            listing("3", 2023, "BYD", "Atto 3"),
        ];
        let hits = filter_listings(&listings, "atto");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "3");
        assert_eq!(filter_listings(&listings, "2022 hyundai").len(), 1);
        assert_eq!(filter_listings(&listings, "").len(), 2);
    }
}
