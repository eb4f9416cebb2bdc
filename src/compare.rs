//! Vehicle comparison: best-value highlighting across a small set of listings.
//!
//! The backend is the authority for best values. When it omits them the same
//! rules are applied locally:
//!
//! * price: lowest parsed price wins; unparsable prices never win
//! * year: newest model year wins
//! * mileage: lowest mileage wins
//!
//! Ties keep every tied listing.

use std::cmp::Ordering;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator};
use tokio_util::sync::CancellationToken;

use crate::{
    api::ApiClient,
    error::{ClientError, ClientResult},
    models::{deserialize_ids, ListingId, ListingSummary},
};

/// A price reduced to a comparable number.
///
/// `Unpriced` stands for +infinity: it orders after every amount, so it can
/// only win a minimisation when nothing else is priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Price {
    Amount(u64),
    Unpriced,
}

/// Keeps only the digits of a display price such as
/// `"Current Bid: 3,100,000 ETB"` and parses them.
pub fn parse_price(text: &str) -> Price {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    match digits.parse::<u64>() {
        Ok(amount) => Price::Amount(amount),
        Err(_) => {
            tracing::debug!(price = text, "Price has no usable digits, treating as unpriced");
            Price::Unpriced
        }
    }
}

impl ListingSummary {
    // Raw numeric value when present, otherwise the parsed display string
    pub fn comparable_price(&self) -> Price {
        match self.price_value {
            Some(amount) => Price::Amount(amount),
            None => parse_price(&self.price),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Minimize,
    Maximize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Dimension {
    Price,
    Year,
    Mileage,
}

impl Dimension {
    pub fn direction(self) -> Direction {
        match self {
            Dimension::Price | Dimension::Mileage => Direction::Minimize,
            Dimension::Year => Direction::Maximize,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Winners {
    #[serde(deserialize_with = "deserialize_ids")]
    pub ids: Vec<ListingId>,
}

impl Winners {
    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|winner| winner == id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BestValues {
    pub price: Winners,
    pub year: Winners,
    pub mileage: Winners,
}

/// The backend's `best_values` object. Any dimension may be left out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ServerBestValues {
    #[serde(default)]
    pub price: Option<Winners>,
    #[serde(default)]
    pub year: Option<Winners>,
    #[serde(default)]
    pub mileage: Option<Winners>,
}

impl ServerBestValues {
    /// Fills every dimension the server left out from `cars`.
    pub fn complete(self, cars: &[ListingSummary]) -> (BestValues, BestValuesSource) {
        let provided = [self.price.is_some(), self.year.is_some(), self.mileage.is_some()]
            .into_iter()
            .filter(|&given| given)
            .count();
        let source = match provided {
            0 => BestValuesSource::Client,
            3 => BestValuesSource::Server,
            _ => BestValuesSource::Mixed,
        };
        let local = match source {
            BestValuesSource::Server => BestValues::default(),
            _ => compute_best_values(cars),
        };
        let best_values = BestValues {
            price: self.price.unwrap_or(local.price),
            year: self.year.unwrap_or(local.year),
            mileage: self.mileage.unwrap_or(local.mileage),
        };
        (best_values, source)
    }
}

impl BestValues {
    pub fn winners(&self, dimension: Dimension) -> &Winners {
        match dimension {
            Dimension::Price => &self.price,
            Dimension::Year => &self.year,
            Dimension::Mileage => &self.mileage,
        }
    }

    pub fn is_best(&self, dimension: Dimension, id: &str) -> bool {
        self.winners(dimension).contains(id)
    }

    // Dimensions in which this listing is the best value
    pub fn highlights(&self, id: &str) -> Vec<Dimension> {
        Dimension::iter().filter(|d| self.is_best(*d, id)).collect()
    }
}

// Ids of every listing holding the extreme key. `cars` must be deduplicated.
fn extreme_ids<K: Ord + Copy>(
    cars: &[&ListingSummary],
    direction: Direction,
    key: impl Fn(&ListingSummary) -> K,
) -> Vec<ListingId> {
    let pick = |a: K, b: K| match (direction, a.cmp(&b)) {
        (Direction::Minimize, Ordering::Greater) | (Direction::Maximize, Ordering::Less) => b,
        _ => a,
    };
    let Some(best) = cars.iter().map(|&c| key(c)).reduce(pick) else {
        return Vec::new();
    };
    cars.iter()
        .filter(|&&c| key(c) == best)
        .map(|c| c.id.clone())
        .collect()
}

// First occurrence of each id wins; later duplicates are ignored
fn distinct_listings(cars: &[ListingSummary]) -> Vec<&ListingSummary> {
    let mut seen = HashSet::new();
    cars.iter()
        .filter(|car| {
            let fresh = seen.insert(car.id.as_str());
            if !fresh {
                tracing::warn!(id = %car.id, "Duplicate listing id in comparison, ignoring repeat");
            }
            fresh
        })
        .collect()
}

/// Computes the winner ids for price, year and mileage.
pub fn compute_best_values(cars: &[ListingSummary]) -> BestValues {
    let cars = distinct_listings(cars);
    BestValues {
        price: Winners {
            ids: extreme_ids(&cars, Dimension::Price.direction(), |c| c.comparable_price()),
        },
        year: Winners {
            ids: extreme_ids(&cars, Dimension::Year.direction(), |c| c.year),
        },
        mileage: Winners {
            ids: extreme_ids(&cars, Dimension::Mileage.direction(), |c| c.mileage),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BestValuesSource {
    Server,
    Client,
    // Server sent some dimensions, the rest were computed here
    Mixed,
}

#[derive(Debug, Clone)]
pub struct Comparison {
    pub cars: Vec<ListingSummary>,
    pub best_values: BestValues,
    pub source: BestValuesSource,
}

impl Comparison {
    // Purely local comparison of already-fetched listings
    pub fn from_listings(cars: Vec<ListingSummary>) -> Self {
        let best_values = compute_best_values(&cars);
        Comparison { cars, best_values, source: BestValuesSource::Client }
    }

    /// Fetches the requested listings and their best values.
    ///
    /// Fails as a whole if any requested id is missing from the response.
    /// Ids are trimmed and blanks dropped before the limit is checked.
    pub async fn run(
        client: &ApiClient,
        ids: &[ListingId],
        limit: usize,
        cancel: &CancellationToken,
    ) -> ClientResult<Self> {
        let mut seen = HashSet::new();
        let ids: Vec<ListingId> = ids
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty() && seen.insert(*id))
            .map(str::to_string)
            .collect();

        if ids.is_empty() {
            return Ok(Comparison::from_listings(Vec::new()));
        }
        if ids.len() > limit {
            return Err(ClientError::invalid(
                "ids",
                format!("You can only compare up to {} cars at a time.", limit),
            ));
        }

        let response = client.compare(&ids, cancel).await?;

        // Order by the requested ids; anything we did not ask for is dropped
        let mut cars = Vec::with_capacity(ids.len());
        let mut missing = Vec::new();
        for id in &ids {
            match response.cars.iter().find(|c| &c.id == id) {
                Some(car) => cars.push(car.clone()),
                None => missing.push(id.clone()),
            }
        }
        if !missing.is_empty() {
            tracing::warn!(?missing, "Comparison response is missing requested listings");
            return Err(ClientError::IncompleteComparison { missing });
        }

        let (best_values, source) = response.best_values.unwrap_or_default().complete(&cars);
        match source {
            BestValuesSource::Server => {
                tracing::info!(count = cars.len(), "Comparison loaded with server best values")
            }
            _ => tracing::warn!(?source, "Backend omitted some best values, computing them locally"),
        }
        Ok(Comparison { cars, best_values, source })
    }
}

/// The compare tray on the browse screen.
#[derive(Debug, Clone)]
pub struct CompareSelection {
    ids: Vec<ListingId>,
    limit: usize,
}

impl CompareSelection {
    pub fn new(limit: usize) -> Self {
        CompareSelection { ids: Vec::new(), limit }
    }

    /// Adds or removes `id`. Returns whether it is selected afterwards.
    /// Adding past the limit is rejected and leaves the tray unchanged.
    pub fn toggle(&mut self, id: &str) -> ClientResult<bool> {
        if let Some(pos) = self.ids.iter().position(|existing| existing == id) {
            self.ids.remove(pos);
            return Ok(false);
        }
        if self.ids.len() >= self.limit {
            return Err(ClientError::invalid(
                "ids",
                format!("You can only compare up to {} cars at a time.", self.limit),
            ));
        }
        self.ids.push(id.to_string());
        Ok(true)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|existing| existing == id)
    }

    pub fn can_compare(&self) -> bool {
        self.ids.len() >= 2
    }

    pub fn ids(&self) -> &[ListingId] {
        &self.ids
    }

    // Value of the `car_ids` navigation parameter
    pub fn ids_param(&self) -> String {
        self.ids.join(",")
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }
}
