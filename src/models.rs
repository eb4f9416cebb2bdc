// Data structures exchanged with the marketplace backend.

use serde::{Deserialize, Deserializer, Serialize};

use crate::auth::User;

/// Listing identifiers are normalised to strings; the backend sends integers
/// on some endpoints and strings on others.
pub type ListingId = String;

// Wire form of an id before normalisation
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum WireId {
    Number(u64),
    Text(String),
}

impl From<WireId> for ListingId {
    fn from(id: WireId) -> Self {
        match id {
            WireId::Number(n) => n.to_string(),
            WireId::Text(s) => s,
        }
    }
}

pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<ListingId, D::Error>
where
    D: Deserializer<'de>,
{
    WireId::deserialize(deserializer).map(Into::into)
}

pub(crate) fn deserialize_opt_id<'de, D>(deserializer: D) -> Result<Option<ListingId>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<WireId>::deserialize(deserializer)?.map(Into::into))
}

// Amounts arrive as numbers or as decimal strings such as "1500.00"
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum WireAmount {
    Number(serde_json::Number),
    Text(String),
}

pub(crate) fn deserialize_opt_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<WireAmount>::deserialize(deserializer)? {
        Some(WireAmount::Number(n)) => n.as_f64(),
        Some(WireAmount::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

pub(crate) fn deserialize_amount_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<WireAmount>::deserialize(deserializer)? {
        Some(WireAmount::Number(n)) => n.to_string(),
        Some(WireAmount::Text(s)) => s,
        None => String::new(),
    })
}

pub(crate) fn deserialize_ids<'de, D>(deserializer: D) -> Result<Vec<ListingId>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Vec::<WireId>::deserialize(deserializer)?.into_iter().map(Into::into).collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ListingType {
    #[default]
    #[serde(alias = "sale", alias = "for_sale")]
    Sale,
    #[serde(alias = "auction")]
    Auction,
    #[serde(alias = "rental", alias = "rent", alias = "for_rent")]
    Rental,
}

/// A vehicle listing as shown on cards and in the comparison view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawListing")]
pub struct ListingSummary {
    pub id: ListingId,
    pub year: i32,
    pub make: String,
    pub model: String,
    // Human-formatted, e.g. "Current Bid: 3,100,000 ETB"
    pub price: String,
    // Raw numeric price when the backend sends one
    pub price_value: Option<u64>,
    // Kilometres
    pub mileage: u32,
    pub listing_type: ListingType,
    pub image: Option<String>,
}

impl ListingSummary {
    pub fn title(&self) -> String {
        format!("{} {} {}", self.year, self.make, self.model)
    }
}

// Price as it arrives: either a number or a display string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum WirePrice {
    Amount(u64),
    Text(String),
}

// Backend listing shape. Accepts both the snake_case fields of the listings
// API and the camelCase fields this crate serialises.
#[derive(Debug, Deserialize)]
struct RawListing {
    #[serde(deserialize_with = "deserialize_id")]
    id: ListingId,
    year: i32,
    make: String,
    model: String,
    #[serde(default)]
    price_display: Option<String>,
    #[serde(default)]
    price: Option<WirePrice>,
    #[serde(default, alias = "priceValue")]
    price_value: Option<u64>,
    #[serde(default)]
    mileage: Option<u32>,
    #[serde(default, alias = "listingType")]
    listing_type: Option<ListingType>,
    #[serde(default, alias = "image", alias = "primary_image_url")]
    image_url: Option<String>,
}

impl From<RawListing> for ListingSummary {
    fn from(raw: RawListing) -> Self {
        let (price_text, price_amount) = match raw.price {
            Some(WirePrice::Text(text)) => (Some(text), None),
            Some(WirePrice::Amount(amount)) => (None, Some(amount)),
            None => (None, None),
        };
        let price = raw
            .price_display
            .or(price_text)
            .or_else(|| price_amount.map(|a| format!("{} ETB", a)))
            .unwrap_or_else(|| "N/A".to_string());

        ListingSummary {
            id: raw.id,
            year: raw.year,
            make: raw.make,
            model: raw.model,
            price,
            price_value: raw.price_value.or(price_amount),
            mileage: raw.mileage.unwrap_or(0),
            listing_type: raw.listing_type.unwrap_or_default(),
            image: raw.image_url,
        }
    }
}

/// A listing with the extra fields shown on its detail screen.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "serde_json::Value")]
pub struct ListingDetail {
    pub summary: ListingSummary,
    pub description: Option<String>,
    pub condition: Option<String>,
    pub transmission: Option<String>,
    pub fuel_type: Option<String>,
    pub body_type: Option<String>,
    pub is_featured: bool,
}

#[derive(Debug, Deserialize)]
struct DetailExtras {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    condition: Option<String>,
    #[serde(default)]
    transmission: Option<String>,
    #[serde(default)]
    fuel_type: Option<String>,
    #[serde(default)]
    body_type: Option<String>,
    #[serde(default)]
    is_featured: Option<bool>,
}

// The summary and the extras are both read from the same object
impl TryFrom<serde_json::Value> for ListingDetail {
    type Error = serde_json::Error;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        let summary = ListingSummary::deserialize(&value)?;
        let extras = DetailExtras::deserialize(&value)?;
        Ok(ListingDetail {
            summary,
            description: extras.description,
            condition: extras.condition,
            transmission: extras.transmission,
            fuel_type: extras.fuel_type,
            body_type: extras.body_type,
            is_featured: extras.is_featured.unwrap_or(false),
        })
    }
}

// Body of GET /api/cars/{id}
#[derive(Debug, Clone, Deserialize)]
pub struct CarDetail {
    pub car: ListingDetail,
    #[serde(default)]
    pub similar_cars: Vec<ListingSummary>,
}

// Returned by the request submission endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmissionReceipt {
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub id: Option<ListingId>,
    #[serde(default)]
    pub message: Option<String>,
}

// --- Admin dashboard ---

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardStats {
    pub user_count: u64,
    pub active_auction_count: u64,
    pub for_sale_count: u64,
    pub for_rent_count: u64,
    pub pending_approval_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListingOwner {
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub id: Option<String>,
    pub username: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PendingCar {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: ListingId,
    pub year: i32,
    pub make: String,
    pub model: String,
    #[serde(default)]
    pub listing_type: Option<ListingType>,
    pub owner: ListingOwner,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Dashboard {
    pub stats: DashboardStats,
    #[serde(default)]
    pub pending_approvals: Vec<PendingCar>,
}

// --- Admin management ---

pub type UserRecord = User;

#[derive(Debug, Clone, Deserialize)]
pub struct DealerRecord {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub active_listings: u32,
    #[serde(default)]
    pub avg_rating: Option<f64>,
    #[serde(default)]
    pub review_count: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RentalRecord {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: ListingId,
    pub year: i32,
    pub make: String,
    pub model: String,
    #[serde(default)]
    pub owner_username: String,
    // Daily rate as the backend formats it
    #[serde(default, deserialize_with = "deserialize_amount_text")]
    pub price_per_day: String,
    #[serde(default)]
    pub is_approved: bool,
    #[serde(default)]
    pub is_active: bool,
}

// Row of the admin listing search
#[derive(Debug, Clone, Deserialize)]
pub struct AdminListingRow {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: ListingId,
    pub year: i32,
    pub make: String,
    pub model: String,
    #[serde(default)]
    pub owner_username: String,
    #[serde(default)]
    pub listing_type: Option<ListingType>,
    #[serde(default)]
    pub is_approved: bool,
    #[serde(default)]
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuctionInfo {
    #[serde(default, deserialize_with = "deserialize_opt_amount")]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub end_time: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RentalRate {
    #[serde(default, deserialize_with = "deserialize_opt_amount")]
    pub price_per_day: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListingImage {
    pub id: u64,
    pub image_url: String,
}

/// Everything the admin listing editor shows.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminListing {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: ListingId,
    pub make: String,
    pub model: String,
    pub year: i32,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub listing_type: ListingType,
    #[serde(default, deserialize_with = "deserialize_opt_amount")]
    pub fixed_price: Option<f64>,
    #[serde(default)]
    pub is_approved: bool,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub body_type: Option<String>,
    #[serde(default)]
    pub mileage: Option<u32>,
    #[serde(default)]
    pub transmission: Option<String>,
    #[serde(default)]
    pub drivetrain: Option<String>,
    #[serde(default)]
    pub fuel_type: Option<String>,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub owner: Option<ListingOwner>,
    #[serde(default)]
    pub auction: Option<AuctionInfo>,
    #[serde(default)]
    pub rental_listing: Option<RentalRate>,
    #[serde(default)]
    pub images: Vec<ListingImage>,
}

/// Admin edits to a listing. Absent fields are left as they are.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ListingUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub make: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_approved: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mileage: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transmission: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drivetrain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuel_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_featured: Option<bool>,
    // New photos, appended to the listing's gallery
    #[serde(skip)]
    pub images: Vec<ImageUpload>,
}

#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_dealer: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_rental_company: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_verified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<i64>,
}
