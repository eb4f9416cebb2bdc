// In-process fake of the marketplace backend, served with axum on a random port.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use carmarket::{ApiClient, Credentials, Settings};

pub const GOOD_TOKEN: &str = "good-token";

type Reply = (StatusCode, Json<Value>);

#[derive(Default)]
pub struct FakeBackend {
    pub listings: Vec<Value>,
    // Returned verbatim as best_values when set
    pub server_best_values: Option<Value>,
    pub compare_delay: Option<Duration>,
    pub submission_failures: AtomicUsize,
    pub compare_calls: AtomicUsize,
    pub submissions: Mutex<Vec<Value>>,
    pub approvals: Mutex<Vec<String>>,
    // {"id", "fields", "images"} per multipart listing update
    pub listing_updates: Mutex<Vec<Value>>,
    pub user_updates: Mutex<Vec<(u64, Value)>>,
    // "listing:<id>" or "user:<id>"
    pub deletions: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn with_listings(listings: Vec<Value>) -> Self {
        FakeBackend { listings, ..Default::default() }
    }

    pub fn submissions(&self) -> Vec<Value> {
        self.submissions.lock().unwrap().clone()
    }
}

// The four vehicles from the browse screen fixtures
pub fn sample_listings() -> Vec<Value> {
    vec![
        json!({ "id": 1, "year": 2022, "make": "Hyundai", "model": "Ioniq 5",
                "price_display": "3,800,000 ETB", "mileage": 25000, "listing_type": "Sale",
                "image_url": "https://img.example/ioniq5.jpg" }),
        json!({ "id": 2, "year": 2021, "make": "Volkswagen", "model": "ID.4",
                "price_display": "Current Bid: 3,100,000 ETB", "mileage": 45000, "listing_type": "Auction",
                "image_url": "https://img.example/id4.jpg" }),
        json!({ "id": 3, "year": 2023, "make": "BYD", "model": "Atto 3",
                "price_display": "2,950,000 ETB", "mileage": 15000, "listing_type": "Sale",
                "image_url": "https://img.example/atto3.jpg" }),
        json!({ "id": 4, "year": 2020, "make": "Mercedes-Benz", "model": "EQC",
                "price_display": "Current Bid: 4,500,000 ETB", "mileage": 60000, "listing_type": "Auction",
                "image_url": "https://img.example/eqc.jpg" }),
    ]
}

fn users() -> Vec<Value> {
    vec![
        json!({ "id": 5, "username": "dawit", "email": "dawit@example.com", "is_dealer": true }),
        json!({ "id": 6, "username": "hana", "email": "hana@example.com", "is_admin": true, "points": 40 }),
    ]
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {}", GOOD_TOKEN))
}

fn unauthorized() -> Reply {
    (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Token is missing or invalid" })))
}

async fn list_listings(
    State(backend): State<Arc<FakeBackend>>,
    Query(params): Query<HashMap<String, String>>,
) -> Reply {
    let needle = params.get("q").map(|q| q.to_lowercase()).unwrap_or_default();
    let hits: Vec<Value> = backend
        .listings
        .iter()
        .filter(|l| {
            let title = format!("{} {}", l["make"].as_str().unwrap_or(""), l["model"].as_str().unwrap_or(""));
            title.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect();
    (StatusCode::OK, Json(Value::Array(hits)))
}

async fn car_detail(State(backend): State<Arc<FakeBackend>>, Path(id): Path<String>) -> Reply {
    let Some(car) = backend.listings.iter().find(|l| l["id"].to_string() == id) else {
        return (StatusCode::NOT_FOUND, Json(json!({ "message": "Listing not found" })));
    };
    let mut car = car.clone();
    car["description"] = json!("Well kept, full service history.");
    car["transmission"] = json!("Automatic");
    let similar: Vec<Value> = backend
        .listings
        .iter()
        .filter(|l| l["id"] != car["id"] && l["listing_type"] == car["listing_type"])
        .cloned()
        .collect();
    (StatusCode::OK, Json(json!({ "car": car, "similar_cars": similar })))
}

// Unknown ids answer 200 with a null rental
async fn rental_detail(State(backend): State<Arc<FakeBackend>>, Path(id): Path<String>) -> Reply {
    let rental = backend
        .listings
        .iter()
        .find(|l| l["id"].to_string() == id && l["listing_type"] == "Rental")
        .cloned();
    (StatusCode::OK, Json(json!({ "rental": rental })))
}

async fn compare(
    State(backend): State<Arc<FakeBackend>>,
    Query(params): Query<HashMap<String, String>>,
) -> Reply {
    backend.compare_calls.fetch_add(1, Ordering::SeqCst);
    if let Some(delay) = backend.compare_delay {
        tokio::time::sleep(delay).await;
    }
    let ids: Vec<String> = params
        .get("ids")
        .map(|ids| ids.split(',').map(str::to_string).collect())
        .unwrap_or_default();
    let cars: Vec<Value> = backend
        .listings
        .iter()
        .filter(|l| ids.contains(&l["id"].to_string()))
        .cloned()
        .collect();

    let mut body = json!({ "cars": cars });
    if let Some(best) = &backend.server_best_values {
        body["best_values"] = best.clone();
    }
    (StatusCode::OK, Json(body))
}

async fn car_request(
    State(backend): State<Arc<FakeBackend>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    if !authorized(&headers) {
        return unauthorized();
    }
    let failed = backend
        .submission_failures
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if failed {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "Database unavailable" })),
        );
    }
    backend.submissions.lock().unwrap().push(body);
    (StatusCode::CREATED, Json(json!({ "id": 17, "message": "Request received" })))
}

async fn register(Json(body): Json<Value>) -> Reply {
    if body["username"] == "taken" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "errors": { "username": "Username already exists." } })),
        );
    }
    (StatusCode::CREATED, Json(json!({ "message": "Registration successful" })))
}

async fn dashboard(headers: HeaderMap) -> Reply {
    if !authorized(&headers) {
        return unauthorized();
    }
    (
        StatusCode::OK,
        Json(json!({
            "stats": {
                "user_count": 12, "active_auction_count": 3, "for_sale_count": 8,
                "for_rent_count": 2, "pending_approval_count": 1
            },
            "pending_approvals": [
                { "id": 31, "year": 2018, "make": "Toyota", "model": "Corolla",
                  "listing_type": "Sale", "owner": { "id": 5, "username": "dawit" } }
            ]
        })),
    )
}

async fn approve_listing(
    State(backend): State<Arc<FakeBackend>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    if !authorized(&headers) {
        return unauthorized();
    }
    if body["action"] != "approve" {
        return (StatusCode::BAD_REQUEST, Json(json!({ "message": "Unknown action" })));
    }
    backend.approvals.lock().unwrap().push(id);
    (StatusCode::OK, Json(json!({ "message": "Listing approved" })))
}

async fn admin_listing(headers: HeaderMap, Path(id): Path<String>) -> Reply {
    if !authorized(&headers) {
        return unauthorized();
    }
    (
        StatusCode::OK,
        Json(json!({
            "car": {
                "id": id.parse::<u64>().unwrap_or(0), "make": "Toyota", "model": "Corolla", "year": 2018,
                "listing_type": "auction", "is_approved": false, "is_active": true,
                "mileage": 98000, "owner": { "username": "dawit" },
                "auction": { "current_price": "650000.00", "end_time": "2026-11-01T12:00:00" },
                "images": [{ "id": 1, "image_url": "https://img.example/corolla.jpg" }]
            }
        })),
    )
}

async fn update_listing(
    State(backend): State<Arc<FakeBackend>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Reply {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut fields = serde_json::Map::new();
    let mut images = Vec::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let bytes = field.bytes().await.unwrap();
                images.push(json!({ "field": name, "file_name": file_name, "size": bytes.len() }));
            }
            None => {
                fields.insert(name, Value::String(field.text().await.unwrap()));
            }
        }
    }
    backend
        .listing_updates
        .lock()
        .unwrap()
        .push(json!({ "id": id, "fields": fields, "images": images }));
    (StatusCode::OK, Json(json!({ "message": "Listing updated successfully" })))
}

async fn delete_listing(
    State(backend): State<Arc<FakeBackend>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Reply {
    if !authorized(&headers) {
        return unauthorized();
    }
    backend.deletions.lock().unwrap().push(format!("listing:{}", id));
    (StatusCode::OK, Json(json!({ "message": "Listing deleted" })))
}

async fn user_detail(headers: HeaderMap, Path(id): Path<u64>) -> Reply {
    if !authorized(&headers) {
        return unauthorized();
    }
    match users().into_iter().find(|u| u["id"] == id) {
        Some(user) => (StatusCode::OK, Json(json!({ "user": user }))),
        None => (StatusCode::NOT_FOUND, Json(json!({ "message": "User not found" }))),
    }
}

async fn update_user(
    State(backend): State<Arc<FakeBackend>>,
    Path(id): Path<u64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    if !authorized(&headers) {
        return unauthorized();
    }
    backend.user_updates.lock().unwrap().push((id, body));
    (StatusCode::OK, Json(json!({ "message": "User updated" })))
}

async fn delete_user(
    State(backend): State<Arc<FakeBackend>>,
    Path(id): Path<u64>,
    headers: HeaderMap,
) -> Reply {
    if !authorized(&headers) {
        return unauthorized();
    }
    backend.deletions.lock().unwrap().push(format!("user:{}", id));
    // Deletes answer with an empty body
    (StatusCode::NO_CONTENT, Json(Value::Null))
}

fn search_term(params: &HashMap<String, String>) -> String {
    params.get("q").map(|q| q.to_lowercase()).unwrap_or_default()
}

async fn search_users(headers: HeaderMap, Query(params): Query<HashMap<String, String>>) -> Reply {
    if !authorized(&headers) {
        return unauthorized();
    }
    let q = search_term(&params);
    let hits: Vec<Value> = users()
        .into_iter()
        .filter(|u| u["username"].as_str().unwrap_or("").contains(&q))
        .collect();
    (StatusCode::OK, Json(json!({ "users": hits })))
}

async fn search_dealers(headers: HeaderMap) -> Reply {
    if !authorized(&headers) {
        return unauthorized();
    }
    (
        StatusCode::OK,
        Json(json!({
            "dealers": [
                { "id": 5, "username": "dawit", "email": "dawit@example.com",
                  "active_listings": 7, "avg_rating": 4.5, "review_count": 12 }
            ]
        })),
    )
}

async fn search_rentals(headers: HeaderMap) -> Reply {
    if !authorized(&headers) {
        return unauthorized();
    }
    (
        StatusCode::OK,
        Json(json!({
            "cars": [
                { "id": 8, "year": 2019, "make": "Toyota", "model": "RAV4",
                  "owner_username": "abyssinia_rentals", "price_per_day": "4500.00",
                  "is_approved": true, "is_active": true }
            ]
        })),
    )
}

async fn search_admin_listings(headers: HeaderMap) -> Reply {
    if !authorized(&headers) {
        return unauthorized();
    }
    (
        StatusCode::OK,
        Json(json!({
            "cars": [
                { "id": 31, "year": 2018, "make": "Toyota", "model": "Corolla",
                  "owner_username": "dawit", "listing_type": "sale",
                  "is_approved": false, "is_active": true }
            ]
        })),
    )
}

// Starts the fake backend and returns its base URL
pub async fn spawn(backend: Arc<FakeBackend>) -> String {
    let app = Router::new()
        .route("/api/listings", get(list_listings))
        .route("/api/cars/:id", get(car_detail))
        .route("/rentals/api/car/:id", get(rental_detail))
        .route("/api/compare", get(compare))
        .route("/auth/api/car-request", post(car_request))
        .route("/auth/api/register", post(register))
        .route("/admin/api/dashboard", get(dashboard))
        .route(
            "/admin/api/listings/:id",
            get(admin_listing).post(approve_listing).put(update_listing).delete(delete_listing),
        )
        .route("/admin/api/users", get(search_users))
        .route("/admin/api/users/:id", get(user_detail).put(update_user).delete(delete_user))
        .route("/admin/api/dealers", get(search_dealers))
        .route("/admin/api/rentals", get(search_rentals))
        .route("/auctions/api/admin/listings", get(search_admin_listings))
        .with_state(backend);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service()).await.unwrap();
    });
    format!("http://{}", addr)
}

pub fn client_for(base_url: &str) -> ApiClient {
    let settings = Settings { api_base_url: base_url.to_string(), ..Settings::default() };
    ApiClient::new(&settings).unwrap()
}

pub fn good_credentials() -> Credentials {
    Credentials::new(GOOD_TOKEN, None)
}
