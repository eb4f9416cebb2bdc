// HTTP client for the marketplace backend.
// One shared reqwest client per process; every call can be abandoned through
// a CancellationToken, in which case its result is dropped.

use std::borrow::Cow;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::{
    auth::{self, Credentials, RegistrationForm},
    config::Settings,
    error::{ClientError, ClientResult, FieldErrors},
    listings::ListingQuery,
    models::{CarDetail, ListingDetail, ListingId, ListingSummary, SubmissionReceipt},
    compare::ServerBestValues,
    wizard::{RequestDraft, SpecificCarRequest},
};

const USER_AGENT: &str = concat!("carmarket/", env!("CARGO_PKG_VERSION"));
pub(crate) const CAR_REQUEST_PATH: &str = "/auth/api/car-request";

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

// Body of GET /api/compare
#[derive(Debug, Clone, Deserialize)]
pub struct CompareResponse {
    pub cars: Vec<ListingSummary>,
    #[serde(default)]
    pub best_values: Option<ServerBestValues>,
}

// The detail endpoints answer with a null car when the id is unknown
#[derive(Deserialize)]
struct CarPage {
    car: Option<ListingDetail>,
    #[serde(default)]
    similar_cars: Vec<ListingSummary>,
}

#[derive(Deserialize)]
struct RentalPage {
    rental: Option<ListingDetail>,
}

// Guided and specific requests go to the same endpoint, tagged by mode
#[derive(Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
enum CarRequestBody<'a> {
    Guided(&'a RequestDraft),
    Specific(&'a SpecificCarRequest),
}

impl ApiClient {
    pub fn new(settings: &Settings) -> ClientResult<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;
        Ok(ApiClient {
            http,
            base_url: settings.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // Attaches the bearer token after the precondition check
    pub(crate) fn authorized(
        &self,
        request: RequestBuilder,
        creds: Option<&Credentials>,
    ) -> ClientResult<RequestBuilder> {
        let token = auth::require(creds)?;
        Ok(request.bearer_auth(token))
    }

    pub(crate) fn get(&self, path: &str) -> RequestBuilder {
        self.http.get(self.url(path))
    }

    pub(crate) fn post(&self, path: &str) -> RequestBuilder {
        self.http.post(self.url(path))
    }

    pub(crate) fn put(&self, path: &str) -> RequestBuilder {
        self.http.put(self.url(path))
    }

    pub(crate) fn delete(&self, path: &str) -> RequestBuilder {
        self.http.delete(self.url(path))
    }

    // Races the request against the cancellation token
    pub(crate) async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        cancel: &CancellationToken,
    ) -> ClientResult<T> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!("Request abandoned, discarding result");
                Err(ClientError::Cancelled)
            }
            result = execute(request) => result,
        }
    }

    // Fetches listings for the browse screen
    pub async fn fetch_listings(
        &self,
        query: &ListingQuery,
        cancel: &CancellationToken,
    ) -> ClientResult<Vec<ListingSummary>> {
        let pairs = query.to_query_pairs();
        tracing::debug!(?pairs, "Fetching listings");
        let listings: Vec<ListingSummary> =
            self.send(self.get("/api/listings").query(&pairs), cancel).await?;
        tracing::info!("Fetched {} listings", listings.len());
        Ok(listings)
    }

    /// A listing's detail page together with the backend's similar cars.
    pub async fn fetch_listing(&self, id: &str, cancel: &CancellationToken) -> ClientResult<CarDetail> {
        let page: CarPage = self.send(self.get(&format!("/api/cars/{}", segment(id))), cancel).await?;
        let car = page.car.ok_or_else(|| not_found(id))?;
        tracing::debug!(id, similar = page.similar_cars.len(), "Fetched listing detail");
        Ok(CarDetail { car, similar_cars: page.similar_cars })
    }

    pub async fn fetch_rental(&self, id: &str, cancel: &CancellationToken) -> ClientResult<ListingDetail> {
        let page: RentalPage =
            self.send(self.get(&format!("/rentals/api/car/{}", segment(id))), cancel).await?;
        page.rental.ok_or_else(|| not_found(id))
    }

    // Raw compare call; see compare::Comparison for the checked version
    pub async fn compare(
        &self,
        ids: &[ListingId],
        cancel: &CancellationToken,
    ) -> ClientResult<CompareResponse> {
        let joined = ids.join(",");
        tracing::debug!(ids = %joined, "Fetching comparison");
        self.send(self.get("/api/compare").query(&[("ids", joined.as_str())]), cancel).await
    }

    pub async fn submit_car_request(
        &self,
        draft: &RequestDraft,
        creds: Option<&Credentials>,
        cancel: &CancellationToken,
    ) -> ClientResult<SubmissionReceipt> {
        let request = self.authorized(self.post(CAR_REQUEST_PATH), creds)?;
        tracing::debug!(?draft, "Submitting guided car request");
        let receipt: SubmissionReceipt =
            self.send(request.json(&CarRequestBody::Guided(draft)), cancel).await?;
        tracing::info!(id = ?receipt.id, "Car request submitted");
        Ok(receipt)
    }

    pub async fn submit_specific_request(
        &self,
        request: &SpecificCarRequest,
        creds: Option<&Credentials>,
        cancel: &CancellationToken,
    ) -> ClientResult<SubmissionReceipt> {
        let builder = self.authorized(self.post(CAR_REQUEST_PATH), creds)?;
        tracing::debug!(?request, "Submitting specific car request");
        self.send(builder.json(&CarRequestBody::Specific(request)), cancel).await
    }

    pub async fn register(
        &self,
        form: &RegistrationForm,
        cancel: &CancellationToken,
    ) -> ClientResult<SubmissionReceipt> {
        form.validate()?;
        let receipt: SubmissionReceipt =
            self.send(self.post("/auth/api/register").json(form), cancel).await?;
        tracing::info!(username = %form.username, "Registration accepted");
        Ok(receipt)
    }
}

/// Percent-encodes an id for use as a single path segment.
pub(crate) fn segment(id: &str) -> Cow<'_, str> {
    urlencoding::encode(id.trim())
}

fn not_found(id: &str) -> ClientError {
    tracing::warn!(id, "Backend has no such listing");
    ClientError::Status { status: 404, message: Some("Listing not found.".to_string()) }
}

async fn execute<T: DeserializeOwned>(request: RequestBuilder) -> ClientResult<T> {
    let response = request.send().await.map_err(|e| {
        tracing::warn!(error = %e, "Network error during request");
        ClientError::Network(e)
    })?;
    let status = response.status();
    let body = response.bytes().await?;

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        tracing::warn!(status = %status, "Backend rejected credentials");
        return Err(ClientError::Unauthenticated);
    }
    if !status.is_success() {
        let parsed: Option<Value> = serde_json::from_slice(&body).ok();
        if let Some(fields) = parsed.as_ref().and_then(field_errors) {
            return Err(ClientError::Validation(fields));
        }
        let message = parsed
            .as_ref()
            .and_then(|v| v.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string);
        tracing::warn!(status = %status, ?message, "Backend returned an error status");
        return Err(ClientError::Status { status: status.as_u16(), message });
    }

    // Some endpoints answer with an empty body on success
    let body = if body.is_empty() { &b"null"[..] } else { &body[..] };
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(error = %e, body = %String::from_utf8_lossy(body), "Failed to decode response");
        ClientError::Decode(e.to_string())
    })
}

// Backend validation failures come back as { "errors": { field: message } }
fn field_errors(body: &Value) -> Option<FieldErrors> {
    let errors = body.get("errors")?.as_object()?;
    let fields: FieldErrors = errors
        .iter()
        .map(|(field, message)| {
            let text = match message {
                Value::String(s) => s.clone(),
                Value::Array(items) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(" "),
                other => other.to_string(),
            };
            (field.clone(), text)
        })
        .collect();
    if fields.is_empty() { None } else { Some(fields) }
}
