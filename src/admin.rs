// Admin endpoints: dashboard, listing moderation, user management, and the
// user/dealer/rental/listing searches. All of them require credentials.

use reqwest::multipart::{Form, Part};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::{
    api::{segment, ApiClient},
    auth::Credentials,
    error::{ClientError, ClientResult},
    models::{
        AdminListing, AdminListingRow, Dashboard, DealerRecord, ListingUpdate, RentalRecord,
        SubmissionReceipt, UserRecord, UserUpdate,
    },
};

// Search responses wrap their rows in a named array
#[derive(Deserialize)]
struct UsersPage {
    #[serde(default)]
    users: Vec<UserRecord>,
}

#[derive(Deserialize)]
struct DealersPage {
    #[serde(default)]
    dealers: Vec<DealerRecord>,
}

#[derive(Deserialize)]
struct CarsPage<T> {
    #[serde(default = "Vec::new")]
    cars: Vec<T>,
}

#[derive(Deserialize)]
struct ListingPage {
    car: AdminListing,
}

#[derive(Deserialize)]
struct UserPage {
    user: UserRecord,
}

impl ApiClient {
    pub async fn admin_dashboard(
        &self,
        creds: Option<&Credentials>,
        cancel: &CancellationToken,
    ) -> ClientResult<Dashboard> {
        let request = self.authorized(self.get("/admin/api/dashboard"), creds)?;
        let dashboard: Dashboard = self.send(request, cancel).await?;
        tracing::info!(
            pending = dashboard.pending_approvals.len(),
            "Loaded admin dashboard"
        );
        Ok(dashboard)
    }

    pub async fn admin_listing(
        &self,
        id: &str,
        creds: Option<&Credentials>,
        cancel: &CancellationToken,
    ) -> ClientResult<AdminListing> {
        let request = self.authorized(self.get(&listing_path(id)), creds)?;
        let page: ListingPage = self.send(request, cancel).await?;
        Ok(page.car)
    }

    pub async fn approve_listing(
        &self,
        id: &str,
        creds: Option<&Credentials>,
        cancel: &CancellationToken,
    ) -> ClientResult<()> {
        let request = self.authorized(self.post(&listing_path(id)), creds)?;
        let _: Value = self.send(request.json(&json!({ "action": "approve" })), cancel).await?;
        tracing::info!(id, "Listing approved");
        Ok(())
    }

    /// Sends the changed fields and any new photos as a multipart form.
    pub async fn update_listing(
        &self,
        id: &str,
        update: &ListingUpdate,
        creds: Option<&Credentials>,
        cancel: &CancellationToken,
    ) -> ClientResult<SubmissionReceipt> {
        let request = self.authorized(self.put(&listing_path(id)), creds)?;
        let form = listing_form(update)?;
        tracing::debug!(id, images = update.images.len(), "Updating listing");
        let receipt: SubmissionReceipt = self.send(request.multipart(form), cancel).await?;
        tracing::info!(id, "Listing updated");
        Ok(receipt)
    }

    pub async fn delete_listing(
        &self,
        id: &str,
        creds: Option<&Credentials>,
        cancel: &CancellationToken,
    ) -> ClientResult<()> {
        let request = self.authorized(self.delete(&listing_path(id)), creds)?;
        let _: Value = self.send(request, cancel).await?;
        tracing::info!(id, "Listing deleted");
        Ok(())
    }

    pub async fn fetch_user(
        &self,
        id: u64,
        creds: Option<&Credentials>,
        cancel: &CancellationToken,
    ) -> ClientResult<UserRecord> {
        let request = self.authorized(self.get(&user_path(id)), creds)?;
        let page: UserPage = self.send(request, cancel).await?;
        Ok(page.user)
    }

    pub async fn update_user(
        &self,
        id: u64,
        update: &UserUpdate,
        creds: Option<&Credentials>,
        cancel: &CancellationToken,
    ) -> ClientResult<()> {
        let request = self.authorized(self.put(&user_path(id)), creds)?;
        let _: Value = self.send(request.json(update), cancel).await?;
        tracing::info!(id, "User updated");
        Ok(())
    }

    // Dealers and rental companies are users too, so this removes them as well
    pub async fn delete_user(
        &self,
        id: u64,
        creds: Option<&Credentials>,
        cancel: &CancellationToken,
    ) -> ClientResult<()> {
        let request = self.authorized(self.delete(&user_path(id)), creds)?;
        let _: Value = self.send(request, cancel).await?;
        tracing::info!(id, "User deleted");
        Ok(())
    }

    pub async fn search_users(
        &self,
        q: &str,
        creds: Option<&Credentials>,
        cancel: &CancellationToken,
    ) -> ClientResult<Vec<UserRecord>> {
        let page: UsersPage = self.admin_search("/admin/api/users", q, creds, cancel).await?;
        Ok(page.users)
    }

    pub async fn search_dealers(
        &self,
        q: &str,
        creds: Option<&Credentials>,
        cancel: &CancellationToken,
    ) -> ClientResult<Vec<DealerRecord>> {
        let page: DealersPage = self.admin_search("/admin/api/dealers", q, creds, cancel).await?;
        Ok(page.dealers)
    }

    pub async fn search_rentals(
        &self,
        q: &str,
        creds: Option<&Credentials>,
        cancel: &CancellationToken,
    ) -> ClientResult<Vec<RentalRecord>> {
        let page: CarsPage<RentalRecord> =
            self.admin_search("/admin/api/rentals", q, creds, cancel).await?;
        Ok(page.cars)
    }

    pub async fn search_listings(
        &self,
        q: &str,
        creds: Option<&Credentials>,
        cancel: &CancellationToken,
    ) -> ClientResult<Vec<AdminListingRow>> {
        let page: CarsPage<AdminListingRow> =
            self.admin_search("/auctions/api/admin/listings", q, creds, cancel).await?;
        Ok(page.cars)
    }

    async fn admin_search<T: DeserializeOwned>(
        &self,
        path: &str,
        q: &str,
        creds: Option<&Credentials>,
        cancel: &CancellationToken,
    ) -> ClientResult<T> {
        let request = self.authorized(self.get(path).query(&[("q", q.trim())]), creds)?;
        tracing::debug!(path, q, "Admin search");
        self.send(request, cancel).await
    }
}

fn listing_path(id: &str) -> String {
    format!("/admin/api/listings/{}", segment(id))
}

fn user_path(id: u64) -> String {
    format!("/admin/api/users/{}", id)
}

// Every present field goes in as text, the way the admin editor posts it
fn listing_form(update: &ListingUpdate) -> ClientResult<Form> {
    let fields = match serde_json::to_value(update) {
        Ok(Value::Object(fields)) => fields,
        Ok(_) => serde_json::Map::new(),
        Err(e) => return Err(ClientError::invalid("listing", e.to_string())),
    };

    let mut form = Form::new();
    for (key, value) in fields {
        let text = match value {
            Value::String(s) => s,
            other => other.to_string(),
        };
        form = form.text(key, text);
    }
    for image in &update.images {
        let part = Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(&image.mime_type)
            .map_err(|e| ClientError::invalid("images", e.to_string()))?;
        form = form.part("images", part);
    }
    Ok(form)
}
