//! Client library for the car marketplace backend: listings, vehicle
//! comparison, guided car requests, and admin views.

pub mod admin;
pub mod api;
pub mod auth;
pub mod compare;
pub mod config;
pub mod error;
pub mod listings;
pub mod models;
pub mod wizard;

pub use api::ApiClient;
pub use auth::Credentials;
pub use config::Settings;
pub use error::{ClientError, ClientResult};
