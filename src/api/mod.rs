//! Remote platform API.
//!
//! [`Authenticator`] obtains a bearer token once per process; [`HelixClient`]
//! uses it to resolve the target account and list its clips. The harvester
//! depends only on the [`ClipSource`] trait.

mod auth;
mod client;
mod error;
mod types;

pub use auth::Authenticator;
pub use client::{ApiEndpoints, ClipSource, DEFAULT_API_BASE, DEFAULT_AUTH_BASE, HelixClient};
pub use error::ApiError;
pub use types::{Account, ClipPage, ClipQuery, Credentials, HelixClip};
