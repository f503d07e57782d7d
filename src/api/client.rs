//! Helix API client: account resolution and clip listing.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Response};
use tracing::{debug, instrument};
use url::Url;

use super::error::ApiError;
use super::types::{
    Account, ClipPage, ClipQuery, ClipsResponse, Credentials, ErrorBody, UsersResponse,
};
use crate::download::{HttpSettings, build_client};

/// Production API base.
pub const DEFAULT_API_BASE: &str = "https://api.twitch.tv";

/// Production authentication base.
pub const DEFAULT_AUTH_BASE: &str = "https://id.twitch.tv";

const USERS_PATH: &str = "/helix/users";
const CLIPS_PATH: &str = "/helix/clips";

/// Header carrying the application client id.
const CLIENT_ID_HEADER: &str = "Client-Id";

/// Base URLs for the API and authentication hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoints {
    pub api_base: String,
    pub auth_base: String,
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            auth_base: DEFAULT_AUTH_BASE.to_string(),
        }
    }
}

impl ApiEndpoints {
    /// Both hosts served from one base (used with mock servers).
    #[must_use]
    pub fn single(base: &str) -> Self {
        Self {
            api_base: base.to_string(),
            auth_base: base.to_string(),
        }
    }
}

/// Source of clip pages.
#[async_trait]
pub trait ClipSource: Send + Sync {
    /// Fetches one page of clips.
    async fn list_clips(&self, query: &ClipQuery) -> Result<ClipPage, ApiError>;
}

/// Authenticated client for the Helix endpoints.
#[derive(Clone)]
pub struct HelixClient {
    client: Client,
    api_base: String,
    credentials: Credentials,
}

impl std::fmt::Debug for HelixClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HelixClient")
            .field("api_base", &self.api_base)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

impl HelixClient {
    /// Creates a client for the production API.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Client`] if the HTTP client cannot be built.
    pub fn new(credentials: Credentials, settings: &HttpSettings) -> Result<Self, ApiError> {
        Self::with_endpoints(credentials, settings, &ApiEndpoints::default())
    }

    /// Creates a client against custom endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Client`] if the HTTP client cannot be built.
    pub fn with_endpoints(
        credentials: Credentials,
        settings: &HttpSettings,
        endpoints: &ApiEndpoints,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            client: build_client(settings).map_err(ApiError::Client)?,
            api_base: endpoints.api_base.clone(),
            credentials,
        })
    }

    /// Looks up an account by login, or by id when `streamer` is numeric.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::AccountNotFound`] when nothing matches, or the
    /// request error otherwise.
    #[instrument(skip(self))]
    pub async fn resolve_account(&self, streamer: &str) -> Result<Account, ApiError> {
        let streamer = streamer.trim();
        let key = if !streamer.is_empty() && streamer.chars().all(|c| c.is_ascii_digit()) {
            "id"
        } else {
            "login"
        };

        let mut url = endpoint_url(&self.api_base, USERS_PATH)?;
        url.query_pairs_mut().append_pair(key, streamer);

        let response = self.get(USERS_PATH, url).await?;
        let users: UsersResponse = response
            .json()
            .await
            .map_err(|e| ApiError::from_reqwest(USERS_PATH, e))?;

        let account: Account = users
            .data
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::AccountNotFound {
                query: streamer.to_string(),
            })?
            .into();
        debug!(
            broadcaster_id = %account.broadcaster_id,
            login = %account.login,
            "Account resolved"
        );
        Ok(account)
    }

    async fn get(&self, endpoint: &str, url: Url) -> Result<Response, ApiError> {
        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, format!("Bearer {}", self.credentials.bearer))
            .header(CLIENT_ID_HEADER, &self.credentials.client_id)
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(endpoint, e))?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(status_error(endpoint, response).await)
        }
    }
}

#[async_trait]
impl ClipSource for HelixClient {
    #[instrument(skip(self, query), fields(after = ?query.after))]
    async fn list_clips(&self, query: &ClipQuery) -> Result<ClipPage, ApiError> {
        let mut url = endpoint_url(&self.api_base, CLIPS_PATH)?;
        url.query_pairs_mut().extend_pairs(query.pairs());

        let response = self.get(CLIPS_PATH, url).await?;
        let body: ClipsResponse = response
            .json()
            .await
            .map_err(|e| ApiError::from_reqwest(CLIPS_PATH, e))?;
        let page = ClipPage::from(body);
        debug!(clips = page.clips.len(), more = page.cursor.is_some(), "Clip page received");
        Ok(page)
    }
}

/// Joins a base URL and an absolute path.
pub(crate) fn endpoint_url(base: &str, path: &str) -> Result<Url, ApiError> {
    let raw = format!("{}{path}", base.trim_end_matches('/'));
    Url::parse(&raw).map_err(|_| ApiError::InvalidUrl { url: raw })
}

/// Turns a non-success response into [`ApiError::HttpStatus`], preferring
/// the `message` field of a JSON error body.
pub(crate) async fn status_error(endpoint: &str, response: Response) -> ApiError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .map(|b| b.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.trim().to_string());
    ApiError::HttpStatus {
        endpoint: endpoint.to_string(),
        status,
        message,
    }
}
