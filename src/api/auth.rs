//! Client-credentials authentication.

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::{info, instrument};
use url::form_urlencoded;

use super::client::{ApiEndpoints, endpoint_url, status_error};
use super::error::ApiError;
use super::types::{Credentials, TokenResponse};
use crate::download::{HttpSettings, build_client};

const TOKEN_PATH: &str = "/oauth2/token";
const GRANT_TYPE: &str = "client_credentials";

/// Exchanges application credentials for a bearer token.
#[derive(Clone)]
pub struct Authenticator {
    client: Client,
    auth_base: String,
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("auth_base", &self.auth_base)
            .finish_non_exhaustive()
    }
}

impl Authenticator {
    /// # Errors
    ///
    /// Returns [`ApiError::Client`] if the HTTP client cannot be built.
    pub fn new(settings: &HttpSettings, endpoints: &ApiEndpoints) -> Result<Self, ApiError> {
        Ok(Self {
            client: build_client(settings).map_err(ApiError::Client)?,
            auth_base: endpoints.auth_base.clone(),
        })
    }

    /// Requests an app access token.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::HttpStatus`] when the credentials are rejected,
    /// or a network/decode error.
    #[instrument(skip(self, client_secret))]
    pub async fn authenticate(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> Result<Credentials, ApiError> {
        let url = endpoint_url(&self.auth_base, TOKEN_PATH)?;
        let body = form_urlencoded::Serializer::new(String::new())
            .append_pair("client_id", client_id)
            .append_pair("client_secret", client_secret)
            .append_pair("grant_type", GRANT_TYPE)
            .finish();

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(TOKEN_PATH, e))?;

        if !response.status().is_success() {
            return Err(status_error(TOKEN_PATH, response).await);
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ApiError::from_reqwest(TOKEN_PATH, e))?;
        info!(expires_in = ?token.expires_in, "Authenticated");

        Ok(Credentials {
            bearer: token.access_token,
            client_id: client_id.to_string(),
        })
    }
}
