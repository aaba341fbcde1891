//! IndieAuth token verification for the Micropub endpoint.
//!
//! Proxy homepages advertise an IndieAuth token endpoint. A Micropub client
//! obtains its access token there, and the bridge asks the same endpoint who the
//! token belongs to before publishing anything. A token only authorizes posts to
//! the account whose `https://twitter.com/<name>` site it was issued for.

use std::time::Duration;

use log::{debug, info, warn};
use reqwest::{header, Client};
use serde::Deserialize;

use crate::error::TokenError;
use crate::twitter::screen_name_from_profile_url;

/// Scopes that allow creating posts. `post` is the legacy name.
const CREATE_SCOPES: [&str; 2] = ["create", "post"];

/// What the token endpoint reports about a verified token.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenInfo {
    /// Site the token was issued for
    pub me: String,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
}

impl TokenInfo {
    /// Whether the token was issued for the site of `username`.
    ///
    /// Screen names are compared case-insensitively, as Twitter does.
    pub fn is_for(&self, username: &str) -> bool {
        screen_name_from_profile_url(&self.me)
            .map(|name| name.eq_ignore_ascii_case(username))
            .unwrap_or(false)
    }

    /// Whether the token's scope allows creating posts.
    pub fn can_create(&self) -> bool {
        self.scope
            .as_deref()
            .map(|scope| scope.split_whitespace().any(|s| CREATE_SCOPES.contains(&s)))
            .unwrap_or(false)
    }
}

/// Client for one IndieAuth token endpoint.
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    http: Client,
    endpoint: String,
}

impl TokenVerifier {
    /// Creates a verifier with a bounded request timeout.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("silobridge/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    /// Asks the token endpoint about `token`.
    ///
    /// # Returns
    ///
    /// - `Ok(TokenInfo)`: If the endpoint accepted the token and named its site
    /// - `Err(TokenError::Rejected)`: If the endpoint answered with an error status
    /// - `Err(TokenError::InvalidResponse)`: If the answer had no usable `me`
    /// - `Err(TokenError::Network)`: On timeout or connection failure
    pub async fn verify(&self, token: &str) -> Result<TokenInfo, TokenError> {
        debug!("Verifying access token with {}", self.endpoint);

        let response = self
            .http
            .get(&self.endpoint)
            .bearer_auth(token)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Token endpoint rejected access token with status {}", status);
            return Err(TokenError::Rejected(status.as_u16()));
        }

        let body = response.text().await?;
        let info = parse_token_response(&body)?;
        info!(
            "Access token verified for {} (client {})",
            info.me,
            info.client_id.as_deref().unwrap_or("unknown")
        );
        Ok(info)
    }
}

/// Reads a token endpoint answer, which is JSON or, from older endpoints,
/// form-encoded.
fn parse_token_response(body: &str) -> Result<TokenInfo, TokenError> {
    let info: TokenInfo = serde_json::from_str(body)
        .or_else(|_| serde_urlencoded::from_str(body))
        .map_err(|e| TokenError::InvalidResponse(e.to_string()))?;

    if info.me.trim().is_empty() {
        return Err(TokenError::InvalidResponse("empty me".to_string()));
    }
    Ok(info)
}
