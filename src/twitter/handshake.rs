//! The OAuth 1.0a three-legged handshake.
//!
//! `initiate` obtains a request token and returns where to send the user;
//! `complete` trades the verifier from the callback for a durable access token
//! and looks up who it belongs to. The request-token secret travels between the
//! two as a [`PendingHandshake`] owned by the caller.

use std::collections::HashMap;
use std::fmt;

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::config::mask_secret;
use crate::error::HandshakeError;
use crate::oauth::TokenCredentials;

use super::api::{sanitize_for_logging, RemoteCall, TwitterClient};

/// Which authorization page the user is sent to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationPrompt {
    /// Always ask for consent (`/oauth/authorize`)
    Authorize,
    /// Skip the prompt for users who already connected the app
    /// (`/oauth/authenticate`), optionally pre-filling their screen name
    Authenticate { screen_name: Option<String> },
}

/// The request token and its secret, held between `initiate` and `complete`.
///
/// Single use: the caller must discard it once the callback has been handled,
/// whatever the outcome.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingHandshake {
    pub request_token: String,
    pub request_token_secret: String,
}

impl fmt::Debug for PendingHandshake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingHandshake")
            .field("request_token", &mask_secret(&self.request_token))
            .field("request_token_secret", &"[REDACTED]")
            .finish()
    }
}

/// Result of `initiate`: the URL to redirect the user to and the state to keep.
#[derive(Debug, Clone)]
pub struct AuthorizationRedirect {
    pub url: String,
    pub pending: PendingHandshake,
}

/// The durable credential and identity produced by a completed handshake.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizedAccount {
    pub credentials: TokenCredentials,
    /// Stable numeric id (`id_str`), kept as a string
    pub user_id: String,
    /// Current screen name
    pub username: String,
    /// The verify-credentials document, stored verbatim
    pub profile: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HandshakeOutcome {
    /// The user declined (or cancelled) authorization on Twitter
    Declined,
    Authorized(AuthorizedAccount),
}

fn parse_token_pair(body: &str) -> Option<TokenCredentials> {
    let fields: HashMap<String, String> = serde_urlencoded::from_str(body).ok()?;
    let token = fields.get("oauth_token").filter(|t| !t.is_empty())?;
    let secret = fields.get("oauth_token_secret").filter(|s| !s.is_empty())?;
    Some(TokenCredentials::new(token.as_str(), secret.as_str()))
}

fn non_blank<'a>(params: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    params
        .get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

impl TwitterClient {
    /// Starts a handshake by fetching a request token.
    ///
    /// # Parameters
    ///
    /// - `callback_uri`: Where Twitter sends the user back (or `oob` for PIN flow)
    /// - `prompt`: Which authorization page to use
    ///
    /// # Returns
    ///
    /// - `Ok(AuthorizationRedirect)`: The authorization URL and the pending state
    /// - `Err(HandshakeError::Init)`: On a non-success status or a missing token pair
    /// - `Err(HandshakeError::Network)`: On timeout or connection failure
    pub async fn initiate(
        &self,
        callback_uri: &str,
        prompt: &AuthorizationPrompt,
    ) -> Result<AuthorizationRedirect, HandshakeError> {
        info!("Starting Twitter authorization with callback {}", callback_uri);

        let call = RemoteCall::post(self.endpoints.request_token(), Vec::new());
        let response = self
            .send_signed::<HandshakeError>(
                &call,
                None,
                &[("oauth_callback", callback_uri)],
                "request_token",
            )
            .await?;

        if !response.is_success() {
            error!("Request token exchange failed with status {}", response.status);
            return Err(HandshakeError::Init(format!(
                "status {}: {}",
                response.status,
                sanitize_for_logging(&response.body, 200)
            )));
        }

        let request_token = parse_token_pair(&response.body).ok_or_else(|| {
            error!("Request token response did not contain a token pair");
            HandshakeError::Init("response did not contain oauth_token and oauth_token_secret".into())
        })?;
        debug!("Request token (masked): {}", mask_secret(&request_token.token));

        let (base, screen_name) = match prompt {
            AuthorizationPrompt::Authorize => (self.endpoints.authorize(), None),
            AuthorizationPrompt::Authenticate { screen_name } => {
                (self.endpoints.authenticate(), screen_name.as_deref())
            }
        };
        let mut url = Url::parse(&base).map_err(|e| HandshakeError::Init(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("oauth_token", &request_token.token);
        if let Some(name) = screen_name {
            url.query_pairs_mut().append_pair("screen_name", name);
        }

        info!("Twitter authorization initiated");
        Ok(AuthorizationRedirect {
            url: url.to_string(),
            pending: PendingHandshake {
                request_token: request_token.token,
                request_token_secret: request_token.secret,
            },
        })
    }

    /// Finishes a handshake from the callback's query parameters.
    ///
    /// A callback without `oauth_verifier` or `oauth_token` (or with `denied`)
    /// means the user declined; that is reported as `HandshakeOutcome::Declined`
    /// without contacting Twitter.
    ///
    /// # Parameters
    ///
    /// - `params`: Query parameters received on the callback
    /// - `pending`: The state returned by `initiate` for this attempt, if any
    ///
    /// # Returns
    ///
    /// - `Ok(HandshakeOutcome::Authorized)`: Access token plus identity
    /// - `Ok(HandshakeOutcome::Declined)`: The user declined
    /// - `Err(HandshakeError::Complete)`: Missing/mismatched pending state, a failed
    ///   exchange, or an incomplete identity document
    /// - `Err(HandshakeError::Network)`: On timeout or connection failure
    pub async fn complete(
        &self,
        params: &HashMap<String, String>,
        pending: Option<&PendingHandshake>,
    ) -> Result<HandshakeOutcome, HandshakeError> {
        let verifier = non_blank(params, "oauth_verifier");
        let callback_token = non_blank(params, "oauth_token");
        let (verifier, callback_token) = match (verifier, callback_token) {
            (Some(v), Some(t)) if !params.contains_key("denied") => (v, t),
            _ => {
                info!("Twitter authorization declined by user");
                return Ok(HandshakeOutcome::Declined);
            }
        };

        let pending = pending.ok_or_else(|| {
            warn!("Authorization callback arrived without a pending handshake");
            HandshakeError::Complete("no authorization is pending for this session".into())
        })?;
        if pending.request_token != callback_token {
            warn!("Authorization callback token does not match the pending handshake");
            return Err(HandshakeError::Complete(
                "callback token does not match the pending authorization".into(),
            ));
        }

        let request_token = TokenCredentials::new(
            pending.request_token.as_str(),
            pending.request_token_secret.as_str(),
        );
        let call = RemoteCall::post(self.endpoints.access_token(), Vec::new());
        let response = self
            .send_signed::<HandshakeError>(
                &call,
                Some(&request_token),
                &[("oauth_verifier", verifier)],
                "access_token",
            )
            .await?;
        if !response.is_success() {
            error!("Access token exchange failed with status {}", response.status);
            return Err(HandshakeError::Complete(format!(
                "access token exchange returned status {}",
                response.status
            )));
        }
        let credentials = parse_token_pair(&response.body).ok_or_else(|| {
            HandshakeError::Complete("access token response did not contain a token pair".into())
        })?;
        debug!("Access token (masked): {}", mask_secret(&credentials.token));

        let call = RemoteCall::get(self.endpoints.verify_credentials());
        let response = self
            .send_signed::<HandshakeError>(&call, Some(&credentials), &[], "verify_credentials")
            .await?;
        if !response.is_success() {
            error!("Identity verification failed with status {}", response.status);
            return Err(HandshakeError::Complete(format!(
                "identity verification returned status {}",
                response.status
            )));
        }

        let profile: Value = serde_json::from_str(&response.body)
            .map_err(|e| HandshakeError::Complete(format!("unreadable identity document: {}", e)))?;
        let user_id = profile
            .get("id_str")
            .and_then(Value::as_str)
            .ok_or_else(|| HandshakeError::Complete("identity document has no id_str".into()))?
            .to_string();
        let username = profile
            .get("screen_name")
            .and_then(Value::as_str)
            .ok_or_else(|| HandshakeError::Complete("identity document has no screen_name".into()))?
            .to_string();

        info!("Twitter authorization completed for @{} ({})", username, user_id);
        Ok(HandshakeOutcome::Authorized(AuthorizedAccount {
            credentials,
            user_id,
            username,
            profile,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_token_pair() {
        let pair = parse_token_pair("oauth_token=123&oauth_token_secret=456&oauth_callback_confirmed=true")
            .unwrap();
        assert_eq!(pair, TokenCredentials::new("123", "456"));
        assert!(parse_token_pair("oauth_token=123").is_none());
        assert!(parse_token_pair("oauth_token=&oauth_token_secret=456").is_none());
        assert!(parse_token_pair("<html>nope</html>").is_none());
    }

    #[test]
    fn test_pending_handshake_debug_hides_secret() {
        let pending = PendingHandshake {
            request_token: "request-token-value".to_string(),
            request_token_secret: "super-secret-value".to_string(),
        };
        let rendered = format!("{:?}", pending);
        assert!(!rendered.contains("super-secret-value"));
    }
}
