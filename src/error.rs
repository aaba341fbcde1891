//! Error types for the handshake and publish paths.
//!
//! The bridge surfaces every remote failure to its caller as a typed value so the
//! hosting layer can decide how to present it. Nothing here retries.

use thiserror::Error;

/// Failures while producing an OAuth 1.0a signature.
#[derive(Debug, Error)]
pub enum SigningError {
    /// The request URL could not be parsed into a signature base URI
    #[error("invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The HMAC key could not be constructed from the consumer and token secrets
    #[error("invalid signing key")]
    InvalidKey,
}

/// Failures of the three-legged OAuth handshake.
///
/// A user declining authorization is not an error; see
/// [`HandshakeOutcome::Declined`](crate::twitter::HandshakeOutcome::Declined).
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// The request-token exchange failed or returned an incomplete token pair
    #[error("Twitter request token exchange failed: {0}")]
    Init(String),

    /// The access-token exchange or identity verification failed
    #[error("Twitter authorization could not be completed: {0}")]
    Complete(String),

    /// Timeout or connection failure talking to Twitter
    #[error("Network error talking to Twitter: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Failed to sign Twitter request: {0}")]
    Signing(#[from] SigningError),
}

/// Failures of a single publish operation.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Nothing publishable remained after classification
    #[error("Post has no content, like-of, repost-of or in-reply-to")]
    EmptyPost,

    /// Twitter answered with a non-success status
    #[error("Twitter rejected the request ({status}): {body}")]
    RemoteRejected { status: u16, body: String },

    /// Twitter answered with success but without the fields needed for a permalink
    #[error("Unexpected response from Twitter: {0}")]
    InvalidResponse(String),

    /// Timeout or connection failure talking to Twitter
    #[error("Network error talking to Twitter: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Failed to sign Twitter request: {0}")]
    Signing(#[from] SigningError),
}

impl PublishError {
    /// HTTP-equivalent status for reporting this failure to a Micropub client.
    ///
    /// Remote rejections pass Twitter's own status through when it is a valid
    /// error status.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::EmptyPost => 400,
            Self::RemoteRejected { status, .. } if (400..600).contains(status) => *status,
            Self::RemoteRejected { .. } => 502,
            Self::InvalidResponse(_) => 502,
            Self::Network(e) if e.is_timeout() => 504,
            Self::Network(_) => 502,
            Self::Signing(_) => 500,
        }
    }

    /// Micropub error code (`error` member of the JSON error body).
    pub fn micropub_code(&self) -> &'static str {
        match self {
            Self::EmptyPost => "invalid_request",
            Self::RemoteRejected { status, .. } if *status == 401 || *status == 403 => {
                "forbidden"
            }
            Self::RemoteRejected { .. } => "remote_rejected",
            Self::InvalidResponse(_) | Self::Network(_) => "bad_gateway",
            Self::Signing(_) => "server_error",
        }
    }
}

/// Failures verifying a Micropub access token with the IndieAuth token endpoint.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The token endpoint did not accept the token
    #[error("Token endpoint rejected the access token ({0})")]
    Rejected(u16),

    /// The token endpoint answered without a usable `me`
    #[error("Unexpected response from the token endpoint: {0}")]
    InvalidResponse(String),

    /// Timeout or connection failure talking to the token endpoint
    #[error("Network error talking to the token endpoint: {0}")]
    Network(#[from] reqwest::Error),
}

impl TokenError {
    /// HTTP-equivalent status for reporting this failure to a Micropub client.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Rejected(_) => 403,
            Self::InvalidResponse(_) => 502,
            Self::Network(e) if e.is_timeout() => 504,
            Self::Network(_) => 502,
        }
    }

    /// Micropub error code (`error` member of the JSON error body).
    pub fn micropub_code(&self) -> &'static str {
        match self {
            Self::Rejected(_) => "forbidden",
            Self::InvalidResponse(_) | Self::Network(_) => "bad_gateway",
        }
    }
}
