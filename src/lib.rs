//! # Silobridge Library
//!
//! A bridge that lets an IndieWeb site publish to Twitter through Micropub.
//! Accounts are connected with the OAuth 1.0a three-legged handshake; each
//! Micropub request is then classified as a retweet, like, reply or new status
//! and sent to the Twitter v1.1 REST API signed with the account's token.
//!
//! ## Features
//!
//! - OAuth 1.0a HMAC-SHA1 request signing
//! - Handshake with `authorize` and `authenticate` prompts
//! - Intent classification from `repost-of`, `like-of` and `in-reply-to`
//! - Status shortening to Twitter's weighted length limit
//! - Micropub proxy homepage and endpoint per connected account
//! - Access tokens checked against the IndieAuth token endpoint
//! - Account storage with credentials sealed at rest
//!
//! ## Configuration
//!
//! - `TWITTER_CLIENT_KEY`, `TWITTER_CLIENT_SECRET`: Client credentials (required)
//! - `TWITTER_API_BASE`: API origin (defaults to `https://api.twitter.com`)
//! - `TWITTER_HTTP_TIMEOUT_SECS`: Outbound request timeout (defaults to 30)
//! - `DATABASE_URL`: PostgreSQL connection string
//! - `TOKEN_ENCRYPTION_KEY`: 64 hex characters used to seal stored tokens
//! - `PUBLIC_URL`: Externally visible origin of this service
//! - `INDIEAUTH_TOKEN_ENDPOINT`: Token endpoint that issues and verifies Micropub
//!   access tokens (defaults to `https://tokens.indieauth.com/token`)
//! - `INDIEAUTH_AUTHORIZATION_ENDPOINT`: Authorization endpoint advertised next to it
//! - `PORT`: Server port (defaults to 3000)
//!
//! ## API Endpoints
//!
//! - `GET /`: Landing page
//! - `GET /health`: Returns service health status
//! - `POST /twitter/authorize`, `POST /twitter/authenticate`: Start a handshake
//! - `GET /twitter/callback`: Finish a handshake
//! - `GET /twitter.com/:username`: Micropub proxy homepage
//! - `POST /twitter.com/:username/micropub`: Micropub endpoint

pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod handlers;
pub mod indieauth;
pub mod micropub;
pub mod oauth;
pub mod twitter;

// Re-export commonly used types and functions
pub use config::{get_server_port, ServerConfig, TwitterConfig};
pub use crypto::TokenCipher;
pub use error::{HandshakeError, PublishError, SigningError, TokenError};
pub use handlers::{routes, AppState};
pub use indieauth::{TokenInfo, TokenVerifier};
pub use micropub::{MediaAttachment, PublishRequest, Published};
pub use oauth::{build_oauth1_header, ConsumerCredentials, TokenCredentials};
pub use twitter::{AuthorizationPrompt, HandshakeOutcome, PendingHandshake, TwitterClient};

#[cfg(test)]
mod tests;
