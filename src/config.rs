//! Configuration module for the silobridge service.
//!
//! This module contains configuration structures and environment variable handling
//! for the Twitter client credentials and the HTTP server.

use log::{debug, error, info, warn};
use std::env;
use std::time::Duration;

use crate::oauth::ConsumerCredentials;

/// Default Twitter API origin. Overridable so tests can point at a mock server.
pub const DEFAULT_TWITTER_API_BASE: &str = "https://api.twitter.com";

/// Upper bound on every outbound Twitter call.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

const DEFAULT_AUTHORIZATION_ENDPOINT: &str = "https://indieauth.com/auth";
const DEFAULT_TOKEN_ENDPOINT: &str = "https://tokens.indieauth.com/token";

/// Masks a secret for logging, keeping at most the first and last eight characters.
///
/// # Example
///
/// ```rust
/// use silobridge::config::mask_secret;
///
/// assert_eq!(mask_secret("abc"), "abc...");
/// assert_eq!(mask_secret("0123456789abcdefXYZ"), "01234567...bcdefXYZ");
/// ```
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    let len = chars.len();
    let prefix: String = chars.iter().take(8).collect();
    if len > 16 {
        let suffix: String = chars[len - 8..].iter().collect();
        format!("{}...{}", prefix, suffix)
    } else {
        format!("{}...", prefix)
    }
}

fn required_var(name: &str) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => {
            info!(
                "Found {} environment variable with length: {}",
                name,
                value.len()
            );
            Ok(value.trim().to_string())
        }
        Ok(_) => {
            error!("{} is set but empty", name);
            Err(format!("{} cannot be empty", name).into())
        }
        Err(e) => {
            error!("Failed to load {} from environment: {}", name, e);
            Err(format!("Missing {} environment variable: {}", name, e).into())
        }
    }
}

fn optional_var(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
        _ => None,
    }
}

/// Client credentials and transport settings for the Twitter REST API.
///
/// The key and secret are registered with Twitter out-of-band; every outbound call
/// is signed with them.
#[derive(Debug, Clone)]
pub struct TwitterConfig {
    /// The registered client key/secret pair
    pub consumer: ConsumerCredentials,
    /// Origin for the REST and OAuth endpoints, without trailing slash
    pub api_base: String,
    /// Timeout applied to every outbound request
    pub timeout: Duration,
}

impl TwitterConfig {
    /// Builds a configuration against the public Twitter API.
    pub fn new(client_key: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            consumer: ConsumerCredentials {
                key: client_key.into(),
                secret: client_secret.into(),
            },
            api_base: DEFAULT_TWITTER_API_BASE.to_string(),
            timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }

    /// Points the configuration at a different API origin.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Creates a new `TwitterConfig` by loading credentials from environment variables.
    ///
    /// # Required Environment Variables
    ///
    /// - `TWITTER_CLIENT_KEY`: The client (consumer) key registered with Twitter
    /// - `TWITTER_CLIENT_SECRET`: The client (consumer) secret registered with Twitter
    ///
    /// # Optional Environment Variables
    ///
    /// - `TWITTER_API_BASE`: API origin (defaults to `https://api.twitter.com`)
    /// - `TWITTER_HTTP_TIMEOUT_SECS`: Outbound request timeout in seconds (defaults to 30)
    ///
    /// # Returns
    ///
    /// - `Ok(TwitterConfig)`: If both required variables are present
    /// - `Err(Box<dyn std::error::Error + Send + Sync>)`: If a required variable is missing
    ///   or the timeout is not a positive integer
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        info!("Loading Twitter configuration from environment variables");

        let client_key = required_var("TWITTER_CLIENT_KEY")?;
        debug!("Client key (masked): {}", mask_secret(&client_key));
        let client_secret = required_var("TWITTER_CLIENT_SECRET")?;
        debug!("Client secret (masked): {}", mask_secret(&client_secret));

        let mut config = Self::new(client_key, client_secret);

        if let Some(api_base) = optional_var("TWITTER_API_BASE") {
            warn!("Using non-default Twitter API base: {}", api_base);
            config = config.with_api_base(api_base);
        }

        if let Some(timeout) = optional_var("TWITTER_HTTP_TIMEOUT_SECS") {
            let secs: u64 = timeout
                .parse()
                .map_err(|e| format!("TWITTER_HTTP_TIMEOUT_SECS must be a number: {}", e))?;
            if secs == 0 {
                return Err("TWITTER_HTTP_TIMEOUT_SECS must be greater than zero".into());
            }
            config.timeout = Duration::from_secs(secs);
        }

        info!(
            "Twitter configuration loaded successfully (timeout {}s)",
            config.timeout.as_secs()
        );
        Ok(config)
    }
}

/// Settings for the HTTP server that hosts the handshake and Micropub routes.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,
    /// Externally visible origin, used to build callback and endpoint URLs
    pub public_url: String,
    /// IndieAuth authorization endpoint advertised on proxy homepages
    pub authorization_endpoint: String,
    /// IndieAuth token endpoint advertised on proxy homepages and used to verify
    /// Micropub access tokens
    pub token_endpoint: String,
}

impl ServerConfig {
    /// Loads server settings from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `PORT`: Server port (defaults to 3000)
    /// - `PUBLIC_URL`: External origin (defaults to `http://localhost:<port>`)
    /// - `INDIEAUTH_AUTHORIZATION_ENDPOINT`, `INDIEAUTH_TOKEN_ENDPOINT`: Advertised
    ///   IndieAuth endpoints; Micropub tokens are verified with the token endpoint
    pub fn from_env() -> Self {
        let port = get_server_port();
        let public_url = optional_var("PUBLIC_URL")
            .unwrap_or_else(|| format!("http://localhost:{}", port))
            .trim_end_matches('/')
            .to_string();

        let config = ServerConfig {
            port,
            public_url,
            authorization_endpoint: optional_var("INDIEAUTH_AUTHORIZATION_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_AUTHORIZATION_ENDPOINT.to_string()),
            token_endpoint: optional_var("INDIEAUTH_TOKEN_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_TOKEN_ENDPOINT.to_string()),
        };
        info!(
            "Server configuration loaded, public URL {}, token endpoint {}",
            config.public_url, config.token_endpoint
        );
        config
    }

    /// Callback URI handed to Twitter during the handshake.
    pub fn callback_uri(&self) -> String {
        format!("{}/twitter/callback", self.public_url)
    }
}

/// Gets the server port from environment variables or returns the default.
///
/// This function reads the `PORT` environment variable and parses it as a u16.
/// If the environment variable is not set or cannot be parsed, it defaults to 3000.
///
/// # Example
///
/// ```rust
/// use silobridge::get_server_port;
///
/// // With no PORT set
/// let port = get_server_port(); // Returns 3000
/// ```
pub fn get_server_port() -> u16 {
    match env::var("PORT") {
        Ok(value) => value.parse().unwrap_or_else(|_| {
            warn!("PORT '{}' is not a valid port number, using 3000", value);
            3000
        }),
        Err(_) => 3000,
    }
}
