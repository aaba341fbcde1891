//! Core Twitter API utilities.
//!
//! This module contains the HTTP client, the endpoint table and the low-level
//! helper that sends one OAuth 1.0a signed request to Twitter.

use log::{debug, info, warn};
use reqwest::Client;

use crate::config::TwitterConfig;
use crate::error::SigningError;
use crate::oauth::{build_oauth1_header, encode_params, ConsumerCredentials, TokenCredentials};

/// Sanitizes text for safe logging by truncating and escaping control characters.
///
/// # Parameters
///
/// - `text`: The text to sanitize
/// - `max_len`: Maximum number of characters before truncation
///
/// # Returns
///
/// A sanitized string safe for logging
pub(crate) fn sanitize_for_logging(text: &str, max_len: usize) -> String {
    let sanitized: String = text
        .chars()
        .map(|c| match c {
            '\n' | '\r' | '\t' => ' ',
            c if c.is_control() => '?',
            c => c,
        })
        .collect();

    if sanitized.chars().count() > max_len {
        let truncated: String = sanitized.chars().take(max_len).collect();
        format!(
            "{}... [truncated, {} total bytes]",
            truncated,
            text.len()
        )
    } else {
        sanitized
    }
}

/// Twitter endpoint URLs rooted at a configurable origin.
#[derive(Debug, Clone)]
pub struct TwitterEndpoints {
    base: String,
}

impl TwitterEndpoints {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn request_token(&self) -> String {
        format!("{}/oauth/request_token", self.base)
    }

    /// Authorization page that always asks the user for consent.
    pub fn authorize(&self) -> String {
        format!("{}/oauth/authorize", self.base)
    }

    /// "Sign in with Twitter" page that skips the prompt for connected users.
    pub fn authenticate(&self) -> String {
        format!("{}/oauth/authenticate", self.base)
    }

    pub fn access_token(&self) -> String {
        format!("{}/oauth/access_token", self.base)
    }

    pub fn verify_credentials(&self) -> String {
        format!("{}/1.1/account/verify_credentials.json", self.base)
    }

    pub fn update_status(&self) -> String {
        format!("{}/1.1/statuses/update.json", self.base)
    }

    pub fn retweet(&self, tweet_id: &str) -> String {
        format!(
            "{}/1.1/statuses/retweet/{}.json",
            self.base,
            crate::oauth::percent_encode(tweet_id)
        )
    }

    pub fn favorite(&self) -> String {
        format!("{}/1.1/favorites/create.json", self.base)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// One outbound request, fully described before it is signed and sent.
///
/// For `POST` the parameters travel as a form body, for `GET` as the query
/// string; either way they are covered by the signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCall {
    pub method: HttpMethod,
    pub url: String,
    pub params: Vec<(String, String)>,
}

impl RemoteCall {
    pub fn post(url: String, params: Vec<(String, String)>) -> Self {
        Self {
            method: HttpMethod::Post,
            url,
            params,
        }
    }

    pub fn get(url: String) -> Self {
        Self {
            method: HttpMethod::Get,
            url,
            params: Vec::new(),
        }
    }
}

/// Status and body of a completed call.
#[derive(Debug, Clone)]
pub struct RemoteResponse {
    pub status: u16,
    pub body: String,
}

impl RemoteResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Client for the Twitter REST API, signing every request with the bridge's
/// client credentials.
///
/// The underlying HTTP client carries a bounded timeout; nothing is retried.
#[derive(Debug, Clone)]
pub struct TwitterClient {
    pub(crate) http: Client,
    pub(crate) consumer: ConsumerCredentials,
    pub(crate) endpoints: TwitterEndpoints,
}

impl TwitterClient {
    /// Builds a client from configuration.
    ///
    /// # Returns
    ///
    /// - `Ok(TwitterClient)`: The configured client
    /// - `Err(reqwest::Error)`: If the HTTP client (TLS backend) cannot be initialised
    pub fn new(config: &TwitterConfig) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("silobridge/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            consumer: config.consumer.clone(),
            endpoints: TwitterEndpoints::new(&config.api_base),
        })
    }

    pub fn endpoints(&self) -> &TwitterEndpoints {
        &self.endpoints
    }

    /// Signs and sends one request.
    ///
    /// # Parameters
    ///
    /// - `call`: The request to send
    /// - `token`: Request or access token to sign with, if any
    /// - `protocol_extra`: Extra `oauth_*` parameters (callback, verifier)
    /// - `operation_name`: Human-readable name for logging
    ///
    /// # Returns
    ///
    /// - `Ok(RemoteResponse)`: Any HTTP response, success or not
    /// - `Err(E)`: If signing fails, or on timeout or connection failure
    pub(crate) async fn send_signed<E>(
        &self,
        call: &RemoteCall,
        token: Option<&TokenCredentials>,
        protocol_extra: &[(&str, &str)],
        operation_name: &str,
    ) -> Result<RemoteResponse, E>
    where
        E: From<reqwest::Error> + From<SigningError>,
    {
        let method = call.method.as_str();
        let authorization = build_oauth1_header(
            method,
            &call.url,
            &call.params,
            &self.consumer,
            token,
            protocol_extra,
        )?;

        info!(
            "Sending {} {} for operation: {}",
            method, call.url, operation_name
        );
        debug!(
            "Request parameters for '{}': {:?}",
            operation_name,
            call.params.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>()
        );

        let request = match call.method {
            HttpMethod::Post => self
                .http
                .post(&call.url)
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(encode_params(&call.params)),
            HttpMethod::Get if call.params.is_empty() => self.http.get(&call.url),
            HttpMethod::Get => {
                let separator = if call.url.contains('?') { '&' } else { '?' };
                self.http.get(format!(
                    "{}{}{}",
                    call.url,
                    separator,
                    encode_params(&call.params)
                ))
            }
        };

        let response = request
            .header("Authorization", authorization)
            .send()
            .await
            .map_err(|e| {
                warn!(
                    "Request for operation '{}' failed before a response: {}",
                    operation_name, e
                );
                e
            })?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        info!(
            "Received response with status: {} for operation: {}",
            status, operation_name
        );
        debug!(
            "Response for '{}': {}",
            operation_name,
            sanitize_for_logging(&body, 200)
        );

        Ok(RemoteResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_follow_base() {
        let endpoints = TwitterEndpoints::new("http://127.0.0.1:9999/");
        assert_eq!(
            endpoints.request_token(),
            "http://127.0.0.1:9999/oauth/request_token"
        );
        assert_eq!(
            endpoints.retweet("668573590170828802"),
            "http://127.0.0.1:9999/1.1/statuses/retweet/668573590170828802.json"
        );
        assert_eq!(
            endpoints.favorite(),
            "http://127.0.0.1:9999/1.1/favorites/create.json"
        );
    }

    #[test]
    fn test_sanitize_for_logging() {
        assert_eq!(sanitize_for_logging("a\nb\tc", 10), "a b c");
        let long = "x".repeat(30);
        let sanitized = sanitize_for_logging(&long, 10);
        assert!(sanitized.starts_with("xxxxxxxxxx..."));
        assert!(sanitized.contains("30 total bytes"));
    }

    #[test]
    fn test_remote_response_success_range() {
        let ok = RemoteResponse {
            status: 200,
            body: String::new(),
        };
        let rejected = RemoteResponse {
            status: 403,
            body: String::new(),
        };
        assert!(ok.is_success());
        assert!(!rejected.is_success());
    }
}
