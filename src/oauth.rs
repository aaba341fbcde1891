//! OAuth 1.0a request signing for the Twitter REST API.
//!
//! Every call the bridge makes to Twitter (the handshake legs as well as the
//! publish calls) carries an `Authorization: OAuth ...` header whose HMAC-SHA1
//! signature covers the HTTP method, the normalized URL and all request
//! parameters. This is not a bearer token: the same credentials produce a
//! different header for every request.

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use url::Url;

use crate::config::mask_secret;
use crate::error::SigningError;

type HmacSha1 = Hmac<Sha1>;

/// RFC 3986 unreserved characters are the only ones left unescaped.
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

const SIGNATURE_METHOD: &str = "HMAC-SHA1";
const OAUTH_VERSION: &str = "1.0";
const NONCE_LENGTH: usize = 32;

/// The client key and secret registered with Twitter for this bridge.
#[derive(Clone)]
pub struct ConsumerCredentials {
    pub key: String,
    pub secret: String,
}

impl fmt::Debug for ConsumerCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsumerCredentials")
            .field("key", &mask_secret(&self.key))
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// A token/secret pair: either a temporary request token or a durable access token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCredentials {
    pub token: String,
    pub secret: String,
}

impl TokenCredentials {
    pub fn new(token: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for TokenCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCredentials")
            .field("token", &mask_secret(&self.token))
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Percent-encodes a value the way OAuth 1.0a requires (RFC 3986, uppercase hex).
pub fn percent_encode(value: &str) -> String {
    utf8_percent_encode(value, OAUTH_ENCODE_SET).to_string()
}

/// Encodes parameters as `k=v&k=v` using OAuth percent-encoding.
///
/// Used for form bodies and query strings so that what is sent decodes to
/// exactly what was signed.
pub fn encode_params(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Scheme, host, non-default port and path; no query or fragment.
fn base_uri(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    match url.port() {
        Some(port) => format!("{}://{}:{}{}", url.scheme(), host, port, url.path()),
        None => format!("{}://{}{}", url.scheme(), host, url.path()),
    }
}

/// Builds the signature base string: `METHOD&base-uri&normalized-params`.
///
/// `params` must contain both the request parameters and the `oauth_*`
/// protocol parameters; query parameters embedded in `url` are added here.
pub fn signature_base_string(
    method: &str,
    url: &str,
    params: &[(String, String)],
) -> Result<String, SigningError> {
    let parsed = Url::parse(url)?;

    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .chain(
            parsed
                .query_pairs()
                .map(|(k, v)| (percent_encode(&k), percent_encode(&v))),
        )
        .collect();
    encoded.sort();

    let normalized = encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    Ok(format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        percent_encode(&base_uri(&parsed)),
        percent_encode(&normalized)
    ))
}

/// Computes the base64 HMAC-SHA1 signature for a base string.
pub fn sign(
    base_string: &str,
    consumer_secret: &str,
    token_secret: Option<&str>,
) -> Result<String, SigningError> {
    let key = format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret.unwrap_or_default())
    );
    let mut mac =
        HmacSha1::new_from_slice(key.as_bytes()).map_err(|_| SigningError::InvalidKey)?;
    mac.update(base_string.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

fn generate_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LENGTH)
        .map(char::from)
        .collect()
}

/// Builds the `Authorization` header value for one request.
///
/// # Parameters
///
/// - `method`: HTTP method of the request
/// - `url`: Full request URL (query parameters, if any, are signed too)
/// - `params`: Form body or extra query parameters sent with the request
/// - `consumer`: The bridge's registered client credentials
/// - `token`: Request or access token, absent for the request-token leg
/// - `protocol_extra`: Additional `oauth_*` parameters such as `oauth_callback`
///   or `oauth_verifier`
///
/// # Returns
///
/// A header value of the form `OAuth oauth_consumer_key="...", ...`
pub fn build_oauth1_header(
    method: &str,
    url: &str,
    params: &[(String, String)],
    consumer: &ConsumerCredentials,
    token: Option<&TokenCredentials>,
    protocol_extra: &[(&str, &str)],
) -> Result<String, SigningError> {
    build_oauth1_header_at(
        method,
        url,
        params,
        consumer,
        token,
        protocol_extra,
        &generate_nonce(),
        chrono::Utc::now().timestamp(),
    )
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn build_oauth1_header_at(
    method: &str,
    url: &str,
    params: &[(String, String)],
    consumer: &ConsumerCredentials,
    token: Option<&TokenCredentials>,
    protocol_extra: &[(&str, &str)],
    nonce: &str,
    timestamp: i64,
) -> Result<String, SigningError> {
    let mut oauth_params: Vec<(String, String)> = vec![
        ("oauth_consumer_key".to_string(), consumer.key.clone()),
        ("oauth_nonce".to_string(), nonce.to_string()),
        (
            "oauth_signature_method".to_string(),
            SIGNATURE_METHOD.to_string(),
        ),
        ("oauth_timestamp".to_string(), timestamp.to_string()),
        ("oauth_version".to_string(), OAUTH_VERSION.to_string()),
    ];
    if let Some(token) = token {
        oauth_params.push(("oauth_token".to_string(), token.token.clone()));
    }
    for (k, v) in protocol_extra {
        oauth_params.push((k.to_string(), v.to_string()));
    }

    let all_params: Vec<(String, String)> = params
        .iter()
        .cloned()
        .chain(oauth_params.iter().cloned())
        .collect();
    let base_string = signature_base_string(method, url, &all_params)?;
    let signature = sign(
        &base_string,
        &consumer.secret,
        token.map(|t| t.secret.as_str()),
    )?;

    oauth_params.push(("oauth_signature".to_string(), signature));
    oauth_params.sort();

    let fields = oauth_params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join(", ");
    Ok(format!("OAuth {}", fields))
}
