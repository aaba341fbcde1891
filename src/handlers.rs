//! HTTP route handlers for the silobridge service.
//!
//! This module contains the routes that connect a Twitter account through the
//! OAuth 1.0a handshake, the Micropub proxy homepage advertised for each
//! connected account, and the Micropub endpoint that publishes to Twitter.
//! Micropub access tokens are checked with the advertised IndieAuth token
//! endpoint.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{FromRequest, Form, Multipart, Path, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::{get, post},
    Router,
};
use cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use log::{debug, error, info, warn};
use serde_json::{json, Value};
use sqlx::PgPool;

use crate::config::ServerConfig;
use crate::crypto::TokenCipher;
use crate::db::{find_account_by_username, upsert_account};
use crate::indieauth::TokenVerifier;
use crate::micropub::{MediaAttachment, PublishRequest};
use crate::twitter::{
    screen_name_from_profile_url, AuthorizationPrompt, HandshakeOutcome, PendingHandshake,
    TwitterClient, TWITTER_WEB_BASE,
};

/// Name of the cookie that carries the sealed pending handshake.
pub const PENDING_COOKIE: &str = "silobridge_pending";

/// Path the pending cookie is scoped to.
const PENDING_COOKIE_PATH: &str = "/twitter";

/// Lifetime of the pending cookie.
const PENDING_COOKIE_MINUTES: i64 = 15;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub twitter: Arc<TwitterClient>,
    pub indieauth: Arc<TokenVerifier>,
    pub cipher: Arc<TokenCipher>,
    pub server: Arc<ServerConfig>,
}

/// Builds the application router with all routes and their state.
///
/// # Routes
///
/// - `GET /`: Landing page with the connect buttons
/// - `GET /health`: Health check
/// - `POST /twitter/authorize`: Start a handshake that always prompts
/// - `POST /twitter/authenticate`: Start a "Sign in with Twitter" handshake
/// - `GET /twitter/callback`: Finish a handshake
/// - `GET /twitter.com/:username`: Micropub proxy homepage for an account
/// - `POST /twitter.com/:username/micropub`: Micropub endpoint for an account
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/twitter/authorize", post(handle_authorize))
        .route("/twitter/authenticate", post(handle_authenticate))
        .route("/twitter/callback", get(handle_callback))
        .route("/twitter.com/:username", get(handle_proxy_homepage))
        .route("/twitter.com/:username/micropub", post(handle_micropub))
        .with_state(state)
}

/// Handles GET requests to the `/health` endpoint.
///
/// # Example Response
///
/// ```json
/// {
///   "status": "healthy",
///   "service": "silobridge"
/// }
/// ```
pub async fn handle_health() -> Json<Value> {
    Json(json!({"status": "healthy", "service": "silobridge"}))
}

/// Handles GET requests to the root `/` endpoint.
///
/// Shows the connect buttons and, after a failed handshake, the `error` query
/// parameter.
pub async fn handle_root(Query(params): Query<HashMap<String, String>>) -> Html<String> {
    let notice = params
        .get("error")
        .filter(|e| !e.is_empty())
        .map(|e| format!("<p class=\"error\">{}</p>\n", html_escape(e)))
        .unwrap_or_default();

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Silobridge</title>
    <style>
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            margin: 0;
            padding: 20px;
            background-color: #f5f5f5;
        }}
        .container {{
            max-width: 640px;
            margin: 0 auto;
            background-color: white;
            padding: 30px;
            border-radius: 8px;
            box-shadow: 0 2px 4px rgba(0,0,0,0.1);
        }}
        .error {{
            color: #b00020;
        }}
    </style>
</head>
<body>
    <div class="container">
        <h1>Publish to Twitter with Micropub</h1>
        {notice}<form method="post" action="/twitter/authorize">
            <button type="submit">Connect a Twitter account</button>
        </form>
        <form method="post" action="/twitter/authenticate">
            <input type="url" name="me" placeholder="https://twitter.com/you">
            <button type="submit">Sign in again</button>
        </form>
    </div>
</body>
</html>"#,
        notice = notice
    ))
}

/// Handles POST requests to `/twitter/authorize`.
pub async fn handle_authorize(State(state): State<AppState>) -> Response {
    start_handshake(&state, AuthorizationPrompt::Authorize).await
}

/// Handles POST requests to `/twitter/authenticate`.
///
/// An optional `me` field holding a `https://twitter.com/<name>` profile URL
/// pre-fills the screen name on Twitter's sign-in page.
pub async fn handle_authenticate(
    State(state): State<AppState>,
    Form(fields): Form<HashMap<String, String>>,
) -> Response {
    let screen_name = fields
        .get("me")
        .and_then(|me| screen_name_from_profile_url(me));
    start_handshake(&state, AuthorizationPrompt::Authenticate { screen_name }).await
}

async fn start_handshake(state: &AppState, prompt: AuthorizationPrompt) -> Response {
    let redirect = match state
        .twitter
        .initiate(&state.server.callback_uri(), &prompt)
        .await
    {
        Ok(redirect) => redirect,
        Err(e) => {
            error!("Failed to start Twitter authorization: {}", e);
            return error_redirect(&e.to_string()).into_response();
        }
    };

    let sealed = match seal_pending(&state.cipher, &redirect.pending) {
        Ok(sealed) => sealed,
        Err(e) => {
            error!("Failed to seal pending handshake: {}", e);
            return error_redirect("Could not start authorization").into_response();
        }
    };

    let cookie = Cookie::build((PENDING_COOKIE, sealed))
        .path(PENDING_COOKIE_PATH)
        .http_only(true)
        .secure(state.server.public_url.starts_with("https://"))
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::minutes(PENDING_COOKIE_MINUTES))
        .build();

    info!("Redirecting user to Twitter for authorization");
    (
        [(header::SET_COOKIE, cookie.to_string())],
        Redirect::to(&redirect.url),
    )
        .into_response()
}

/// Handles GET requests to `/twitter/callback`.
///
/// The pending cookie is cleared whatever the outcome. A declined or failed
/// handshake sends the user back to `/` with an error; success stores the
/// account and redirects to its proxy homepage.
pub async fn handle_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let pending = read_pending(&state.cipher, &headers);
    let clear = [(header::SET_COOKIE, removal_cookie())];

    let outcome = state.twitter.complete(&params, pending.as_ref()).await;
    let redirect = match outcome {
        Ok(HandshakeOutcome::Declined) => error_redirect("Authorization was declined"),
        Ok(HandshakeOutcome::Authorized(account)) => {
            match upsert_account(&state.pool, &state.cipher, &account).await {
                Ok(site) => {
                    info!("Connected {}", site.domain);
                    Redirect::to(&format!(
                        "/twitter.com/{}",
                        urlencoding::encode(&account.username)
                    ))
                }
                Err(e) => {
                    error!("Failed to store account @{}: {}", account.username, e);
                    error_redirect("Could not save the connected account")
                }
            }
        }
        Err(e) => {
            warn!("Twitter authorization failed: {}", e);
            error_redirect(&e.to_string())
        }
    };

    (clear, redirect).into_response()
}

/// Handles GET requests to `/twitter.com/:username`.
///
/// Serves the page a Micropub client discovers endpoints from.
pub async fn handle_proxy_homepage(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Response {
    let account = match find_account_by_username(&state.pool, &state.cipher, &username).await {
        Ok(Some(account)) => account,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Html(format!("No connected account for @{}", html_escape(&username))),
            )
                .into_response()
        }
        Err(e) => {
            error!("Failed to look up account @{}: {}", username, e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to load account").into_response();
        }
    };

    let micropub = format!(
        "{}/twitter.com/{}/micropub",
        state.server.public_url, account.username
    );
    let profile = format!("{}/{}", TWITTER_WEB_BASE, account.username);
    let name = account
        .user_info
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or(&account.username)
        .to_string();

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{name} on Twitter</title>
    <link rel="authorization_endpoint" href="{authorization}">
    <link rel="token_endpoint" href="{token}">
    <link rel="micropub" href="{micropub}">
    <link rel="me" href="{profile}">
</head>
<body>
    <p>Micropub endpoint for <a class="u-url" href="{profile}">@{username}</a>.</p>
</body>
</html>"#,
        name = html_escape(&name),
        authorization = html_escape(&state.server.authorization_endpoint),
        token = html_escape(&state.server.token_endpoint),
        micropub = html_escape(&micropub),
        profile = html_escape(&profile),
        username = html_escape(&account.username),
    ))
    .into_response()
}

/// Handles POST requests to `/twitter.com/:username/micropub`.
///
/// Accepts `application/x-www-form-urlencoded` and `multipart/form-data`
/// bodies; uploaded files become media attachments. The access token comes from
/// the `Authorization: Bearer` header or an `access_token` field, and must be
/// confirmed by the token endpoint as issued for this account's site with the
/// `create` scope.
///
/// # Returns
///
/// - `201 Created` with a `Location` header on success
/// - A Micropub error document (`error`, `error_description`) otherwise
pub async fn handle_micropub(
    State(state): State<AppState>,
    Path(username): Path<String>,
    request: Request,
) -> Response {
    let header_token = bearer_token(request.headers());
    let body = match read_micropub_body(request).await {
        Ok(body) => body,
        Err(rejection) => return rejection,
    };

    let token = match header_token
        .or_else(|| body.fields.get("access_token").cloned())
        .filter(|t| !t.trim().is_empty())
    {
        Some(token) => token,
        None => {
            return micropub_error(
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "An access token is required",
            )
        }
    };

    let token_info = match state.indieauth.verify(&token).await {
        Ok(info) => info,
        Err(e) => {
            warn!("Rejected Micropub request for @{}: {}", username, e);
            let status =
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::BAD_GATEWAY);
            return micropub_error(status, e.micropub_code(), &e.to_string());
        }
    };
    if !token_info.is_for(&username) {
        warn!(
            "Rejected Micropub request for @{}: token was issued for {}",
            username, token_info.me
        );
        return micropub_error(
            StatusCode::FORBIDDEN,
            "forbidden",
            &format!("Access token was not issued for @{}", username),
        );
    }
    if !token_info.can_create() {
        return micropub_error(
            StatusCode::FORBIDDEN,
            "insufficient_scope",
            "Access token does not have the create scope",
        );
    }

    let account = match find_account_by_username(&state.pool, &state.cipher, &username).await {
        Ok(Some(account)) => account,
        Ok(None) => {
            return micropub_error(
                StatusCode::NOT_FOUND,
                "not_found",
                "No connected account with that name",
            )
        }
        Err(e) => {
            error!("Failed to look up account @{}: {}", username, e);
            return micropub_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "server_error",
                "Failed to load account",
            );
        }
    };

    let request = PublishRequest::from_fields(&body.fields).with_media(body.media);
    debug!("Micropub request for @{}: {:?}", account.username, request);

    match state.twitter.publish(&account.credentials, &request).await {
        Ok(published) => {
            let status =
                StatusCode::from_u16(published.status()).unwrap_or(StatusCode::CREATED);
            (status, [(header::LOCATION, published.location)]).into_response()
        }
        Err(e) => {
            let status =
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::BAD_GATEWAY);
            micropub_error(status, e.micropub_code(), &e.to_string())
        }
    }
}

/// Form fields and uploaded files of a Micropub request.
#[derive(Debug, Default)]
struct MicropubBody {
    fields: HashMap<String, String>,
    media: Vec<MediaAttachment>,
}

/// Reads a form-encoded or multipart Micropub body, answering anything else
/// with a Micropub error.
async fn read_micropub_body(request: Request) -> Result<MicropubBody, Response> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| micropub_error(StatusCode::BAD_REQUEST, "invalid_request", &e.to_string()))?;
        read_multipart(multipart)
            .await
            .map_err(|e| micropub_error(StatusCode::BAD_REQUEST, "invalid_request", &e.to_string()))
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        let Form(fields) = Form::<HashMap<String, String>>::from_request(request, &())
            .await
            .map_err(|e| micropub_error(StatusCode::BAD_REQUEST, "invalid_request", &e.to_string()))?;
        Ok(MicropubBody {
            fields,
            media: Vec::new(),
        })
    } else {
        Err(micropub_error(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "invalid_request",
            "Expected a form-encoded or multipart/form-data body",
        ))
    }
}

/// Parts with a filename are uploads; the rest are plain fields.
async fn read_multipart(
    mut multipart: Multipart,
) -> Result<MicropubBody, axum::extract::multipart::MultipartError> {
    let mut body = MicropubBody::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match field.file_name().map(str::to_string) {
            Some(filename) => {
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await?.to_vec();
                debug!("Received upload '{}' ({} bytes) in field {}", filename, data.len(), name);
                body.media.push(MediaAttachment {
                    filename,
                    content_type,
                    data,
                });
            }
            None => {
                let value = field.text().await?;
                body.fields.insert(name, value);
            }
        }
    }
    Ok(body)
}

fn micropub_error(status: StatusCode, code: &str, description: &str) -> Response {
    (
        status,
        Json(json!({"error": code, "error_description": description})),
    )
        .into_response()
}

fn error_redirect(message: &str) -> Redirect {
    Redirect::to(&format!("/?error={}", urlencoding::encode(message)))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|t| t.trim().to_string())
}

fn seal_pending(
    cipher: &TokenCipher,
    pending: &PendingHandshake,
) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
    let serialized = serde_json::to_string(pending)?;
    cipher.encrypt(&serialized)
}

/// Recovers the pending handshake from the request cookies, if present and intact.
fn read_pending(cipher: &TokenCipher, headers: &HeaderMap) -> Option<PendingHandshake> {
    let sealed = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|c| c.name() == PENDING_COOKIE)
        .map(|c| c.value().to_string())?;

    match cipher
        .decrypt(&sealed)
        .and_then(|json| serde_json::from_str::<PendingHandshake>(&json).map_err(Into::into))
    {
        Ok(pending) => Some(pending),
        Err(e) => {
            warn!("Discarding unreadable pending handshake cookie: {}", e);
            None
        }
    }
}

fn removal_cookie() -> String {
    let mut cookie = Cookie::build((PENDING_COOKIE, ""))
        .path(PENDING_COOKIE_PATH)
        .http_only(true)
        .build();
    cookie.make_removal();
    cookie.to_string()
}

/// Escapes HTML special characters to prevent XSS attacks.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
