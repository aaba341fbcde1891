//! # Silobridge
//!
//! A web service that connects Twitter accounts through OAuth 1.0a and publishes
//! Micropub requests to them.
//!
//! ## Environment Variables
//!
//! - `TWITTER_CLIENT_KEY`, `TWITTER_CLIENT_SECRET`: Twitter client credentials
//! - `DATABASE_URL`: PostgreSQL connection string
//! - `TOKEN_ENCRYPTION_KEY`: Key used to seal stored tokens
//! - `PUBLIC_URL`, `INDIEAUTH_TOKEN_ENDPOINT`, `PORT`: Server settings
//!
//! See the library documentation for the full list and the routes served.

use std::net::SocketAddr;
use std::sync::Arc;

use log::{error, info};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use silobridge::{
    db::{create_schema, get_db_pool},
    routes, AppState, ServerConfig, TokenCipher, TokenVerifier, TwitterClient, TwitterConfig,
};

/// Main entry point for the silobridge web service.
///
/// Initializes logging, loads configuration, prepares the database and serves
/// the HTTP routes until the process receives Ctrl+C.
///
/// # Logging
///
/// The application uses the `env_logger` crate for structured logging. Log levels
/// can be controlled via the `RUST_LOG` environment variable.
///
/// # Example Usage
///
/// ```bash
/// # Run with default port 3000
/// cargo run --bin silobridge
///
/// # Run with debug logging
/// RUST_LOG=debug cargo run --bin silobridge
/// ```
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize the logging system
    env_logger::init();

    let twitter_config = TwitterConfig::from_env()?;
    let server = ServerConfig::from_env();
    let cipher = TokenCipher::from_env()?;

    let pool = get_db_pool().await?;
    create_schema(&pool).await?;

    // Token checks share the outbound timeout used for Twitter
    let indieauth = TokenVerifier::new(server.token_endpoint.clone(), twitter_config.timeout)?;

    let state = AppState {
        pool,
        twitter: Arc::new(TwitterClient::new(&twitter_config)?),
        indieauth: Arc::new(indieauth),
        cipher: Arc::new(cipher),
        server: Arc::new(server.clone()),
    };

    // Build the HTTP application with all routes and middleware
    let app = routes(state).layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    let addr: SocketAddr = ([0, 0, 0, 0], server.port).into();
    info!("Starting silobridge server on {} ({})", addr, server.public_url);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
