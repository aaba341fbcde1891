//! Database module for connected accounts.
//!
//! This module stores the accounts created by completed Twitter handshakes and
//! the single site each account publishes as. Access tokens and their secrets
//! are sealed with [`TokenCipher`] before they reach the database.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde_json::Value;
use sqlx::{types::Json, PgPool, Row};
use std::env;

use crate::config::mask_secret;
use crate::crypto::TokenCipher;
use crate::oauth::TokenCredentials;
use crate::twitter::{AuthorizedAccount, TWITTER_WEB_BASE};

/// Service name recorded on every account and site.
pub const SERVICE_NAME: &str = "twitter";

/// A connected Twitter account with its unsealed credential.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: i64,
    pub service: String,
    /// Stable remote user id
    pub user_id: String,
    /// Screen name as of the last handshake
    pub username: String,
    pub credentials: TokenCredentials,
    /// Verify-credentials document from the last handshake
    pub user_info: Value,
    pub updated_at: DateTime<Utc>,
}

/// The public identity an account publishes as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub url: String,
    pub domain: String,
    pub site_id: String,
}

impl Site {
    /// The site for a Twitter account: its profile URL, keyed by user id.
    pub fn for_account(username: &str, user_id: &str) -> Self {
        Site {
            url: format!("{}/{}", TWITTER_WEB_BASE, username),
            domain: format!("twitter.com/{}", username),
            site_id: user_id.to_string(),
        }
    }
}

/// Establishes a connection to the PostgreSQL database using DATABASE_URL.
///
/// # Returns
///
/// - `Ok(PgPool)`: A connection pool to the database
/// - `Err(Box<dyn std::error::Error + Send + Sync>)`: If the connection fails or DATABASE_URL is missing
pub async fn get_db_pool() -> Result<PgPool, Box<dyn std::error::Error + Send + Sync>> {
    let database_url =
        env::var("DATABASE_URL").map_err(|_| "DATABASE_URL environment variable is not set")?;

    info!("Connecting to PostgreSQL database");
    debug!("Database URL (masked): {}", mask_secret(&database_url));

    let pool = PgPool::connect(&database_url).await?;
    info!("Successfully connected to PostgreSQL database");

    Ok(pool)
}

/// Creates the `accounts` and `sites` tables if they do not exist yet.
pub async fn create_schema(pool: &PgPool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("Ensuring database schema exists");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS accounts (
            id BIGSERIAL PRIMARY KEY,
            service TEXT NOT NULL,
            user_id TEXT NOT NULL,
            username TEXT NOT NULL,
            token TEXT NOT NULL,
            token_secret TEXT NOT NULL,
            user_info JSONB NOT NULL DEFAULT '{}'::jsonb,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            UNIQUE (service, user_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sites (
            id BIGSERIAL PRIMARY KEY,
            account_id BIGINT NOT NULL REFERENCES accounts (id) ON DELETE CASCADE,
            service TEXT NOT NULL,
            url TEXT NOT NULL,
            domain TEXT NOT NULL,
            site_id TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    info!("Database schema is ready");
    Ok(())
}

/// Records a completed handshake.
///
/// Inserts the account on first connection and updates it in place afterwards,
/// keyed by `(service, user_id)`, so a renamed user keeps a single row. The
/// account's site is replaced in the same transaction.
///
/// # Parameters
///
/// - `pool`: A reference to the PostgreSQL connection pool
/// - `cipher`: Seals the token and secret before they are written
/// - `authorized`: Result of the handshake
///
/// # Returns
///
/// - `Ok(Site)`: The account's site after the update
/// - `Err(Box<dyn std::error::Error + Send + Sync>)`: If sealing or any statement fails
pub async fn upsert_account(
    pool: &PgPool,
    cipher: &TokenCipher,
    authorized: &AuthorizedAccount,
) -> Result<Site, Box<dyn std::error::Error + Send + Sync>> {
    info!(
        "Storing Twitter account @{} ({})",
        authorized.username, authorized.user_id
    );

    let sealed_token = cipher.encrypt(&authorized.credentials.token)?;
    let sealed_secret = cipher.encrypt(&authorized.credentials.secret)?;
    let site = Site::for_account(&authorized.username, &authorized.user_id);

    let mut tx = pool.begin().await?;

    let account_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO accounts (service, user_id, username, token, token_secret, user_info, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, NOW())
        ON CONFLICT (service, user_id) DO UPDATE SET
            username = EXCLUDED.username,
            token = EXCLUDED.token,
            token_secret = EXCLUDED.token_secret,
            user_info = EXCLUDED.user_info,
            updated_at = NOW()
        RETURNING id
        "#,
    )
    .bind(SERVICE_NAME)
    .bind(&authorized.user_id)
    .bind(&authorized.username)
    .bind(&sealed_token)
    .bind(&sealed_secret)
    .bind(Json(authorized.profile.clone()))
    .fetch_one(&mut *tx)
    .await?;

    let removed = sqlx::query("DELETE FROM sites WHERE account_id = $1")
        .bind(account_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    debug!("Replacing {} existing site(s) for account {}", removed, account_id);

    sqlx::query(
        r#"
        INSERT INTO sites (account_id, service, url, domain, site_id)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(account_id)
    .bind(SERVICE_NAME)
    .bind(&site.url)
    .bind(&site.domain)
    .bind(&site.site_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    info!("Stored account {} with site {}", account_id, site.url);
    Ok(site)
}

/// Looks up a connected account by screen name (case-insensitive).
///
/// # Returns
///
/// - `Ok(Some(Account))`: The account with its credential unsealed
/// - `Ok(None)`: If no account has that screen name
/// - `Err(Box<dyn std::error::Error + Send + Sync>)`: If the query or unsealing fails
pub async fn find_account_by_username(
    pool: &PgPool,
    cipher: &TokenCipher,
    username: &str,
) -> Result<Option<Account>, Box<dyn std::error::Error + Send + Sync>> {
    debug!("Looking up Twitter account @{}", username);

    let row = sqlx::query(
        r#"
        SELECT id, service, user_id, username, token, token_secret, user_info, updated_at
        FROM accounts
        WHERE service = $1 AND LOWER(username) = LOWER($2)
        ORDER BY updated_at DESC
        LIMIT 1
        "#,
    )
    .bind(SERVICE_NAME)
    .bind(username)
    .fetch_optional(pool)
    .await?;

    let row = match row {
        Some(row) => row,
        None => {
            warn!("No account found for @{}", username);
            return Ok(None);
        }
    };

    let sealed_token: String = row.try_get("token")?;
    let sealed_secret: String = row.try_get("token_secret")?;
    let user_info: Json<Value> = row.try_get("user_info")?;

    Ok(Some(Account {
        id: row.try_get("id")?,
        service: row.try_get("service")?,
        user_id: row.try_get("user_id")?,
        username: row.try_get("username")?,
        credentials: TokenCredentials::new(
            cipher.decrypt(&sealed_token)?,
            cipher.decrypt(&sealed_secret)?,
        ),
        user_info: user_info.0,
        updated_at: row.try_get("updated_at")?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_for_account() {
        let site = Site::for_account("fakeuser", "123");
        assert_eq!(site.url, "https://twitter.com/fakeuser");
        assert_eq!(site.domain, "twitter.com/fakeuser");
        assert_eq!(site.site_id, "123");
    }

    #[test]
    fn test_site_keeps_user_id_across_renames() {
        let before = Site::for_account("oldname", "123");
        let after = Site::for_account("newname", "123");
        assert_eq!(before.site_id, after.site_id);
        assert_ne!(before.url, after.url);
    }
}
