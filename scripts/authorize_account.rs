//! Twitter Account Authorization Script
//!
//! This script connects a Twitter account without a browser callback, using the
//! out-of-band PIN variant of the OAuth 1.0a handshake. When `DATABASE_URL` and
//! `TOKEN_ENCRYPTION_KEY` are set the account is stored directly; otherwise the
//! access token is printed.

use std::collections::HashMap;
use std::io::{self, Write};

use silobridge::{
    db::{create_schema, get_db_pool, upsert_account},
    AuthorizationPrompt, HandshakeOutcome, TokenCipher, TwitterClient, TwitterConfig,
};

/// Callback value that asks Twitter to show a PIN instead of redirecting.
const OUT_OF_BAND: &str = "oob";

fn prompt(label: &str) -> io::Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut value = String::new();
    io::stdin().read_line(&mut value)?;
    Ok(value.trim().to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::init();

    println!("🐦 Twitter Account Authorization Helper");
    println!("=======================================");

    let config = TwitterConfig::from_env()?;
    let client = TwitterClient::new(&config)?;

    let redirect = client
        .initiate(OUT_OF_BAND, &AuthorizationPrompt::Authorize)
        .await?;

    println!("\n🔗 Authorization Steps:");
    println!("1. Open this URL in your browser:");
    println!("   {}", redirect.url);
    println!("\n2. Authorize the application");
    println!("3. Copy the PIN Twitter shows you");

    let pin = prompt("\nEnter the PIN: ")?;

    let mut params = HashMap::new();
    params.insert(
        "oauth_token".to_string(),
        redirect.pending.request_token.clone(),
    );
    params.insert("oauth_verifier".to_string(), pin);

    println!("\n🔄 Exchanging PIN for access token...");
    let account = match client.complete(&params, Some(&redirect.pending)).await? {
        HandshakeOutcome::Authorized(account) => account,
        HandshakeOutcome::Declined => {
            eprintln!("❌ No PIN entered; authorization was not completed");
            std::process::exit(1);
        }
    };

    println!(
        "\n✅ Authorized @{} (user id {})",
        account.username, account.user_id
    );

    if std::env::var("DATABASE_URL").is_ok() && std::env::var("TOKEN_ENCRYPTION_KEY").is_ok() {
        let cipher = TokenCipher::from_env()?;
        let pool = get_db_pool().await?;
        create_schema(&pool).await?;
        let site = upsert_account(&pool, &cipher, &account).await?;
        println!("💾 Stored account with site {}", site.url);
    } else {
        println!("\n📝 DATABASE_URL or TOKEN_ENCRYPTION_KEY is not set; credentials were not stored.");
        println!("Access token:        {}", account.credentials.token);
        println!("Access token secret: {}", account.credentials.secret);
    }

    Ok(())
}
