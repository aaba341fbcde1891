//! Twitter Publishing Script
//!
//! Publishes one Micropub-shaped post for a connected account from the command
//! line, going through the same classification and shortening as the Micropub
//! endpoint.
//!
//! ```bash
//! post_status fakeuser "Speak, friend, and enter" --in-reply-to https://twitter.com/jack/status/20
//! post_status fakeuser --like-of https://twitter.com/jack/status/20
//! ```

use std::collections::HashMap;

use silobridge::{
    db::{find_account_by_username, get_db_pool},
    PublishRequest, TokenCipher, TwitterClient, TwitterConfig,
};

const USAGE: &str = "Usage: post_status <username> [content] [--url URL] [--in-reply-to URL] \
[--like-of URL] [--repost-of URL] [--location GEO_URI]";

/// Collects Micropub fields from the arguments following the username.
fn parse_fields(args: &[String]) -> Result<HashMap<String, String>, String> {
    let mut fields = HashMap::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.strip_prefix("--") {
            Some(name @ ("url" | "in-reply-to" | "like-of" | "repost-of" | "location")) => {
                let value = iter
                    .next()
                    .ok_or_else(|| format!("--{} needs a value", name))?;
                fields.insert(name.to_string(), value.clone());
            }
            Some(other) => return Err(format!("Unknown option --{}", other)),
            None if fields.contains_key("content") => {
                return Err(format!("Unexpected argument '{}'", arg))
            }
            None => {
                fields.insert("content".to_string(), arg.clone());
            }
        }
    }
    Ok(fields)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (username, rest) = match args.split_first() {
        Some((username, rest)) => (username.clone(), rest),
        None => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    };
    let fields = parse_fields(rest).map_err(|e| format!("{}\n{}", e, USAGE))?;
    let request = PublishRequest::from_fields(&fields);

    let config = TwitterConfig::from_env()?;
    let client = TwitterClient::new(&config)?;
    let cipher = TokenCipher::from_env()?;
    let pool = get_db_pool().await?;

    let account = find_account_by_username(&pool, &cipher, &username)
        .await?
        .ok_or_else(|| format!("No connected account for @{}", username))?;

    println!("🚀 Publishing for @{}", account.username);
    match client.publish(&account.credentials, &request).await {
        Ok(published) => {
            println!("✅ Published: {}", published.location);
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Publishing failed ({}): {}", e.status_code(), e);
            std::process::exit(1);
        }
    }
}
