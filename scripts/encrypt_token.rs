//! Token Encryption Utility
//!
//! Seals an access token or token secret with AES-256-GCM so it can be inserted
//! into the `accounts` table by hand. Pass `--decrypt` to open a sealed value.
//! Requires TOKEN_ENCRYPTION_KEY environment variable to be set.

use std::io::{self, Write};

use silobridge::{crypto::ENCRYPTION_KEY_VAR, TokenCipher};

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let decrypt = std::env::args().skip(1).any(|arg| arg == "--decrypt");

    println!("🔐 Token Encryption Utility");
    println!("===========================");
    println!();

    // Check if encryption key is configured
    if std::env::var(ENCRYPTION_KEY_VAR).is_err() {
        eprintln!("❌ Error: {} environment variable is not set.", ENCRYPTION_KEY_VAR);
        eprintln!();
        eprintln!("Generate a key with:");
        eprintln!("  openssl rand -hex 32");
        eprintln!();
        eprintln!("Then set it:");
        eprintln!("  export {}=\"your_64_char_hex_key\"", ENCRYPTION_KEY_VAR);
        std::process::exit(1);
    }
    let cipher = TokenCipher::from_env()?;

    print!(
        "Enter the {} value: ",
        if decrypt { "sealed" } else { "token" }
    );
    io::stdout().flush()?;
    let mut value = String::new();
    io::stdin().read_line(&mut value)?;
    let value = value.trim();

    if value.is_empty() {
        eprintln!("❌ Error: Value cannot be empty");
        std::process::exit(1);
    }

    let result = if decrypt {
        cipher.decrypt(value)
    } else {
        cipher.encrypt(value)
    };

    match result {
        Ok(output) => {
            println!();
            println!("{}", output);
            if !decrypt {
                println!();
                println!("📝 Use this value for the token or token_secret column.");
            }
        }
        Err(e) => {
            eprintln!("❌ Failed: {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
