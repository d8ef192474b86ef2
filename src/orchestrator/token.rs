use anyhow::Result;
use chrono::Local;
use std::path::PathBuf;
use tracing::{error, info};

use crate::auth::{write_token_file, AccessToken, TokenExchangeClient};
use crate::config::BrokerConfig;

const BANNER_WIDTH: usize = 60;

/// Checksum -> exchange -> token file
pub struct TokenOrchestrator {
    client: TokenExchangeClient,
    token_file: PathBuf,
}

impl TokenOrchestrator {
    pub fn new(config: &BrokerConfig) -> Result<Self> {
        Ok(Self {
            client: TokenExchangeClient::new(config)?,
            token_file: config.token_file.clone(),
        })
    }

    /// Run the exchange once. Every failure is reported and becomes `None`;
    /// a token-file write failure still returns the token.
    pub async fn run(&self) -> Option<AccessToken> {
        println!("{}", "=".repeat(BANNER_WIDTH));
        println!("GENERATING GROWW API ACCESS TOKEN");
        println!("{}", "=".repeat(BANNER_WIDTH));

        let token = match self.client.request_token().await {
            Ok(token) => token,
            Err(e) => {
                error!("Access token exchange failed: {}", e);
                println!("\n❌ ERROR: {}", e);
                return None;
            }
        };

        println!("\n✅ SUCCESS! Access token generated.");
        println!("{}", "=".repeat(BANNER_WIDTH));
        println!("Token: {}", token.token);
        println!("Expires: {}", token.expiry);
        println!("Status: {}", if token.active { "Active" } else { "Inactive" });
        println!("{}", "=".repeat(BANNER_WIDTH));

        let generated_at = Local::now().naive_local();
        match write_token_file(&self.token_file, &token, generated_at) {
            Ok(()) => println!("\n💾 Token saved to '{}'", self.token_file.display()),
            Err(e) => {
                error!(path = %self.token_file.display(), "Failed to save access token: {}", e);
                println!("\n❌ Could not save token to '{}': {}", self.token_file.display(), e);
            }
        }

        info!(active = token.active, "Access token acquired");
        Some(token)
    }
}

/// Acquire a token with `config`, reporting instead of propagating failures
pub async fn acquire_access_token(config: &BrokerConfig) -> Option<AccessToken> {
    match TokenOrchestrator::new(config) {
        Ok(orchestrator) => orchestrator.run().await,
        Err(e) => {
            error!("Failed to initialize token exchange client: {:#}", e);
            None
        }
    }
}
