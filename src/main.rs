use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::io::IsTerminal;

use vk::auth::{AuthResolver, TokenStore};
use vk::cli;
use vk::config::{CliArgs, Command, Config};
use vk::vault::{VaultApi, VaultClient};

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    // Load configuration first (for log level)
    let config = Config::load(&args)?;
    init_logging(&config.log_level);

    tracing::debug!(address = %config.address, "Configuration loaded");

    let mut vault = VaultClient::new(&config.address, config.http_timeout)
        .context("Unable to initialize the Vault client")?;
    let store = TokenStore::new(config.token_file.clone());

    match args.command {
        Command::Login => {
            login(&config, &mut vault, &store).await?;
        }
        Command::Token => {
            prepare(&config, &mut vault, &store, args.no_login).await?;
            let token = vault.token().context("No active token")?;
            println!("{}", token);
        }
        Command::Status => {
            prepare(&config, &mut vault, &store, args.no_login).await?;
            print_status(&vault).await?;
        }
    }

    Ok(())
}

/// Initialize logging on stderr so stdout stays clean for `vk token`
///
/// Human readable output on a terminal, JSON lines otherwise.
fn init_logging(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level.to_lowercase()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if std::io::stderr().is_terminal() {
        builder.init();
    } else {
        builder.json().init();
    }
}

/// Resolve a session and cache its token
async fn login(config: &Config, vault: &mut VaultClient, store: &TokenStore) -> Result<()> {
    let resolver = AuthResolver::from_config(config);
    let session = resolver.resolve(vault).await?;

    tracing::info!(
        method = %session.method,
        renewed = session.renewed,
        ttl = ?session.lookup.map(|l| l.ttl),
        "Logged in"
    );
    for warning in &session.warnings {
        tracing::warn!("Vault warning: {}", warning);
    }

    // Best effort: the session is valid even if caching fails
    if let Err(e) = store.save(&session.token) {
        tracing::warn!(error = %e, "Unable to save token");
    }

    Ok(())
}

/// Pre-run hook shared by commands that need an active token
async fn prepare(
    config: &Config,
    vault: &mut VaultClient,
    store: &TokenStore,
    no_login: bool,
) -> Result<()> {
    if !no_login {
        return login(config, vault, store).await;
    }

    let token = cli::configured_token(config, store)?;
    vault.set_token(&token);
    Ok(())
}

/// Print the active token's metadata as JSON
async fn print_status(vault: &VaultClient) -> Result<()> {
    let secret = vault
        .lookup_self()
        .await?
        .filter(|s| s.has_data())
        .context("Vault returned no data for the active token")?;
    let status = cli::status_report(vault.address().as_str(), &secret, Utc::now());

    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}
