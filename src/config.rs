use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::auth::{
    normalize_token, PasswordCredential, RenewalThreshold, RoleCredential, DEFAULT_APPROLE_PATH,
    DEFAULT_RENEWAL_THRESHOLD,
};

/// Default Vault address
pub const DEFAULT_ADDRESS: &str = "https://127.0.0.1:8200";

/// Default token file, shared with the official Vault CLI
pub const DEFAULT_TOKEN_FILE: &str = "~/.vault-token";

/// Default HTTP timeout in seconds
pub const DEFAULT_HTTP_TIMEOUT: u64 = 30;

/// Config file base name (vk.toml, vk.yaml, ...)
const CONFIG_NAME: &str = "vk";

/// Config file formats, in lookup order
const CONFIG_EXTENSIONS: &[&str] = &["toml", "yaml", "yml", "json"];

/// Prefix for environment configuration (VK_ADDRESS, VK_APPROLE__SECRET_ID, ...)
const ENV_PREFIX: &str = "VK";

/// vk - log in to Vault and cache the token
#[derive(Parser, Debug)]
#[command(name = "vk", author, version, about, long_about = None)]
pub struct CliArgs {
    /// Config file to use instead of searching the default locations
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Vault address
    #[arg(short, long, env = "VAULT_ADDR", global = true)]
    pub address: Option<String>,

    /// Vault token, tried before the token file
    #[arg(short, long, env = "VAULT_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Token cache file (empty string disables it)
    #[arg(long, global = true)]
    pub token_file: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Don't log in automatically before `token` and `status`
    #[arg(long, global = true)]
    pub no_login: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Manually log in
    Login,

    /// Print the active token
    Token,

    /// Show lifetime and policies of the active token
    Status,
}

/// Resolved configuration handed to the login flow
#[derive(Clone, Debug)]
pub struct Config {
    pub address: String,

    // Token sources
    pub token: Option<String>,
    pub token_file: Option<PathBuf>,
    pub token_renewal_threshold: RenewalThreshold,

    // Login methods
    pub approle: RoleCredential,
    pub userpass: PasswordCredential,

    // Ambient
    pub log_level: String,
    pub http_timeout: u64,
}

/// Raw configuration as read from defaults, file, environment and flags
#[derive(Debug, Deserialize)]
struct Settings {
    address: String,
    #[serde(default)]
    token: String,
    #[serde(default)]
    token_file: String,
    token_renewal_threshold: f64,
    #[serde(default)]
    approle: AppRoleSettings,
    #[serde(default)]
    userpass: UserpassSettings,
    log_level: String,
    http_timeout: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AppRoleSettings {
    path: String,
    role_id: String,
    secret_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UserpassSettings {
    path: String,
    password: String,
}

impl Config {
    /// Load configuration with priority: CLI > ENV > config file > defaults
    pub fn load(args: &CliArgs) -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let file = match &args.config {
            Some(path) => Some(path.clone()),
            None => find_config_file(&config_search_dirs()),
        };

        let settings = build_settings(file.as_deref(), args)?;
        Self::from_settings(settings)
    }

    fn from_settings(settings: Settings) -> Result<Self> {
        let address = settings.address.trim().to_string();
        if address.is_empty() {
            anyhow::bail!("address must not be empty (use --address or set VAULT_ADDR)");
        }

        let token_renewal_threshold = RenewalThreshold::new(settings.token_renewal_threshold)?;

        let token = Some(normalize_token(&settings.token).to_string()).filter(|t| !t.is_empty());

        let token_file = Some(settings.token_file.trim())
            .filter(|p| !p.is_empty())
            .map(expand_tilde);

        Ok(Config {
            address,
            token,
            token_file,
            token_renewal_threshold,
            approle: RoleCredential {
                path: settings.approle.path,
                role_id: settings.approle.role_id,
                secret_id: settings.approle.secret_id,
            },
            userpass: PasswordCredential {
                path: settings.userpass.path,
                password: settings.userpass.password,
            },
            log_level: settings.log_level,
            http_timeout: settings.http_timeout,
        })
    }
}

/// Layer defaults, the config file, VK_* environment and CLI flags
fn build_settings(file: Option<&Path>, args: &CliArgs) -> Result<Settings> {
    let mut builder = config::Config::builder()
        .set_default("address", DEFAULT_ADDRESS)?
        .set_default("token_file", DEFAULT_TOKEN_FILE)?
        .set_default("token_renewal_threshold", DEFAULT_RENEWAL_THRESHOLD)?
        .set_default("approle.path", DEFAULT_APPROLE_PATH)?
        .set_default("log_level", "info")?
        .set_default("http_timeout", DEFAULT_HTTP_TIMEOUT as i64)?;

    if let Some(path) = file {
        builder = builder.add_source(config::File::from(path).required(true));
    }

    let builder = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        )
        .set_override_option("address", args.address.clone())?
        .set_override_option("token", args.token.clone())?
        .set_override_option("token_file", args.token_file.clone())?
        .set_override_option("log_level", args.log_level.clone())?;

    let settings = match file {
        Some(path) => builder
            .build()
            .with_context(|| format!("Failed to read config file: {}", path.display()))?,
        None => builder.build().context("Failed to load configuration")?,
    };

    settings
        .try_deserialize()
        .context("Failed to parse configuration")
}

/// Config directories, searched in order
fn config_search_dirs() -> Vec<PathBuf> {
    let mut search = vec![PathBuf::from("/etc/vk"), PathBuf::from("/etc")];
    if let Some(home) = dirs::home_dir() {
        search.push(home.join(".config/vk"));
        search.push(home.join(".config"));
    }
    search
}

/// First `vk.<ext>` file found in `dirs`
fn find_config_file(dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter()
        .flat_map(|dir| {
            CONFIG_EXTENSIONS
                .iter()
                .map(move |ext| dir.join(format!("{}.{}", CONFIG_NAME, ext)))
        })
        .find(|path| path.is_file())
}

/// Expand tilde (~) in file paths to user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
