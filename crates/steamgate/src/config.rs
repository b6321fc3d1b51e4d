//! Application configuration.
//!
//! Layered as defaults, then the TOML file, then `STEAMGATE__SECTION__KEY`
//! environment variables.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use config::{Config, Environment, File, FileFormat};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::auth::{AuthConfig, resolve_env_reference};
use crate::openid::STEAM_OPENID_ENDPOINT;
use crate::profile::STEAM_API_BASE_URL;

pub const APP_NAME: &str = "steamgate";

/// Path of the OpenID callback below the public URL.
pub const CALLBACK_PATH: &str = "/api/auth/process";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub steam: SteamConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Externally visible base URL, used to build the OpenID return URL.
    pub public_url: String,
    /// Upper bound for handling one request.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            public_url: "http://localhost:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    /// Where Steam sends the user back after sign-in.
    pub fn return_url(&self) -> Result<Url> {
        let base = self.public_url.trim_end_matches('/');
        Url::parse(&format!("{base}{CALLBACK_PATH}"))
            .with_context(|| format!("invalid server.public_url {:?}", self.public_url))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SteamConfig {
    /// Steam Web API key. Supports `env:VAR_NAME`.
    pub api_key: Option<String>,
    /// OpenID provider endpoint.
    pub openid_endpoint: String,
    /// Steam Web API base URL.
    pub api_base_url: String,
    /// Timeout for every outbound call to Steam.
    pub request_timeout_secs: u64,
}

impl Default for SteamConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            openid_endpoint: STEAM_OPENID_ENDPOINT.to_string(),
            api_base_url: STEAM_API_BASE_URL.to_string(),
            request_timeout_secs: 10,
        }
    }
}

impl SteamConfig {
    /// The API key with `env:` references expanded; empty when unset.
    pub fn resolve_api_key(&self) -> Result<String> {
        match self.api_key.as_deref() {
            Some(key) => resolve_env_reference(key).map_err(|e| anyhow!("steam.api_key: {e}")),
            None => Ok(String::new()),
        }
    }

    pub fn openid_endpoint(&self) -> Result<Url> {
        Url::parse(&self.openid_endpoint)
            .with_context(|| format!("invalid steam.openid_endpoint {:?}", self.openid_endpoint))
    }

    pub fn api_base_url(&self) -> Result<Url> {
        Url::parse(&self.api_base_url)
            .with_context(|| format!("invalid steam.api_base_url {:?}", self.api_base_url))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database file. `~` and environment variables are expanded.
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_data_dir()
                .map(|dir| dir.join("steamgate.db").display().to_string())
                .unwrap_or_else(|_| "steamgate.db".to_string()),
        }
    }
}

impl DatabaseConfig {
    pub fn resolved_path(&self) -> Result<PathBuf> {
        expand_str_path(&self.path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level when neither `RUST_LOG` nor `-v` is given.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load the config file at `path` (if present) with environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with_prefix(path, &env_prefix())
    }

    fn load_with_prefix(path: &Path, prefix: &str) -> Result<Self> {
        let built = Config::builder()
            .add_source(
                File::from(path)
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                Environment::with_prefix(prefix)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("auth.allowed_origins"),
            )
            .build()
            .with_context(|| format!("reading config {}", path.display()))?;

        built
            .try_deserialize()
            .with_context(|| format!("parsing config {}", path.display()))
    }

    /// Check everything the server needs before it starts.
    pub fn validate(&self) -> Result<()> {
        self.auth.validate().map_err(|e| anyhow!("auth: {e}"))?;
        self.server.return_url()?;
        self.steam.openid_endpoint()?;
        self.steam.api_base_url()?;
        self.steam.resolve_api_key()?;
        Ok(())
    }

    /// Default configuration with a freshly generated signing secret.
    pub fn with_generated_secret() -> Self {
        let mut config = Self::default();
        config.auth.jwt_secret = Some(AuthConfig::generate_jwt_secret());
        config
    }
}

/// Write a default config (with a new secret) to `path`.
pub fn write_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating config directory {parent:?}"))?;
    }

    let config = AppConfig::with_generated_secret();
    let toml = toml::to_string_pretty(&config).context("serializing default config to TOML")?;
    let mut body = default_config_header(path);
    body.push_str(&toml);
    fs::write(path, body).with_context(|| format!("writing config file to {}", path.display()))
}

fn default_config_header(path: &Path) -> String {
    format!(
        "# Configuration for {APP_NAME}\n# File: {}\n\n",
        path.display()
    )
}

pub fn expand_path(path: PathBuf) -> Result<PathBuf> {
    if let Some(text) = path.to_str() {
        expand_str_path(text)
    } else {
        Ok(path)
    }
}

fn expand_str_path(text: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(text).context("expanding path")?;
    Ok(PathBuf::from(expanded.to_string()))
}

pub fn default_config_dir() -> Result<PathBuf> {
    if let Some(dir) = env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir).join(APP_NAME));
    }

    if let Some(dir) = dirs::config_dir() {
        return Ok(dir.join(APP_NAME));
    }

    dirs::home_dir()
        .map(|home| home.join(".config").join(APP_NAME))
        .ok_or_else(|| anyhow!("unable to determine configuration directory"))
}

fn default_data_dir() -> Result<PathBuf> {
    if let Some(dir) = env::var_os("XDG_DATA_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir).join(APP_NAME));
    }

    if let Some(dir) = dirs::data_dir() {
        return Ok(dir.join(APP_NAME));
    }

    dirs::home_dir()
        .map(|home| home.join(".local").join("share").join(APP_NAME))
        .ok_or_else(|| anyhow!("unable to determine data directory"))
}

/// `STEAMGATE`, the prefix for environment overrides.
pub fn env_prefix() -> String {
    APP_NAME
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}
