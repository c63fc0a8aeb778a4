mod file_config;

pub use file_config::{AuthConfig, FileConfig};

use crate::server::RequestsLoggingLevel;
use crate::user::{DEFAULT_TOKEN_LIFETIME, MAX_TOKEN_LIFETIME};
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

/// CLI arguments that can be overridden by the TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub jwt_secret: Option<String>,
    pub token_lifetime_sec: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub auth: AuthSettings,
}

#[derive(Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub token_lifetime: Duration,
}

// Keeps the secret out of logs.
impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("jwt_secret", &"<redacted>")
            .field("token_lifetime", &self.token_lifetime)
            .finish()
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let auth_file = file.auth.unwrap_or_default();
        let jwt_secret = auth_file
            .jwt_secret
            .or_else(|| cli.jwt_secret.clone())
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "jwt_secret must be specified via --jwt-secret, JWT_SECRET or in config file"
                )
            })?;
        let token_lifetime = auth_file
            .token_lifetime_sec
            .or(cli.token_lifetime_sec)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME);
        if token_lifetime.is_zero() {
            bail!("Token lifetime must be greater than zero");
        }
        if token_lifetime > MAX_TOKEN_LIFETIME {
            bail!(
                "Token lifetime must not exceed {} seconds",
                MAX_TOKEN_LIFETIME.as_secs()
            );
        }

        Ok(Self {
            db_dir,
            port,
            logging_level,
            auth: AuthSettings {
                jwt_secret,
                token_lifetime,
            },
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.db_dir.join("playlist.db")
    }
}

fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
