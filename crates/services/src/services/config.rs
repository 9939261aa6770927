//! Runtime configuration, read from the environment once at startup.

use std::{sync::Arc, time::Duration};

use db::{
    DBService,
    store::{PersonStore, SqliteStore, StoreError},
};
use forest::BuildPolicy;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use super::hosted_store::HostedStore;

pub const STORE_URL_VAR: &str = "FAMILY_TREE_STORE_URL";
pub const STORE_KEY_VAR: &str = "FAMILY_TREE_STORE_KEY";
pub const ADMIN_USERNAME_VAR: &str = "FAMILY_TREE_ADMIN_USERNAME";
pub const ADMIN_PASSWORD_VAR: &str = "FAMILY_TREE_ADMIN_PASSWORD";
pub const SESSION_TTL_VAR: &str = "FAMILY_TREE_SESSION_TTL_MINUTES";
pub const SEED_SAMPLE_VAR: &str = "FAMILY_TREE_SEED_SAMPLE";
pub const STRICT_PARENTS_VAR: &str = "FAMILY_TREE_STRICT_PARENTS";

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3001;
const DEFAULT_SESSION_TTL_MINUTES: u64 = 12 * 60;
const MAX_SESSION_TTL_MINUTES: u64 = 366 * 24 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Where the `people` rows live.
#[derive(Debug)]
pub enum StoreConfig {
    Sqlite { url: String },
    Hosted { url: Url, key: SecretString },
}

impl StoreConfig {
    /// Opens the configured backend. SQLite databases are migrated on open.
    pub async fn connect(&self, policy: BuildPolicy) -> Result<Arc<dyn PersonStore>, StoreError> {
        match self {
            StoreConfig::Sqlite { url } => {
                let db = DBService::new(url).await?;
                Ok(Arc::new(SqliteStore::new(db, policy)))
            }
            StoreConfig::Hosted { url, key } => {
                Ok(Arc::new(HostedStore::new(url, key.clone(), policy)?))
            }
        }
    }
}

#[derive(Debug)]
pub struct AdminCredentials {
    pub username: String,
    pub password: SecretString,
}

#[derive(Debug)]
pub struct Config {
    pub store: StoreConfig,
    pub host: String,
    pub port: u16,
    /// `None` disables the admin surface.
    pub admin: Option<AdminCredentials>,
    pub session_ttl: Duration,
    pub seed_sample: bool,
    pub build_policy: BuildPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source. Blank values count
    /// as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let store_url = get(STORE_URL_VAR).ok_or(ConfigError::Missing(STORE_URL_VAR))?;
        let store = if store_url.starts_with("sqlite:") {
            StoreConfig::Sqlite { url: store_url }
        } else {
            let url = Url::parse(&store_url).map_err(|e| ConfigError::Invalid {
                name: STORE_URL_VAR,
                reason: e.to_string(),
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigError::Invalid {
                    name: STORE_URL_VAR,
                    reason: format!("unsupported scheme '{}'", url.scheme()),
                });
            }
            let key = get(STORE_KEY_VAR).ok_or(ConfigError::Missing(STORE_KEY_VAR))?;
            StoreConfig::Hosted {
                url,
                key: SecretString::from(key),
            }
        };

        let host = get("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match get("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                reason: format!("'{raw}' is not a port number"),
            })?,
            None => DEFAULT_PORT,
        };

        let admin = match (get(ADMIN_USERNAME_VAR), get(ADMIN_PASSWORD_VAR)) {
            (Some(username), Some(password)) => Some(AdminCredentials {
                username,
                password: SecretString::from(password),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing(ADMIN_PASSWORD_VAR)),
            (None, Some(_)) => return Err(ConfigError::Missing(ADMIN_USERNAME_VAR)),
        };

        let session_ttl_minutes = match get(SESSION_TTL_VAR) {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|m| (1..=MAX_SESSION_TTL_MINUTES).contains(m))
                .ok_or_else(|| ConfigError::Invalid {
                    name: SESSION_TTL_VAR,
                    reason: format!(
                        "'{raw}' is not a number of minutes between 1 and {MAX_SESSION_TTL_MINUTES}"
                    ),
                })?,
            None => DEFAULT_SESSION_TTL_MINUTES,
        };

        let seed_sample = parse_flag(SEED_SAMPLE_VAR, get(SEED_SAMPLE_VAR))?;
        let build_policy = if parse_flag(STRICT_PARENTS_VAR, get(STRICT_PARENTS_VAR))? {
            BuildPolicy::RejectOrphans
        } else {
            BuildPolicy::AdoptOrphansAsRoots
        };

        Ok(Self {
            store,
            host,
            port,
            admin,
            session_ttl: Duration::from_secs(session_ttl_minutes * 60),
            seed_sample,
            build_policy,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_flag(name: &'static str, value: Option<String>) -> Result<bool, ConfigError> {
    match value.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None | Some("0" | "false" | "no" | "off") => Ok(false),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some(other) => Err(ConfigError::Invalid {
            name,
            reason: format!("'{other}' is not a boolean"),
        }),
    }
}
