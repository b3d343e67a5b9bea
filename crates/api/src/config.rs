//! Runtime configuration read from the environment.

use std::net::SocketAddr;

use orgusers_infra::BootstrapSuperuser;

const DEFAULT_BIND: &str = "0.0.0.0:8080";
const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid ORGUSERS_BIND '{value}': {reason}")]
    InvalidBind { value: String, reason: String },

    #[error("ORGUSERS_BOOTSTRAP_PASSWORD is required when ORGUSERS_BOOTSTRAP_SUPERUSER is set")]
    MissingBootstrapPassword,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind: SocketAddr,
    pub jwt_secret: String,
    /// Postgres connection string; used only with the `postgres` feature.
    pub database_url: Option<String>,
    pub bootstrap: Option<BootstrapSuperuser>,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_raw = lookup("ORGUSERS_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind_raw
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::InvalidBind {
                value: bind_raw.clone(),
                reason: e.to_string(),
            })?;

        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let database_url = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty());

        let bootstrap = match lookup("ORGUSERS_BOOTSTRAP_SUPERUSER").filter(|v| !v.trim().is_empty()) {
            None => None,
            Some(username) => Some(BootstrapSuperuser {
                username,
                password: lookup("ORGUSERS_BOOTSTRAP_PASSWORD")
                    .ok_or(ConfigError::MissingBootstrapPassword)?,
                email: lookup("ORGUSERS_BOOTSTRAP_EMAIL").unwrap_or_default(),
            }),
        };

        Ok(Self {
            bind,
            jwt_secret,
            database_url,
            bootstrap,
        })
    }
}
