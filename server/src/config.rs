use std::{env, fmt::Display, str::FromStr, time::Duration};

use axum::http::HeaderValue;
use pokedex_core::{ImagePolicy, UpstreamConfig};
use thiserror::Error;
use tracing::{info, warn};

/// Signed-cookie keys need 64 bytes of material.
pub const MIN_SESSION_SECRET_LEN: usize = 64;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid {key} value {value:?}: {message}")]
    Invalid {
        key: &'static str,
        value: String,
        message: String,
    },

    #[error("SESSION_SECRET must be at least {MIN_SESSION_SECRET_LEN} bytes, got {0}")]
    ShortSecret(usize),
}

/// Login accepted by `/login`. Compared case-sensitively.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

pub struct Config {
    pub port: u16,
    pub upstream: UpstreamConfig,
    pub upstream_timeout: Duration,
    pub cors_origins: Vec<HeaderValue>,
    pub session_secret: Option<Vec<u8>>,
    pub session_cookie_secure: bool,
    pub credentials: Credentials,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `load` uses the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = UpstreamConfig::default();
        let upstream = UpstreamConfig {
            graphql_url: try_load(&lookup, "POKEAPI_GRAPHQL_URL", &defaults.graphql_url)?,
            rest_base_url: try_load(&lookup, "POKEAPI_BASE_URL", &defaults.rest_base_url)?,
            sprite_base_url: try_load(&lookup, "POKEAPI_SPRITE_BASE_URL", &defaults.sprite_base_url)?,
            catalog_size: try_load(&lookup, "POKEDEX_CATALOG_SIZE", &defaults.catalog_size.to_string())?,
            image_policy: try_load::<ImagePolicy, _>(&lookup, "POKEDEX_IMAGE_POLICY", "synthesized")?,
        };

        let timeout_secs: u64 = try_load(&lookup, "UPSTREAM_TIMEOUT_SECS", "10")?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "UPSTREAM_TIMEOUT_SECS",
                value: timeout_secs.to_string(),
                message: "must be positive".to_string(),
            });
        }

        let cors_origins = try_load::<String, _>(&lookup, "CORS_ORIGINS", "http://localhost:3000")?
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(|origin| {
                if origin == "*" {
                    return Err(ConfigError::Invalid {
                        key: "CORS_ORIGINS",
                        value: origin.to_string(),
                        message: "wildcard origin cannot be used with credentialed requests"
                            .to_string(),
                    });
                }
                HeaderValue::from_str(origin).map_err(|e| ConfigError::Invalid {
                    key: "CORS_ORIGINS",
                    value: origin.to_string(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let session_secret = match lookup("SESSION_SECRET") {
            Some(secret) if secret.len() < MIN_SESSION_SECRET_LEN => {
                return Err(ConfigError::ShortSecret(secret.len()));
            }
            Some(secret) => Some(secret.into_bytes()),
            None => {
                warn!("SESSION_SECRET not set, sessions will not survive a restart");
                None
            }
        };

        Ok(Self {
            port: try_load(&lookup, "PORT", "3001")?,
            upstream,
            upstream_timeout: Duration::from_secs(timeout_secs),
            cors_origins,
            session_secret,
            session_cookie_secure: try_load(&lookup, "SESSION_COOKIE_SECURE", "false")?,
            credentials: Credentials {
                username: try_load(&lookup, "AUTH_USERNAME", "admin")?,
                password: try_load(&lookup, "AUTH_PASSWORD", "admin")?,
            },
        })
    }
}

fn try_load<T, F>(lookup: &F, key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    value.trim().parse().map_err(|e: T::Err| {
        warn!("Invalid {key} value: {e}");
        ConfigError::Invalid {
            key,
            value: value.clone(),
            message: e.to_string(),
        }
    })
}
