//! Gateway configuration
//!
//! Read once at startup from environment variables, with defaults.

use std::str::FromStr;
use std::time::Duration;

use auth::{Algorithm, JwtConfig};
use db::DbConfig;
use thiserror::Error;

/// Invalid configuration value
#[derive(Error, Debug, PartialEq, Eq)]
#[error("Invalid value {value:?} for {var}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
}

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Listen address for the HTTP server
    pub http_addr: String,
    /// Gateway version
    pub version: String,
    /// Identity provider domain, e.g. `example.auth0.com`
    pub auth0_domain: String,
    /// Expected `aud` claim
    pub audience: String,
    pub algorithm: Algorithm,
    /// Allowed clock skew when checking `exp`
    pub jwt_leeway_secs: u64,
    /// Explicit JWKS location; derived from the domain when unset
    pub jwks_url_override: Option<String>,
    pub jwks_timeout: Duration,
    pub jwks_refresh_interval: Duration,
    pub jwks_min_refresh_interval: Duration,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_connect_timeout_secs: u64,
    /// Drop, recreate and seed the catalog on startup
    pub reset_db: bool,
}

impl GatewayConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let string = |var: &str, default: &str| lookup(var).unwrap_or_else(|| default.to_string());

        Ok(Self {
            http_addr: string("GATEWAY_HTTP_ADDR", "127.0.0.1:5000"),
            version: env!("CARGO_PKG_VERSION").to_string(),
            auth0_domain: string("AUTH0_DOMAIN", ""),
            audience: string("API_AUDIENCE", "drinks"),
            algorithm: parse(&lookup, "JWT_ALGORITHM", Algorithm::RS256)?,
            jwt_leeway_secs: parse(&lookup, "JWT_LEEWAY_SECS", 30)?,
            jwks_url_override: lookup("JWKS_URL").filter(|url| !url.is_empty()),
            jwks_timeout: Duration::from_secs(parse_positive(&lookup, "JWKS_TIMEOUT_SECS", 5)?),
            jwks_refresh_interval: Duration::from_secs(parse_positive(
                &lookup,
                "JWKS_REFRESH_SECS",
                600,
            )?),
            jwks_min_refresh_interval: Duration::from_secs(parse(
                &lookup,
                "JWKS_MIN_REFRESH_SECS",
                30,
            )?),
            database_url: string("DATABASE_URL", "sqlite://database.db"),
            db_max_connections: parse_positive(&lookup, "DB_MAX_CONNECTIONS", 5)?,
            db_connect_timeout_secs: parse_positive(&lookup, "DB_CONNECT_TIMEOUT_SECS", 30)?,
            reset_db: parse_flag(&lookup, "DRINKS_RESET_DB")?,
        })
    }

    /// Issuer derived from the identity provider domain.
    pub fn issuer(&self) -> Option<String> {
        if self.auth0_domain.is_empty() {
            None
        } else {
            Some(format!("https://{}/", self.auth0_domain))
        }
    }

    /// Where the signing keys are published.
    pub fn jwks_url(&self) -> Option<String> {
        self.jwks_url_override.clone().or_else(|| {
            self.issuer()
                .map(|issuer| format!("{issuer}.well-known/jwks.json"))
        })
    }

    pub fn jwt_config(&self) -> JwtConfig {
        let config = JwtConfig::new(&self.audience)
            .with_algorithm(self.algorithm)
            .with_leeway(self.jwt_leeway_secs);
        match self.issuer() {
            Some(issuer) => config.with_issuer(issuer),
            None => config,
        }
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_url)
            .with_max_connections(self.db_max_connections)
            .with_connect_timeout(self.db_connect_timeout_secs)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            http_addr: "127.0.0.1:5000".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            auth0_domain: String::new(),
            audience: "drinks".to_string(),
            algorithm: Algorithm::RS256,
            jwt_leeway_secs: 30,
            jwks_url_override: None,
            jwks_timeout: Duration::from_secs(5),
            jwks_refresh_interval: Duration::from_secs(600),
            jwks_min_refresh_interval: Duration::from_secs(30),
            database_url: "sqlite://database.db".to_string(),
            db_max_connections: 5,
            db_connect_timeout_secs: 30,
            reset_db: false,
        }
    }
}

fn parse<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError { var, value }),
    }
}

/// Like [`parse`], but zero is rejected.
fn parse_positive<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Default + PartialEq,
{
    let value = parse(lookup, var, default)?;
    if value == T::default() {
        return Err(ConfigError {
            var,
            value: lookup(var).unwrap_or_default(),
        });
    }
    Ok(value)
}

fn parse_flag<F>(lookup: &F, var: &'static str) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var).as_deref().map(str::trim) {
        None | Some("") => Ok(false),
        Some(v) if v == "1" || v.eq_ignore_ascii_case("true") => Ok(true),
        Some(v) if v == "0" || v.eq_ignore_ascii_case("false") => Ok(false),
        Some(v) => Err(ConfigError {
            var,
            value: v.to_string(),
        }),
    }
}
