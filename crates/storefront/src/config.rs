//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOREFRONT_JWT_SECRET` - HS256 signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 8080)
//! - `STOREFRONT_JWT_ISSUER` - Token issuer (default: dreamcollections)
//! - `STOREFRONT_JWT_EXPIRATION_SECS` - Access token lifetime (default: 86400)
//! - `STOREFRONT_JWT_REFRESH_EXPIRATION_SECS` - Refresh token lifetime (default: 2592000)
//! - `STOREFRONT_CORS_ORIGIN` - Allowed browser origin for the API
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.1)

use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Matched case-insensitively against signing secrets.
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Token signing configuration
    pub jwt: JwtConfig,
    /// Browser origin allowed by CORS; `None` disables the CORS layer
    pub cors_origin: Option<String>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
    pub sentry_sample_rate: f32,
    pub sentry_traces_sample_rate: f32,
}

/// JSON Web Token configuration.
///
/// Implements `Debug` manually to redact the signing secret.
#[derive(Clone)]
pub struct JwtConfig {
    /// HS256 signing secret
    pub secret: SecretString,
    /// `iss` claim written to and required on every token
    pub issuer: String,
    /// Access token lifetime in seconds
    pub expiration_secs: i64,
    /// Refresh token lifetime in seconds
    pub refresh_expiration_secs: i64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[REDACTED]")
            .field("issuer", &self.issuer)
            .field("expiration_secs", &self.expiration_secs)
            .field("refresh_expiration_secs", &self.refresh_expiration_secs)
            .finish()
    }
}

impl StorefrontConfig {
    /// Read the environment, after loading `.env` when one exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for a missing or unparsable variable, or a JWT
    /// secret that is too short, a placeholder, or low in entropy.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let database_url = database_url("STOREFRONT_DATABASE_URL")?;
        let host = parse_env("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env("STOREFRONT_PORT", "8080")?;
        let jwt = JwtConfig::from_env()?;
        let cors_origin = optional_env("STOREFRONT_CORS_ORIGIN");

        Ok(Self {
            database_url,
            host,
            port,
            jwt,
            cors_origin,
            sentry_dsn: optional_env("SENTRY_DSN"),
            sentry_environment: optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.1")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl JwtConfig {
    fn from_env() -> Result<Self, ConfigError> {
        const SECRET_VAR: &str = "STOREFRONT_JWT_SECRET";
        let secret = required_env(SECRET_VAR)?;
        check_signing_secret(&secret).map_err(|reason| {
            ConfigError::InsecureSecret(SECRET_VAR.to_string(), reason)
        })?;

        let expiration_secs: i64 = parse_env("STOREFRONT_JWT_EXPIRATION_SECS", "86400")?;
        let refresh_expiration_secs: i64 =
            parse_env("STOREFRONT_JWT_REFRESH_EXPIRATION_SECS", "2592000")?;
        if expiration_secs <= 0 || refresh_expiration_secs <= 0 {
            return Err(ConfigError::InvalidEnvVar(
                "STOREFRONT_JWT_EXPIRATION_SECS".to_string(),
                "token lifetimes must be positive".to_string(),
            ));
        }

        Ok(Self {
            secret: SecretString::from(secret),
            issuer: env_or("STOREFRONT_JWT_ISSUER", "dreamcollections"),
            expiration_secs,
            refresh_expiration_secs,
        })
    }
}

fn required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// `primary_key`, then the generic `DATABASE_URL`.
fn database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Empty values count as unset.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    optional_env(key).unwrap_or_else(|| default.to_string())
}

fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    env_or(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Reject signing secrets that are short, look like a placeholder, or have
/// too little entropy. The error is the reason, without the value.
fn check_signing_secret(secret: &str) -> Result<(), String> {
    let length = secret.chars().count();
    if length < MIN_JWT_SECRET_LENGTH {
        return Err(format!(
            "must be at least {MIN_JWT_SECRET_LENGTH} characters (got {length})"
        ));
    }

    let lower = secret.to_lowercase();
    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(format!("looks like a placeholder (contains '{pattern}')"));
    }

    let entropy = bits_per_char(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(format!(
            "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}); generate a random secret"
        ));
    }
    Ok(())
}

/// Shannon entropy of the character distribution.
#[allow(clippy::cast_precision_loss)]
fn bits_per_char(s: &str) -> f64 {
    let mut counts: BTreeMap<char, usize> = BTreeMap::new();
    for c in s.chars() {
        *counts.entry(c).or_default() += 1;
    }
    let total = counts.values().sum::<usize>() as f64;
    counts
        .values()
        .map(|&n| n as f64 / total)
        .map(|p| -p * p.log2())
        .sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const STRONG: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6_";

    fn jwt_config() -> JwtConfig {
        JwtConfig {
            secret: SecretString::from(STRONG),
            issuer: "dreamcollections".to_string(),
            expiration_secs: 86_400,
            refresh_expiration_secs: 2_592_000,
        }
    }

    #[test]
    fn test_bits_per_char() {
        assert!(bits_per_char("").abs() < f64::EPSILON);
        assert!(bits_per_char("zzzzzz").abs() < f64::EPSILON);
        assert!((bits_per_char("abab") - 1.0).abs() < 1e-9);
        assert!((bits_per_char("abcd") - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_signing_secret_rejections() {
        let repetitive = "ab".repeat(20);
        let cases = [
            ("short", "at least 32"),
            ("your-jwt-signing-key-goes-right-here-ok", "placeholder"),
            ("Tr0ub4dor&3-CHANGEME-please-9876543210", "placeholder"),
            (repetitive.as_str(), "entropy"),
        ];
        for (secret, reason) in cases {
            let err = check_signing_secret(secret).unwrap_err();
            assert!(err.contains(reason), "{secret}: {err}");
            assert!(!err.contains(secret), "reason must not echo the secret");
        }
    }

    #[test]
    fn test_signing_secret_accepted() {
        assert!(check_signing_secret(STRONG).is_ok());
    }

    #[test]
    fn test_socket_addr() {
        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/dreamcollections"),
            host: "0.0.0.0".parse().unwrap(),
            port: 8080,
            jwt: jwt_config(),
            cors_origin: None,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.1,
        };
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:8080");
    }

    #[test]
    fn test_jwt_config_debug_redacts_secret() {
        let debug_output = format!("{:?}", jwt_config());
        assert!(debug_output.contains("dreamcollections"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains(STRONG));
    }
}
