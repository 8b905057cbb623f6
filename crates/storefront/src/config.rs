//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `TARABA_PRICING_API_URL` - Base URL of the pricing authority
//! - `TARABA_SESSION_SECRET` - Session secret (min 32 chars, high entropy)
//! - `TARABA_DRAFT_PASSPHRASE` - Passphrase for draft encryption at rest
//!
//! ## Optional
//! - `TARABA_HOST` - Bind address (default: 127.0.0.1)
//! - `TARABA_PORT` - Listen port (default: 3000)
//! - `TARABA_BASE_URL` - Public URL (default: `http://localhost:3000`)
//! - `TARABA_LOCALITY_DATASET` - Locality dataset path (default: data/localitati.json)
//! - `TARABA_LOCKER_DATASET` - Locker dataset path (default: data/easybox.json)
//! - `TARABA_FREE_SHIPPING_THRESHOLD` - RON amount for free shipping (default: 200)
//! - `TARABA_COURIER_RATE` - Flat courier fee in RON (default: 17)
//! - `TARABA_LOCKER_RATE` - Flat locker fee in RON (default: 13)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use taraba_checkout::shipping::ShippingConfig;
use taraba_core::Money;
use thiserror::Error;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
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
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Session secret
    pub session_secret: SecretString,
    /// Passphrase for encrypting persisted checkout drafts
    pub draft_passphrase: SecretString,
    /// Base URL of the pricing authority
    pub pricing_api_url: String,
    /// Path to the reference locality dataset (JSON)
    pub locality_dataset: PathBuf,
    /// Path to the parcel locker directory (JSON)
    pub locker_dataset: PathBuf,
    /// Shipping rates and free-shipping threshold
    pub shipping: ShippingConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("TARABA_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("TARABA_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("TARABA_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("TARABA_PORT".to_string(), e.to_string()))?;
        let base_url = get_env_or_default("TARABA_BASE_URL", "http://localhost:3000");

        let session_secret = get_validated_secret("TARABA_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "TARABA_SESSION_SECRET")?;
        let draft_passphrase = get_validated_secret("TARABA_DRAFT_PASSPHRASE")?;

        let pricing_api_url = get_required_env("TARABA_PRICING_API_URL")?;

        let locality_dataset =
            PathBuf::from(get_env_or_default("TARABA_LOCALITY_DATASET", "data/localitati.json"));
        let locker_dataset =
            PathBuf::from(get_env_or_default("TARABA_LOCKER_DATASET", "data/easybox.json"));

        let shipping = ShippingConfig {
            free_shipping_threshold: get_money_or_default("TARABA_FREE_SHIPPING_THRESHOLD", "200")?,
            courier_rate: get_money_or_default("TARABA_COURIER_RATE", "17")?,
            locker_rate: get_money_or_default("TARABA_LOCKER_RATE", "13")?,
        };

        Ok(Self {
            host,
            port,
            base_url,
            session_secret,
            draft_passphrase,
            pricing_api_url,
            locality_dataset,
            locker_dataset,
            shipping,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a RON amount from the environment, with a default.
fn get_money_or_default(key: &str, default: &str) -> Result<Money, ConfigError> {
    let raw = get_env_or_default(key, default);
    Decimal::from_str(&raw)
        .map(Money::new)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Real secrets like API keys have high entropy
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
