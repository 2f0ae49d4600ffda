//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `BOOKSTORE_DATA_DIR` - Directory for the file-backed store (default: in-memory)
//! - `BOOKSTORE_SESSION_TTL_HOURS` - Session lifetime in hours (default: 24)
//! - `BOOKSTORE_FREE_SHIPPING_THRESHOLD` - Subtotal at which shipping is free (default: 999)
//! - `BOOKSTORE_SHIPPING_FEE` - Flat shipping fee below the threshold (default: 49)
//! - `BOOKSTORE_TAX_RATE` - Tax rate applied to the subtotal (default: 0.18)
//! - `BOOKSTORE_DELIVERY_DAYS` - Days until estimated delivery (default: 7)
//! - `BOOKSTORE_CURRENCY` - ISO 4217 currency code (default: INR)
//! - `BOOKSTORE_CATALOG_PATH` - JSON file with the book catalog
//! - `BOOKSTORE_LOG_FORMAT` - `pretty` or `json` (default: pretty)

use std::path::PathBuf;
use std::str::FromStr;

use chrono::Duration;
use rust_decimal::Decimal;
use thiserror::Error;

use bookstore_core::{CurrencyCode, Price};

const DEFAULT_SESSION_TTL_HOURS: i64 = 24;
const DEFAULT_FREE_SHIPPING_THRESHOLD: i64 = 999;
const DEFAULT_SHIPPING_FEE: i64 = 49;
const DEFAULT_TAX_RATE: &str = "0.18";
const DEFAULT_DELIVERY_DAYS: i64 = 7;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone, Default)]
pub struct StorefrontConfig {
    pub storage: StorageConfig,
    pub session: SessionConfig,
    pub pricing: PricingConfig,
    /// JSON catalog to load at startup
    pub catalog_path: Option<PathBuf>,
    pub log: LogConfig,
}

/// Where storefront state is persisted.
#[derive(Debug, Clone, Default)]
pub struct StorageConfig {
    /// Data directory for the file backend; `None` keeps everything in memory.
    pub data_dir: Option<PathBuf>,
}

/// Session lifetime settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a sign-in stays valid.
    pub ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::hours(DEFAULT_SESSION_TTL_HOURS),
        }
    }
}

/// Checkout pricing rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingConfig {
    /// Subtotals at or above this ship free.
    pub free_shipping_threshold: Price,
    pub shipping_fee: Price,
    /// Fraction of the subtotal charged as tax.
    pub tax_rate: Decimal,
    pub delivery_days: i64,
    pub currency: CurrencyCode,
}

impl Default for PricingConfig {
    fn default() -> Self {
        let currency = CurrencyCode::default();
        Self {
            free_shipping_threshold: Price::whole(DEFAULT_FREE_SHIPPING_THRESHOLD, currency),
            shipping_fee: Price::whole(DEFAULT_SHIPPING_FEE, currency),
            tax_rate: Decimal::new(18, 2),
            delivery_days: DEFAULT_DELIVERY_DAYS,
            currency,
        }
    }
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("expected 'pretty' or 'json', got '{other}'")),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    pub format: LogFormat,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(&lookup);

        let storage = StorageConfig {
            data_dir: env.optional("BOOKSTORE_DATA_DIR").map(PathBuf::from),
        };

        let ttl_hours: i64 = env.parse_or(
            "BOOKSTORE_SESSION_TTL_HOURS",
            DEFAULT_SESSION_TTL_HOURS.to_string().as_str(),
        )?;
        if ttl_hours <= 0 {
            return Err(invalid("BOOKSTORE_SESSION_TTL_HOURS", "must be positive"));
        }
        let session = SessionConfig {
            ttl: Duration::hours(ttl_hours),
        };

        let currency: CurrencyCode = env.parse_or("BOOKSTORE_CURRENCY", "INR")?;
        let threshold: Decimal = env.parse_or(
            "BOOKSTORE_FREE_SHIPPING_THRESHOLD",
            DEFAULT_FREE_SHIPPING_THRESHOLD.to_string().as_str(),
        )?;
        let fee: Decimal = env.parse_or(
            "BOOKSTORE_SHIPPING_FEE",
            DEFAULT_SHIPPING_FEE.to_string().as_str(),
        )?;
        let tax_rate: Decimal = env.parse_or("BOOKSTORE_TAX_RATE", DEFAULT_TAX_RATE)?;
        let delivery_days: i64 = env.parse_or(
            "BOOKSTORE_DELIVERY_DAYS",
            DEFAULT_DELIVERY_DAYS.to_string().as_str(),
        )?;

        if threshold.is_sign_negative() {
            return Err(invalid("BOOKSTORE_FREE_SHIPPING_THRESHOLD", "must not be negative"));
        }
        if fee.is_sign_negative() {
            return Err(invalid("BOOKSTORE_SHIPPING_FEE", "must not be negative"));
        }
        if tax_rate.is_sign_negative() || tax_rate > Decimal::ONE {
            return Err(invalid("BOOKSTORE_TAX_RATE", "must be between 0 and 1"));
        }
        if delivery_days < 0 {
            return Err(invalid("BOOKSTORE_DELIVERY_DAYS", "must not be negative"));
        }

        let pricing = PricingConfig {
            free_shipping_threshold: Price::new(threshold, currency),
            shipping_fee: Price::new(fee, currency),
            tax_rate,
            delivery_days,
            currency,
        };

        let log = LogConfig {
            format: env.parse_or("BOOKSTORE_LOG_FORMAT", "pretty")?,
        };

        Ok(Self {
            storage,
            session,
            pricing,
            catalog_path: env.optional("BOOKSTORE_CATALOG_PATH").map(PathBuf::from),
            log,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Variable source wrapper.
struct Env<'a, F>(&'a F);

impl<F> Env<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Get an optional variable. Blank values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    /// Parse a variable, falling back to `default` when unset.
    fn parse_or<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self.optional(key).unwrap_or_else(|| default.to_string());
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }
}

fn invalid(key: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidEnvVar(key.to_string(), reason.to_string())
}
