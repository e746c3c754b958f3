//! Application configuration loaded from environment variables.

use std::time::Duration;

use checkout::{CheckoutConfig, STRIPE_API_BASE};
use domain::Currency;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {var}")]
    Invalid { var: &'static str, value: String },
}

/// Output format of the `fmt` tracing layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Server configuration.
///
/// Reads from environment variables (a `.env` file is loaded first when
/// present):
/// - `HOST` (default `0.0.0.0`), `PORT` (default `5001`)
/// - `RUST_LOG` (default `info`), `LOG_FORMAT` (`pretty` or `json`)
/// - `JWT_SECRET`, required
/// - `DATABASE_URL`, PostgreSQL event store when set
/// - `STRIPE_SECRET_KEY`, `STRIPE_PUBLISHABLE_KEY`, `STRIPE_API_BASE`
/// - `PAYMENT_CURRENCY` (default `eur`), `PAYMENT_GATEWAY_TIMEOUT_SECS`
///   (default `10`), `VERIFY_PAYMENTS` (default `false`)
#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub jwt_secret: String,
    pub database_url: Option<String>,
    pub stripe_secret_key: Option<String>,
    pub stripe_publishable_key: String,
    pub stripe_api_base: String,
    pub payment_currency: Currency,
    pub gateway_timeout: Duration,
    pub verify_payments: bool,
}

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let port = match var("PORT") {
            Some(v) => v
                .parse()
                .map_err(|_| ConfigError::Invalid { var: "PORT", value: v })?,
            None => 5001,
        };

        let log_format = match var("LOG_FORMAT").as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "LOG_FORMAT",
                    value: other.to_string(),
                });
            }
        };

        let payment_currency = match var("PAYMENT_CURRENCY") {
            Some(v) => Currency::parse(&v).map_err(|_| ConfigError::Invalid {
                var: "PAYMENT_CURRENCY",
                value: v,
            })?,
            None => Currency::default(),
        };

        let gateway_timeout = match var("PAYMENT_GATEWAY_TIMEOUT_SECS") {
            Some(v) => match v.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "PAYMENT_GATEWAY_TIMEOUT_SECS",
                        value: v,
                    });
                }
            },
            None => Duration::from_secs(10),
        };

        let verify_payments = match var("VERIFY_PAYMENTS") {
            Some(v) => parse_bool(&v).ok_or(ConfigError::Invalid {
                var: "VERIFY_PAYMENTS",
                value: v,
            })?,
            None => false,
        };

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            log_level: var("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            log_format,
            jwt_secret: var("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?,
            database_url: var("DATABASE_URL"),
            stripe_secret_key: var("STRIPE_SECRET_KEY"),
            stripe_publishable_key: var("STRIPE_PUBLISHABLE_KEY").unwrap_or_default(),
            stripe_api_base: var("STRIPE_API_BASE").unwrap_or_else(|| STRIPE_API_BASE.to_string()),
            payment_currency,
            gateway_timeout,
            verify_payments,
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn checkout_config(&self) -> CheckoutConfig {
        CheckoutConfig {
            currency: self.payment_currency.clone(),
            verify_payments: self.verify_payments,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("log_level", &self.log_level)
            .field("log_format", &self.log_format)
            .field("database", &self.database_url.is_some())
            .field("stripe", &self.stripe_secret_key.is_some())
            .field("stripe_api_base", &self.stripe_api_base)
            .field("payment_currency", &self.payment_currency)
            .field("gateway_timeout", &self.gateway_timeout)
            .field("verify_payments", &self.verify_payments)
            .finish_non_exhaustive()
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = load(&[("JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 5001);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.database_url, None);
        assert_eq!(config.stripe_secret_key, None);
        assert_eq!(config.stripe_api_base, STRIPE_API_BASE);
        assert_eq!(config.payment_currency.as_str(), "eur");
        assert_eq!(config.gateway_timeout, Duration::from_secs(10));
        assert!(!config.verify_payments);
    }

    #[test]
    fn test_jwt_secret_is_required() {
        assert_eq!(load(&[]).unwrap_err(), ConfigError::Missing("JWT_SECRET"));
        assert_eq!(
            load(&[("JWT_SECRET", "  ")]).unwrap_err(),
            ConfigError::Missing("JWT_SECRET")
        );
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("JWT_SECRET", "s3cret"),
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("LOG_FORMAT", "json"),
            ("DATABASE_URL", "postgres://localhost/shop"),
            ("STRIPE_SECRET_KEY", "sk_test_1"),
            ("PAYMENT_CURRENCY", "USD"),
            ("PAYMENT_GATEWAY_TIMEOUT_SECS", "3"),
            ("VERIFY_PAYMENTS", "true"),
        ])
        .unwrap();

        assert_eq!(config.addr(), "127.0.0.1:8080");
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(config.database_url.is_some());
        assert_eq!(config.payment_currency.as_str(), "usd");
        assert_eq!(config.gateway_timeout, Duration::from_secs(3));

        let checkout = config.checkout_config();
        assert!(checkout.verify_payments);
        assert_eq!(checkout.currency.as_str(), "usd");
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            load(&[("JWT_SECRET", "s"), ("PORT", "http")]),
            Err(ConfigError::Invalid { var: "PORT", .. })
        ));
        assert!(matches!(
            load(&[("JWT_SECRET", "s"), ("LOG_FORMAT", "xml")]),
            Err(ConfigError::Invalid { var: "LOG_FORMAT", .. })
        ));
        assert!(matches!(
            load(&[("JWT_SECRET", "s"), ("VERIFY_PAYMENTS", "maybe")]),
            Err(ConfigError::Invalid { var: "VERIFY_PAYMENTS", .. })
        ));
        assert!(matches!(
            load(&[("JWT_SECRET", "s"), ("PAYMENT_GATEWAY_TIMEOUT_SECS", "0")]),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_debug_hides_secrets() {
        let config = load(&[("JWT_SECRET", "jwt-s3cret"), ("STRIPE_SECRET_KEY", "sk_live_x")]).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("jwt-s3cret"));
        assert!(!debug.contains("sk_live_x"));
    }
}
