//! Site configuration.
//!
//! Built once at process start and handed to the engines by reference.
//! Sources, lowest to highest precedence:
//! 1. `~/.config/refugio/config.toml` (or the path given explicitly / `REFUGIO_CONFIG`)
//! 2. `REFUGIO__*` environment variables, `__` separating nested keys
//!    (e.g. `REFUGIO__PAYMENT__ACCESS_TOKEN`)

mod unit;

pub use unit::RentalUnit;

use std::path::PathBuf;

use chrono_tz::Tz;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::error::{RefugioError, RefugioResult};

const DEFAULT_BIND: &str = "127.0.0.1:4096";
const DEFAULT_REVIEW_LOG: &str = "~/.local/share/refugio/review.jsonl";

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

fn default_review_log() -> String {
    DEFAULT_REVIEW_LOG.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_currency() -> String {
    "CLP".to_string()
}

fn default_payment_api() -> String {
    "https://api.mercadopago.com".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Domain used for outbound feed UIDs (`{record_id}@{domain}`).
    pub domain: String,

    #[serde(default = "default_currency")]
    pub currency: String,

    /// IANA zone the third-party feed's timed events are floored in. UTC if unset.
    #[serde(default)]
    pub feed_timezone: Option<String>,

    /// Where post-payment conflicts are appended for manual review.
    #[serde(default = "default_review_log")]
    pub review_log: String,

    #[serde(default)]
    pub units: Vec<RentalUnit>,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub payment: PaymentConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfig {
    #[serde(default = "default_payment_api")]
    pub api_base: String,
    #[serde(default)]
    pub access_token: String,
    /// Shared secret for webhook signatures. Unset disables verification.
    #[serde(default)]
    pub webhook_secret: Option<String>,
    #[serde(default)]
    pub success_url: String,
    #[serde(default)]
    pub failure_url: String,
    #[serde(default)]
    pub pending_url: String,
    #[serde(default)]
    pub notification_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        PaymentConfig {
            api_base: default_payment_api(),
            access_token: String::new(),
            webhook_secret: None,
            success_url: String::new(),
            failure_url: String::new(),
            pending_url: String::new(),
            notification_url: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Bearer token for the sync trigger and admin endpoints.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub feed_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            token: None,
            feed_timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: default_bind(),
        }
    }
}

impl SiteConfig {
    /// Default location: `REFUGIO_CONFIG` if set, else `~/.config/refugio/config.toml`.
    pub fn config_path() -> RefugioResult<PathBuf> {
        if let Ok(path) = std::env::var("REFUGIO_CONFIG") {
            return Ok(expand(&path));
        }

        let config_dir = dirs::config_dir()
            .ok_or_else(|| RefugioError::Config("Could not determine config directory".into()))?
            .join("refugio");

        Ok(config_dir.join("config.toml"))
    }

    /// Load from `path` (or the default location) layered with `REFUGIO__*` env vars.
    pub fn load(path: Option<&str>) -> RefugioResult<Self> {
        let config_path = match path {
            Some(p) => expand(p),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            return Err(RefugioError::Config(format!(
                "Config file not found at {}",
                config_path.display()
            )));
        }

        let config: SiteConfig = Config::builder()
            .add_source(File::from(config_path))
            .add_source(
                Environment::with_prefix("REFUGIO")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .map_err(|e| RefugioError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| RefugioError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document directly (no env layering).
    pub fn from_toml(content: &str) -> RefugioResult<Self> {
        let config: SiteConfig = Config::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()
            .map_err(|e| RefugioError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| RefugioError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> RefugioResult<()> {
        if self.domain.trim().is_empty() {
            return Err(RefugioError::Config("domain must be set".into()));
        }

        let mut seen = std::collections::HashSet::new();
        for unit in &self.units {
            if !seen.insert(unit.id.as_str()) {
                return Err(RefugioError::Config(format!("Duplicate unit id '{}'", unit.id)));
            }
            if unit.capacity == 0 {
                return Err(RefugioError::Config(format!(
                    "Unit '{}' must hold at least one guest",
                    unit.id
                )));
            }
        }

        self.feed_tz()?;
        Ok(())
    }

    pub fn unit(&self, id: &str) -> RefugioResult<&RentalUnit> {
        self.units
            .iter()
            .find(|u| u.id == id)
            .ok_or_else(|| RefugioError::UnitNotFound(id.to_string()))
    }

    /// Units that publish a third-party feed.
    pub fn feed_units(&self) -> impl Iterator<Item = &RentalUnit> {
        self.units.iter().filter(|u| u.has_feed())
    }

    pub fn feed_tz(&self) -> RefugioResult<Tz> {
        match self.feed_timezone.as_deref() {
            None | Some("") => Ok(Tz::UTC),
            Some(name) => name
                .parse::<Tz>()
                .map_err(|_| RefugioError::Config(format!("Unknown timezone '{}'", name))),
        }
    }

    pub fn review_log_path(&self) -> PathBuf {
        expand(&self.review_log)
    }
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
domain = "refugio.example"
feed_timezone = "America/Santiago"

[[units]]
id = "refugio-intimo"
name = "Refugio Íntimo"
capacity = 2
feed_url = "https://example.com/ical/1.ics"
nightly_rate = 65000
cleaning_fee = 15000
maintenance = [{ start = "2025-06-01", end = "2025-06-05" }]

[[units]]
id = "cabana-bosque"
name = "Cabaña del Bosque"
capacity = 6

[sync]
token = "s3cret"
"#;

    #[test]
    fn loads_units_and_defaults() {
        let config = SiteConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(config.units.len(), 2);
        assert_eq!(config.currency, "CLP");
        assert_eq!(config.server.bind, DEFAULT_BIND);
        assert_eq!(config.sync.token.as_deref(), Some("s3cret"));

        let unit = config.unit("refugio-intimo").unwrap();
        assert_eq!(unit.capacity, 2);
        assert_eq!(unit.maintenance.len(), 1);
        assert_eq!(unit.maintenance[0].nights(), 4);
    }

    #[test]
    fn feed_units_skip_units_without_url() {
        let config = SiteConfig::from_toml(SAMPLE).unwrap();
        let ids: Vec<_> = config.feed_units().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["refugio-intimo"]);
    }

    #[test]
    fn unknown_unit_is_an_error() {
        let config = SiteConfig::from_toml(SAMPLE).unwrap();
        assert!(matches!(config.unit("nope"), Err(RefugioError::UnitNotFound(_))));
    }

    #[test]
    fn rejects_duplicate_units_and_bad_timezone() {
        let dup = r#"
domain = "x"
[[units]]
id = "a"
name = "A"
capacity = 1
[[units]]
id = "a"
name = "A again"
capacity = 1
"#;
        assert!(SiteConfig::from_toml(dup).is_err());

        let bad_tz = "domain = \"x\"\nfeed_timezone = \"Mars/Olympus\"\n";
        assert!(SiteConfig::from_toml(bad_tz).is_err());
    }

    #[test]
    fn feed_timezone_parses() {
        let config = SiteConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(config.feed_tz().unwrap(), chrono_tz::America::Santiago);
    }
}
