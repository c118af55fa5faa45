//! Application configuration.
//!
//! Loaded from a JSON file (path from `TRANSIT_BOARD_CONFIG`, default
//! `transit-board.json`). Every section has defaults, so a partial file or
//! no file at all is fine. The API key is normally supplied through
//! `TRANSITLAND_API_KEY` rather than written to disk.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::clock::DEFAULT_TIME_URL;
use crate::domain::{DelayColors, Whitelist};
use crate::retrieve::{DepartureConfig, MAX_PAGES, MAX_TIMESTAMP_CUTOFF_SECS, PageConfig};
use crate::transitland::{ClientConfig, DEFAULT_BASE_URL};

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "TRANSIT_BOARD_CONFIG";

/// Configuration file used when `TRANSIT_BOARD_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "transit-board.json";

/// Environment variable holding the transitland API key.
pub const API_KEY_ENV: &str = "TRANSITLAND_API_KEY";

/// Errors loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// A named point and radius to scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneConfig {
    /// Shown as the board title
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    /// Metres
    pub radius: f64,
}

impl ZoneConfig {
    pub fn new(name: impl Into<String>, lat: f64, lon: f64, radius: f64) -> Self {
        Self {
            name: name.into(),
            lat,
            lon,
            radius,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |what: &str| {
            Err(ConfigError::Invalid(format!(
                "zone {:?}: {what}",
                self.name
            )))
        };
        if !(-90.0..=90.0).contains(&self.lat) {
            return invalid("latitude must be within [-90, 90]");
        }
        if !(-180.0..=180.0).contains(&self.lon) {
            return invalid("longitude must be within [-180, 180]");
        }
        if !(self.radius > 0.0) {
            return invalid("radius must be positive");
        }
        Ok(())
    }
}

/// Refresh cadence and pagination pacing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Seconds between departure refreshes
    pub departure_period_secs: u64,
    /// Seconds between time re-syncs
    pub time_sync_period_secs: u64,
    /// Milliseconds the background task sleeps between checks
    pub poll_interval_ms: u64,
    /// Seconds to wait before retrying a timed-out page
    pub retry_delay_secs: u64,
    /// Milliseconds to wait between pages
    pub page_delay_ms: u64,
    /// Pages fetched per retrieval at most
    pub max_pages: usize,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            departure_period_secs: 30,
            time_sync_period_secs: 300,
            poll_interval_ms: 10,
            retry_delay_secs: 10,
            page_delay_ms: 1000,
            max_pages: MAX_PAGES,
        }
    }
}

impl RefreshConfig {
    pub fn departure_period(&self) -> Duration {
        Duration::from_secs(self.departure_period_secs)
    }

    pub fn time_sync_period(&self) -> Duration {
        Duration::from_secs(self.time_sync_period_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Pagination settings for requests against `base_url`.
    pub fn page_config(&self, base_url: &str) -> PageConfig {
        PageConfig::default()
            .with_max_pages(self.max_pages)
            .with_retry_delay(Duration::from_secs(self.retry_delay_secs))
            .with_page_delay(Duration::from_millis(self.page_delay_ms))
            .with_base_url(base_url)
    }
}

/// How the board presents what was retrieved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Departure rows shown
    pub rows: usize,
    /// Merge `-N`/`-S`/`-E`/`-W` variants of a line in the route legend
    pub combine_directions: bool,
    pub colors: DelayColors,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            rows: 5,
            combine_directions: true,
            colors: DelayColors::default(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(skip_serializing)]
    pub api_key: String,
    pub base_url: String,
    pub request_timeout_secs: u64,
    /// Server whose `Date` header is used for time sync; host clock when unset
    pub time_url: Option<String>,
    pub listen_addr: String,
    pub zones: Vec<ZoneConfig>,
    pub whitelist: Whitelist,
    pub departures: DepartureConfig,
    pub refresh: RefreshConfig,
    pub display: DisplayConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 30,
            time_url: Some(DEFAULT_TIME_URL.to_string()),
            listen_addr: "127.0.0.1:3000".to_string(),
            zones: vec![ZoneConfig::new(
                "Montgomery",
                37.789323,
                -122.401353,
                100.0,
            )],
            whitelist: Whitelist::inactive(),
            departures: DepartureConfig::default(),
            refresh: RefreshConfig::default(),
            display: DisplayConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load using the environment: config path from `TRANSIT_BOARD_CONFIG`,
    /// API key from `TRANSITLAND_API_KEY`.
    pub fn load() -> Result<Self, ConfigError> {
        let explicit = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        let api_key = std::env::var(API_KEY_ENV).ok();
        Self::load_from(explicit.as_deref(), api_key)
    }

    /// Load from `path`, or from [`DEFAULT_CONFIG_PATH`] if it exists.
    ///
    /// An explicit path must exist; a missing default file yields
    /// [`AppConfig::default`]. `api_key` overrides the file.
    pub fn load_from(path: Option<&Path>, api_key: Option<String>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => Self::default(),
        };

        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            config.api_key = key;
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration file without validating it.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.zones.is_empty() {
            return Err(ConfigError::Invalid("at least one zone is required".into()));
        }
        for zone in &self.zones {
            zone.validate()?;
        }
        if self.refresh.max_pages == 0 {
            return Err(ConfigError::Invalid("max_pages must be at least 1".into()));
        }
        if self.refresh.departure_period_secs == 0 || self.refresh.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "refresh periods must be non-zero".into(),
            ));
        }
        if !(0..=MAX_TIMESTAMP_CUTOFF_SECS).contains(&self.departures.timestamp_cutoff_secs) {
            return Err(ConfigError::Invalid(format!(
                "timestamp_cutoff_secs must be between 0 and {MAX_TIMESTAMP_CUTOFF_SECS}"
            )));
        }
        Ok(())
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(&self.api_key)
            .with_base_url(&self.base_url)
            .with_timeout(self.request_timeout_secs)
    }

    pub fn page_config(&self) -> PageConfig {
        self.refresh.page_config(&self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(json: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.departures.departure_limit, 7);
        assert_eq!(config.departures.next_n_seconds, 6000);
        assert_eq!(config.refresh.departure_period(), Duration::from_secs(30));
        assert_eq!(config.refresh.time_sync_period(), Duration::from_secs(300));
        assert_eq!(config.display.colors.on_time, 0x00FF00);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let file = write_config(
            r#"{
                "zones": [{ "name": "Times Sq-42 St", "lat": 40.7552, "lon": -73.9869, "radius": 100 }],
                "whitelist": { "agencies": ["o-dr5r-nyct"], "active": true },
                "refresh": { "departure_period_secs": 60 }
            }"#,
        );
        let config = AppConfig::load_from(Some(file.path()), Some("key".into())).unwrap();

        assert_eq!(config.zones[0].name, "Times Sq-42 St");
        assert!(config.whitelist.admits("o-dr5r-nyct"));
        assert!(!config.whitelist.admits("o-9q9-bart"));
        assert_eq!(config.refresh.departure_period_secs, 60);
        assert_eq!(config.refresh.time_sync_period_secs, 300);
        assert_eq!(config.api_key, "key");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn api_key_from_file_kept_without_override() {
        let file = write_config(r#"{ "api_key": "from-file" }"#);
        let config = AppConfig::load_from(Some(file.path()), None).unwrap();
        assert_eq!(config.api_key, "from-file");

        let config = AppConfig::load_from(Some(file.path()), Some(String::new())).unwrap();
        assert_eq!(config.api_key, "from-file");
    }

    #[test]
    fn explicit_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load_from(Some(&dir.path().join("nope.json")), None).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn malformed_json_is_error() {
        let file = write_config("{ zones: ");
        let err = AppConfig::load_from(Some(file.path()), None).unwrap_err();
        assert!(matches!(err, ConfigError::Json { .. }));
    }

    #[test]
    fn rejects_bad_zones() {
        let cases = [
            r#"{ "zones": [] }"#,
            r#"{ "zones": [{ "name": "x", "lat": 91, "lon": 0, "radius": 100 }] }"#,
            r#"{ "zones": [{ "name": "x", "lat": 0, "lon": -181, "radius": 100 }] }"#,
            r#"{ "zones": [{ "name": "x", "lat": 0, "lon": 0, "radius": 0 }] }"#,
        ];
        for json in cases {
            let file = write_config(json);
            let err = AppConfig::load_from(Some(file.path()), None).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{json} accepted");
        }
    }

    #[test]
    fn rejects_out_of_range_cutoff() {
        for cutoff in ["-1", "86401", "9223372036854775807"] {
            let json = format!(r#"{{ "departures": {{ "timestamp_cutoff_secs": {cutoff} }} }}"#);
            let file = write_config(&json);
            let err = AppConfig::load_from(Some(file.path()), None).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{cutoff} accepted");
        }

        let file = write_config(r#"{ "departures": { "timestamp_cutoff_secs": 86400 } }"#);
        let config = AppConfig::load_from(Some(file.path()), None).unwrap();
        assert_eq!(config.departures.timestamp_cutoff_secs, 86_400);
    }

    #[test]
    fn page_config_follows_refresh_settings() {
        let mut config = AppConfig::default();
        config.base_url = "http://localhost:9000".into();
        config.refresh.max_pages = 2;
        config.refresh.page_delay_ms = 0;

        let pages = config.page_config();
        assert_eq!(pages.max_pages, 2);
        assert_eq!(pages.page_delay, Duration::ZERO);
        assert_eq!(pages.retry_delay, Duration::from_secs(10));
        assert_eq!(pages.base_url, "http://localhost:9000");
    }

    #[test]
    fn client_config_from_app_config() {
        let mut config = AppConfig::default();
        config.api_key = "k".into();
        config.request_timeout_secs = 5;
        let client = config.client_config();
        assert_eq!(client.api_key, "k");
        assert_eq!(client.timeout_secs, 5);
    }
}
