//! # Configuration Management
//!
//! This module handles loading and parsing configuration from the uv-config.toml file.
//! It provides a centralized way to configure the location, polling cadence, API host,
//! and display options.

use crate::uv_data::DEFAULT_BASE_URL;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Default config file name, resolved against the working directory
pub const CONFIG_FILE: &str = "uv-config.toml";

/// Application configuration loaded from uv-config.toml
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Where to report UV for
    pub location: LocationConfig,
    /// Refresh cadence
    pub polling: PollingConfig,
    /// Upstream API
    pub api: ApiConfig,
    /// Display and UI configuration
    pub display: DisplayConfig,
}

/// Location to fetch UV data for
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LocationConfig {
    /// Latitude in decimal degrees; the widget shows a setup hint until set
    pub latitude: Option<f64>,
    /// Longitude in decimal degrees
    pub longitude: Option<f64>,
    /// Human-readable name, only used for the header
    pub name: String,
}

/// Polling cadence
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Interval between regular polls in milliseconds
    pub update_interval_ms: u64,
    /// Legacy client-side retry delay in milliseconds.
    /// Accepted for compatibility; retry timing is owned by the fetch backoff.
    pub retry_delay_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        PollingConfig {
            update_interval_ms: 600_000, // 10 minutes
            retry_delay_ms: 5_000,
        }
    }
}

/// Upstream API settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Scheme and host of the UV API
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Display and visualization configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Label shown before the current value
    pub label: String,
    /// Show per-day maxima for the coming days
    pub show_forecast: bool,
    /// Number of days in the daily forecast
    pub forecast_days: usize,
    /// Show the next few hourly values
    pub show_hourly: bool,
    /// Number of hours in the hourly forecast
    pub hourly_hours: usize,
    /// Show the 0-11+ spectrum bar
    pub show_spectrum: bool,
    /// Show whole numbers instead of one decimal
    pub round_value: bool,
    /// Show a header line above the panel
    pub show_header: bool,
    /// Fixed header text; overrides the generated one
    pub header: String,
    /// Append the location name to the generated header
    pub append_location_name: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            label: "UV INDEX".to_string(),
            show_forecast: false,
            forecast_days: 2,
            show_hourly: true,
            hourly_hours: 4,
            show_spectrum: true,
            round_value: false,
            show_header: false,
            header: String::new(),
            append_location_name: false,
        }
    }
}

/// The subset of configuration the Poller runs on.
///
/// Built once at startup and never mutated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollConfig {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub update_interval: Duration,
    /// Unused by the current fetch path; kept so old configs still load
    pub retry_delay: Duration,
}

impl PollConfig {
    /// Both coordinates, if present, finite and in range.
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    /// use uv_index_lib::config::PollConfig;
    ///
    /// let mut config = PollConfig {
    ///     latitude: Some(-33.87),
    ///     longitude: Some(151.21),
    ///     update_interval: Duration::from_secs(600),
    ///     retry_delay: Duration::from_secs(5),
    /// };
    /// assert_eq!(config.coordinates(), Some((-33.87, 151.21)));
    ///
    /// config.latitude = None;
    /// assert_eq!(config.coordinates(), None);
    /// ```
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let lat = self.latitude?;
        let lon = self.longitude?;
        let valid = lat.is_finite()
            && lon.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lon);
        valid.then_some((lat, lon))
    }
}

impl Config {
    /// Load configuration from uv-config.toml file
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load() -> Self {
        Self::load_from_path(CONFIG_FILE)
    }

    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => {
                    log::info!("Loaded configuration from {}", path.display());
                    config
                }
                Err(e) => {
                    log::warn!("Invalid config file format in {}: {}", path.display(), e);
                    log::warn!("Using default configuration (no location set)");
                    Self::default()
                }
            },
            Err(_) => {
                log::info!(
                    "No config file found at {}, using default configuration",
                    path.display()
                );
                Self::default()
            }
        }
    }

    /// Save current configuration to the given path
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path.as_ref(), contents)?;
        log::info!("Configuration saved to {}", path.as_ref().display());
        Ok(())
    }

    /// Save current configuration to uv-config.toml
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to_path(CONFIG_FILE)
    }

    /// Derive the Poller's configuration
    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            latitude: self.location.latitude,
            longitude: self.location.longitude,
            update_interval: Duration::from_millis(self.polling.update_interval_ms),
            retry_delay: Duration::from_millis(self.polling.retry_delay_ms),
        }
    }

    /// Header text, or `None` when headers are disabled
    pub fn header(&self) -> Option<String> {
        if !self.display.show_header {
            return None;
        }
        if !self.display.header.is_empty() {
            return Some(self.display.header.clone());
        }

        let mut header = "UV Index".to_string();
        if self.display.append_location_name && !self.location.name.is_empty() {
            header.push_str(" - ");
            header.push_str(&self.location.name);
        }
        Some(header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.location.latitude, None);
        assert_eq!(config.polling.update_interval_ms, 600_000);
        assert_eq!(config.polling.retry_delay_ms, 5_000);
        assert_eq!(config.api.base_url, "https://currentuvindex.com");
        assert_eq!(config.display.hourly_hours, 4);
        assert_eq!(config.display.forecast_days, 2);
        assert!(config.display.show_hourly);
        assert!(!config.display.show_forecast);
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.location.latitude = Some(47.6);
        config.location.longitude = Some(-122.3);
        config.location.name = "Seattle".to_string();

        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.location.latitude, Some(47.6));
        assert_eq!(parsed.location.name, "Seattle");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[location]\nlatitude = 40.69\nlongitude = -73.92\n\n[polling]\nupdate_interval_ms = 300000"
        )
        .unwrap();

        let config = Config::load_from_path(file.path());
        assert_eq!(config.location.latitude, Some(40.69));
        assert_eq!(config.polling.update_interval_ms, 300_000);
        assert_eq!(config.polling.retry_delay_ms, 5_000);
        assert_eq!(config.display.label, "UV INDEX");

        let poll = config.poll_config();
        assert_eq!(poll.update_interval, Duration::from_secs(300));
        assert_eq!(poll.coordinates(), Some((40.69, -73.92)));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let config = Config::load_from_path("/nonexistent/path");
        // Should fallback to default
        assert_eq!(config.location.latitude, None);
        assert_eq!(config.polling.update_interval_ms, 600_000);
    }

    #[test]
    fn test_load_malformed_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[location\nlatitude = ").unwrap();

        let config = Config::load_from_path(file.path());
        assert_eq!(config.location.latitude, None);
    }

    #[test]
    fn test_save_then_load() {
        let file = NamedTempFile::new().unwrap();
        let mut config = Config::default();
        config.location.latitude = Some(-33.87);
        config.location.longitude = Some(151.21);
        config.save_to_path(file.path()).unwrap();

        let loaded = Config::load_from_path(file.path());
        assert_eq!(loaded.poll_config().coordinates(), Some((-33.87, 151.21)));
    }

    #[test]
    fn test_coordinate_validation() {
        let base = Config::default().poll_config();
        let with = |lat, lon| PollConfig {
            latitude: lat,
            longitude: lon,
            ..base
        };

        assert_eq!(with(None, Some(1.0)).coordinates(), None);
        assert_eq!(with(Some(1.0), None).coordinates(), None);
        assert_eq!(with(Some(91.0), Some(0.0)).coordinates(), None);
        assert_eq!(with(Some(0.0), Some(-181.0)).coordinates(), None);
        assert_eq!(with(Some(f64::NAN), Some(0.0)).coordinates(), None);
        // The equator and prime meridian are real places
        assert_eq!(with(Some(0.0), Some(0.0)).coordinates(), Some((0.0, 0.0)));
    }

    #[test]
    fn test_header() {
        let mut config = Config::default();
        assert_eq!(config.header(), None);

        config.display.show_header = true;
        assert_eq!(config.header().as_deref(), Some("UV Index"));

        config.display.append_location_name = true;
        config.location.name = "Lisbon".to_string();
        assert_eq!(config.header().as_deref(), Some("UV Index - Lisbon"));

        config.display.header = "Sun".to_string();
        assert_eq!(config.header().as_deref(), Some("Sun"));
    }
}
