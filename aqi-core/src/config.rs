use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

use crate::{
    fetcher::FetchOptions,
    normalize::AxisOrderPolicy,
    region::RegionId,
    source::waqi::DEFAULT_BASE_URL,
};

/// Environment variable that overrides the stored token.
pub const TOKEN_ENV: &str = "WAQI_TOKEN";

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// token = "..."
/// default_region = "kathmandu-valley"
/// refresh_interval_secs = 60
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// WAQI API token.
    pub token: Option<String>,

    pub base_url: String,

    /// Region id, e.g. "nepal" or "kathmandu-valley".
    pub default_region: Option<String>,

    pub refresh_interval_secs: u64,

    pub max_concurrent: usize,

    pub timeout_secs: u64,

    pub max_retries: u32,

    /// How bare `[a, b]` geo arrays are ordered.
    pub geo_order: GeoOrder,

    /// With `geo_order = "magnitude"`, the single value above this is the
    /// longitude.
    pub longitude_threshold: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GeoOrder {
    Magnitude,
    LatLng,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            default_region: None,
            refresh_interval_secs: 60,
            max_concurrent: 4,
            timeout_secs: 15,
            max_retries: 2,
            geo_order: GeoOrder::Magnitude,
            longitude_threshold: 80.0,
        }
    }
}

impl Config {
    /// Token from `WAQI_TOKEN`, falling back to the config file.
    pub fn token(&self) -> Result<String> {
        self.resolve_token(std::env::var(TOKEN_ENV).ok())
    }

    pub fn resolve_token(&self, from_env: Option<String>) -> Result<String> {
        from_env
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.token.clone().filter(|t| !t.trim().is_empty()))
            .ok_or_else(|| {
                anyhow!(
                    "No API token configured.\n\
                     Hint: run `aqi configure` or set {TOKEN_ENV}."
                )
            })
    }

    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    /// Configured default region, or Nepal when none is set.
    pub fn default_region_id(&self) -> Result<RegionId> {
        match self.default_region.as_deref() {
            Some(s) => RegionId::try_from(s),
            None => Ok(RegionId::Nepal),
        }
    }

    pub fn set_default_region(&mut self, id: RegionId) {
        self.default_region = Some(id.as_str().to_string());
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn axis_policy(&self) -> AxisOrderPolicy {
        match self.geo_order {
            GeoOrder::Magnitude => AxisOrderPolicy::LongitudeAbove(self.longitude_threshold),
            GeoOrder::LatLng => AxisOrderPolicy::LatLng,
        }
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            max_concurrent: self.max_concurrent.max(1),
            axis_policy: self.axis_policy(),
            ..FetchOptions::default()
        }
    }

    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "aqi-watch", "aqi")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}
