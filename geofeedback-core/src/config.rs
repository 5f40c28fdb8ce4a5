use crate::cluster::ClusterOptions;
use crate::zones::{RiskZone, default_zones};
use anyhow::{Context, Result, bail};
use geofeedback_loader::source::DEFAULT_API_PREFIX;
use geofeedback_loader::{DataSource, LocalSource};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

pub const DEFAULT_CONFIG_PATH: &str = "~/.config/geofeedback/config.toml";
pub const DEFAULT_BASE_URL: &str = "https://demogeofeedback-production.up.railway.app";
pub const DEFAULT_LOCAL_PATH: &str = "data/processed/infrastructure_with_risk.geojson";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    #[default]
    Remote,
    Local,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub mode: SourceMode,
    pub base_url: String,
    pub api_prefix: String,
    /// File path or http(s) URL of the static GeoJSON document.
    pub local: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            mode: SourceMode::Remote,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            local: DEFAULT_LOCAL_PATH.to_string(),
        }
    }
}

impl SourceConfig {
    pub fn to_data_source(&self) -> Result<DataSource> {
        let local = LocalSource::parse(&shellexpand::tilde(&self.local));
        match self.mode {
            SourceMode::Local => Ok(DataSource::local(local)),
            SourceMode::Remote => {
                let base_url = Url::parse(self.base_url.trim())
                    .with_context(|| format!("Invalid API base URL: {}", self.base_url))?;
                if !matches!(base_url.scheme(), "http" | "https") {
                    bail!("API base URL must be http or https: {}", base_url);
                }
                Ok(DataSource::Remote {
                    base_url,
                    api_prefix: self.api_prefix.clone(),
                    fallback: local,
                })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// `[lat, lng]`
    pub center: [f64; 2],
    pub zoom: u8,
    /// Zoom used when jumping to a search result.
    pub focus_zoom: u8,
    pub max_zoom: u8,
    pub tile_url: String,
    pub attribution: String,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center: [-32.5067, -71.4492],
            zoom: 13,
            focus_zoom: 16,
            max_zoom: 19,
            tile_url: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            attribution: "© OpenStreetMap contributors".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub source: SourceConfig,
    pub map: MapConfig,
    pub cluster: ClusterOptions,
    pub risk_zones: Vec<RiskZone>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            map: MapConfig::default(),
            cluster: ClusterOptions::default(),
            risk_zones: default_zones(),
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML configuration in {}", path.display()))?;
        Ok(config)
    }

    /// Built-in defaults when `path` does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            debug!("Loading configuration from {}", path.display());
            Self::load_from_file(path)
        } else {
            debug!("No configuration at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Replace the source with a `--local` or `--api` command-line choice.
    pub fn override_source(&mut self, local: Option<&str>, api: Option<&str>) {
        if let Some(local) = local {
            self.source.mode = SourceMode::Local;
            self.source.local = local.to_string();
        } else if let Some(api) = api {
            self.source.mode = SourceMode::Remote;
            self.source.base_url = api.to_string();
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}

/// `--config` value, or the default location, tilde-expanded.
pub fn resolve_config_path(path: Option<&str>) -> PathBuf {
    let raw = path.unwrap_or(DEFAULT_CONFIG_PATH);
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

/// Write the default configuration, creating parent directories.
pub fn write_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let mut content = String::from("# GeoFeedback configuration\n# source.mode: \"remote\" (API with local fallback) or \"local\"\n\n");
    content.push_str(&AppConfig::default().to_toml()?);

    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
