use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

/// Environment variable that overrides the stored API key.
pub const API_KEY_ENV: &str = "WEATHERVIEW_API_KEY";

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
pub const DEFAULT_GEOCODING_URL: &str = "https://api.openweathermap.org/geo/1.0";
pub const DEFAULT_LANG: &str = "zh_cn";
pub const DEFAULT_MAX_CITIES: usize = 3;

/// Connection settings for the weather provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Example TOML:
    /// [provider]
    /// api_key = "..."
    pub api_key: Option<String>,
    pub base_url: String,
    pub geocoding_url: String,
    pub lang: String,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            geocoding_url: DEFAULT_GEOCODING_URL.to_string(),
            lang: DEFAULT_LANG.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// How many recently viewed cities to keep.
    pub max_cities: usize,
    /// JSON array of `{city_name, city_code}` objects.
    pub city_codes: Option<PathBuf>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            max_cities: DEFAULT_MAX_CITIES,
            city_codes: None,
        }
    }
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub provider: ProviderSettings,
    pub app: AppSettings,
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(contents)?;
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

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weatherview", "weatherview")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Set or replace the provider API key.
    pub fn set_api_key(&mut self, api_key: String) {
        self.provider.api_key = Some(api_key);
    }

    /// Returns the stored API key, if present and non-blank.
    pub fn api_key(&self) -> Option<&str> {
        self.provider
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// Apply the [`API_KEY_ENV`] override.
    pub fn with_env_overrides(mut self) -> Self {
        self.apply_api_key_override(std::env::var(API_KEY_ENV).ok());
        self
    }

    fn apply_api_key_override(&mut self, key: Option<String>) {
        if let Some(key) = key.filter(|k| !k.trim().is_empty()) {
            self.provider.api_key = Some(key);
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key().is_some()
    }

    /// `max_cities` clamped to at least one.
    pub fn max_cities(&self) -> usize {
        self.app.max_cities.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_points_at_openweather() {
        let cfg = Config::default();

        assert_eq!(cfg.provider.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.provider.lang, "zh_cn");
        assert_eq!(cfg.max_cities(), 3);
        assert!(!cfg.is_configured());
    }

    #[test]
    fn set_api_key_configures_provider() {
        let mut cfg = Config::default();

        cfg.set_api_key("OPEN_KEY".into());

        assert_eq!(cfg.api_key(), Some("OPEN_KEY"));
        assert!(cfg.is_configured());
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let mut cfg = Config::default();
        cfg.set_api_key("   ".into());
        assert!(!cfg.is_configured());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg = Config::from_toml(
            r#"
            [provider]
            api_key = "abc"

            [app]
            max_cities = 5
            "#,
        )
        .unwrap();

        assert_eq!(cfg.api_key(), Some("abc"));
        assert_eq!(cfg.provider.geocoding_url, DEFAULT_GEOCODING_URL);
        assert_eq!(cfg.max_cities(), 5);
        assert!(cfg.app.city_codes.is_none());
    }

    #[test]
    fn zero_max_cities_is_clamped() {
        let cfg = Config::from_toml("[app]\nmax_cities = 0\n").unwrap();
        assert_eq!(cfg.max_cities(), 1);
    }

    #[test]
    fn env_override_replaces_stored_key_unless_blank() {
        let mut cfg = Config::default();
        cfg.set_api_key("stored".into());

        cfg.apply_api_key_override(Some("  ".into()));
        assert_eq!(cfg.api_key(), Some("stored"));

        cfg.apply_api_key_override(Some("from-env".into()));
        assert_eq!(cfg.api_key(), Some("from-env"));
    }

    #[test]
    fn round_trips_through_toml() {
        let mut cfg = Config::default();
        cfg.set_api_key("KEY".into());
        cfg.app.city_codes = Some(PathBuf::from("/tmp/citycode.json"));

        let text = toml::to_string_pretty(&cfg).unwrap();
        let back = Config::from_toml(&text).unwrap();

        assert_eq!(back.api_key(), Some("KEY"));
        assert_eq!(back.app.city_codes, cfg.app.city_codes);
    }
}
