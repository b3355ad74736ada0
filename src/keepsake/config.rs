use crate::error::{KeepsakeError, Result};
use crate::image::DEFAULT_MAX_IMAGE_BYTES;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

const CONFIG_FILENAME: &str = "config.json";
const DEFAULT_BUCKET: &str = "memories";
// Roughly what a browser grants one origin
const DEFAULT_CACHE_QUOTA: usize = 5 * 1024 * 1024;

pub const ENV_HOME: &str = "KEEPSAKE_HOME";
pub const ENV_BACKEND_URL: &str = "KEEPSAKE_BACKEND_URL";
pub const ENV_BACKEND_KEY: &str = "KEEPSAKE_BACKEND_KEY";

/// Settings for keepsake, stored in `<data dir>/config.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    /// Base URL of the backend project, e.g. `https://xyz.example.co`
    #[serde(default)]
    pub backend_url: Option<String>,

    /// Public (anon) key sent with every backend request
    #[serde(default)]
    pub backend_key: Option<String>,

    /// Storage bucket images are uploaded to
    #[serde(default = "default_bucket")]
    pub bucket: String,

    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,

    /// Byte budget for locally cached values; `null` means unlimited
    #[serde(default = "default_cache_quota")]
    pub cache_quota_bytes: Option<usize>,
}

fn default_bucket() -> String {
    DEFAULT_BUCKET.to_string()
}

fn default_max_image_bytes() -> usize {
    DEFAULT_MAX_IMAGE_BYTES
}

fn default_cache_quota() -> Option<usize> {
    Some(DEFAULT_CACHE_QUOTA)
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: None,
            backend_key: None,
            bucket: default_bucket(),
            max_image_bytes: default_max_image_bytes(),
            cache_quota_bytes: default_cache_quota(),
        }
    }
}

/// Everything needed to talk to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub url: Url,
    pub key: String,
    pub bucket: String,
}

impl Settings {
    /// Load settings from the given directory, or return defaults if not found
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILENAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(KeepsakeError::Io)?;
        let settings: Settings =
            serde_json::from_str(&content).map_err(KeepsakeError::Serialization)?;
        Ok(settings)
    }

    /// Save settings to the given directory
    pub fn save<P: AsRef<Path>>(&self, config_dir: P) -> Result<()> {
        let config_dir = config_dir.as_ref();

        if !config_dir.exists() {
            fs::create_dir_all(config_dir).map_err(KeepsakeError::Io)?;
        }

        let config_path = config_dir.join(CONFIG_FILENAME);
        let content = serde_json::to_string_pretty(self).map_err(KeepsakeError::Serialization)?;
        fs::write(config_path, content).map_err(KeepsakeError::Io)?;
        Ok(())
    }

    /// Apply backend values from the environment. Empty variables are ignored.
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(url) = non_empty(ENV_BACKEND_URL) {
            self.backend_url = Some(url);
        }
        if let Some(key) = non_empty(ENV_BACKEND_KEY) {
            self.backend_key = Some(key);
        }
        self
    }

    /// Names of the backend values that are not set.
    pub fn missing_backend_vars(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.backend_url.as_deref().map_or(true, |v| v.trim().is_empty()) {
            missing.push(ENV_BACKEND_URL.to_string());
        }
        if self.backend_key.as_deref().map_or(true, |v| v.trim().is_empty()) {
            missing.push(ENV_BACKEND_KEY.to_string());
        }
        missing
    }

    /// The backend to use, or a `Configuration` error naming what is missing.
    pub fn backend(&self) -> Result<BackendConfig> {
        let missing = self.missing_backend_vars();
        match (&self.backend_url, &self.backend_key) {
            (Some(url), Some(key)) if missing.is_empty() => Ok(BackendConfig {
                url: base_url(url)?,
                key: key.trim().to_string(),
                bucket: self.bucket.clone(),
            }),
            _ => Err(KeepsakeError::Configuration(format!(
                "set {}",
                missing.join(" and ")
            ))),
        }
    }
}

/// Parse the backend URL as a directory, so relative joins keep any path prefix.
fn base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw.trim())?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Where keepsake keeps its settings and local values.
///
/// `KEEPSAKE_HOME` wins; otherwise the platform data directory.
pub fn data_dir() -> Result<PathBuf> {
    if let Some(home) = std::env::var_os(ENV_HOME).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(home));
    }
    ProjectDirs::from("com", "keepsake", "keepsake")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| {
            KeepsakeError::Configuration(format!(
                "could not determine a data directory; set {}",
                ENV_HOME
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.bucket, "memories");
        assert_eq!(settings.max_image_bytes, 2_500_000);
        assert!(settings.backend_url.is_none());
    }

    #[test]
    fn test_load_missing_settings() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load(dir.path().join("nowhere")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let settings = Settings {
            bucket: "photos".to_string(),
            ..Settings::default()
        };
        settings.save(dir.path()).unwrap();

        let loaded = Settings::load(dir.path()).unwrap();
        assert_eq!(loaded.bucket, "photos");
    }

    #[test]
    fn test_partial_file_uses_field_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), r#"{"bucket":"b"}"#).unwrap();
        let loaded = Settings::load(dir.path()).unwrap();
        assert_eq!(loaded.bucket, "b");
        assert_eq!(loaded.max_image_bytes, DEFAULT_MAX_IMAGE_BYTES);
    }

    #[test]
    fn test_env_overrides_file() {
        let settings = Settings {
            backend_url: Some("https://old.example.co".to_string()),
            ..Settings::default()
        }
        .with_env(env(&[
            (ENV_BACKEND_URL, "https://new.example.co"),
            (ENV_BACKEND_KEY, "anon"),
        ]));

        let backend = settings.backend().unwrap();
        assert_eq!(backend.url.as_str(), "https://new.example.co/");
        assert_eq!(backend.key, "anon");
        assert_eq!(backend.bucket, "memories");
    }

    #[test]
    fn test_backend_path_prefix_survives_joins() {
        let settings = Settings::default().with_env(env(&[
            (ENV_BACKEND_URL, "https://host.example.co/supabase"),
            (ENV_BACKEND_KEY, "anon"),
        ]));

        let backend = settings.backend().unwrap();
        assert_eq!(backend.url.as_str(), "https://host.example.co/supabase/");
        assert_eq!(
            backend.url.join("rest/v1/records").unwrap().as_str(),
            "https://host.example.co/supabase/rest/v1/records"
        );
    }

    #[test]
    fn test_missing_backend_names_variables() {
        let settings = Settings::default().with_env(env(&[(ENV_BACKEND_KEY, "  ")]));
        let err = settings.backend().unwrap_err().to_string();
        assert!(err.contains(ENV_BACKEND_URL));
        assert!(err.contains(ENV_BACKEND_KEY));
    }

    #[test]
    fn test_bad_url_is_configuration_error() {
        let settings =
            Settings::default().with_env(env(&[(ENV_BACKEND_URL, "not a url"), (ENV_BACKEND_KEY, "k")]));
        assert!(matches!(
            settings.backend(),
            Err(KeepsakeError::Configuration(_))
        ));
    }
}
