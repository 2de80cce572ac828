use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::controller::{DEFAULT_COLUMNS, DEFAULT_PAGE_SIZE};
use crate::giphy::{GIPHY_API_BASE, GIPHY_UPLOAD_URL, PUBLIC_BETA_KEY};
use crate::layout::{Placement, BASE_COLUMN_WIDTH, GAP};
use crate::scroll::DEFAULT_THRESHOLD;

const DEFAULT_ENV_PREFIX: &str = "GIFGRID";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub giphy: GiphyConfig,
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GiphyConfig {
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_upload_url")]
    pub upload_url: String,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    #[serde(default)]
    pub rating: Option<String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for GiphyConfig {
    fn default() -> Self {
        Self {
            api_key: default_api_key(),
            base_url: default_base_url(),
            upload_url: default_upload_url(),
            timeout: default_timeout(),
            rating: None,
            user_agent: default_user_agent(),
        }
    }
}

fn default_api_key() -> String {
    PUBLIC_BETA_KEY.to_string()
}

fn default_base_url() -> String {
    GIPHY_API_BASE.to_string()
}

fn default_upload_url() -> String {
    GIPHY_UPLOAD_URL.to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(20)
}

fn default_user_agent() -> String {
    format!("gifgrid/{}", crate::VERSION)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GridConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_columns")]
    pub columns: usize,
    #[serde(default = "default_column_width")]
    pub column_width: f64,
    #[serde(default = "default_gap")]
    pub gap: f64,
    #[serde(default = "default_scroll_threshold")]
    pub scroll_threshold: f64,
    #[serde(default)]
    pub placement: Placement,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            columns: default_columns(),
            column_width: default_column_width(),
            gap: default_gap(),
            scroll_threshold: default_scroll_threshold(),
            placement: Placement::default(),
        }
    }
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_columns() -> usize {
    DEFAULT_COLUMNS
}

fn default_column_width() -> f64 {
    BASE_COLUMN_WIDTH
}

fn default_gap() -> f64 {
    GAP
}

fn default_scroll_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        cfg = merge_config(cfg, read_config_file(path)?);
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            let from_file = read_config_file(&default_path)?;
            cfg = merge_config(cfg, from_file);
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    cfg = merge_config(cfg, load_env(prefix, env::vars()));

    Ok(sanitize(cfg))
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("config: failed to read {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("config: failed to parse {}", path.display()))?;
    Ok(config)
}

fn merge_config(mut base: Config, other: Config) -> Config {
    let defaults = Config::default();

    if !other.giphy.api_key.is_empty() && other.giphy.api_key != defaults.giphy.api_key {
        base.giphy.api_key = other.giphy.api_key;
    }
    if !other.giphy.base_url.is_empty() && other.giphy.base_url != defaults.giphy.base_url {
        base.giphy.base_url = other.giphy.base_url;
    }
    if !other.giphy.upload_url.is_empty() && other.giphy.upload_url != defaults.giphy.upload_url
    {
        base.giphy.upload_url = other.giphy.upload_url;
    }
    if other.giphy.timeout != defaults.giphy.timeout {
        base.giphy.timeout = other.giphy.timeout;
    }
    if other.giphy.rating.is_some() {
        base.giphy.rating = other.giphy.rating;
    }
    if !other.giphy.user_agent.is_empty() && other.giphy.user_agent != defaults.giphy.user_agent {
        base.giphy.user_agent = other.giphy.user_agent;
    }

    if other.grid.page_size != defaults.grid.page_size {
        base.grid.page_size = other.grid.page_size;
    }
    if other.grid.columns != defaults.grid.columns {
        base.grid.columns = other.grid.columns;
    }
    if other.grid.column_width != defaults.grid.column_width {
        base.grid.column_width = other.grid.column_width;
    }
    if other.grid.gap != defaults.grid.gap {
        base.grid.gap = other.grid.gap;
    }
    if other.grid.scroll_threshold != defaults.grid.scroll_threshold {
        base.grid.scroll_threshold = other.grid.scroll_threshold;
    }
    if other.grid.placement != defaults.grid.placement {
        base.grid.placement = other.grid.placement;
    }

    if other.storage.path.is_some() {
        base.storage.path = other.storage.path;
    }

    if !other.log.level.is_empty() && other.log.level != defaults.log.level {
        base.log.level = other.log.level;
    }
    if other.log.file.is_some() {
        base.log.file = other.log.file;
    }

    base
}

fn sanitize(mut cfg: Config) -> Config {
    if cfg.grid.page_size == 0 {
        cfg.grid.page_size = DEFAULT_PAGE_SIZE;
    }
    if cfg.grid.columns == 0 {
        cfg.grid.columns = DEFAULT_COLUMNS;
    }
    if !(cfg.grid.column_width.is_finite() && cfg.grid.column_width > 0.0) {
        cfg.grid.column_width = BASE_COLUMN_WIDTH;
    }
    if !(cfg.grid.gap.is_finite() && cfg.grid.gap >= 0.0) {
        cfg.grid.gap = GAP;
    }
    if !(cfg.grid.scroll_threshold.is_finite() && cfg.grid.scroll_threshold >= 0.0) {
        cfg.grid.scroll_threshold = DEFAULT_THRESHOLD;
    }
    cfg
}

fn load_env(prefix: &str, vars: impl Iterator<Item = (String, String)>) -> Config {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in vars {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }

    let mut cfg = Config::default();
    for (key, value) in map {
        apply_env_value(&mut cfg, &key, value);
    }
    cfg
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "giphy.api_key" => cfg.giphy.api_key = value,
        "giphy.base_url" => cfg.giphy.base_url = value,
        "giphy.upload_url" => cfg.giphy.upload_url = value,
        "giphy.user_agent" => cfg.giphy.user_agent = value,
        "giphy.rating" => cfg.giphy.rating = Some(value),
        "giphy.timeout" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.giphy.timeout = duration;
            }
        }
        "grid.page_size" => {
            if let Ok(parsed) = value.parse::<usize>() {
                cfg.grid.page_size = parsed;
            }
        }
        "grid.columns" => {
            if let Ok(parsed) = value.parse::<usize>() {
                cfg.grid.columns = parsed;
            }
        }
        "grid.column_width" => {
            if let Ok(parsed) = value.parse::<f64>() {
                cfg.grid.column_width = parsed;
            }
        }
        "grid.gap" => {
            if let Ok(parsed) = value.parse::<f64>() {
                cfg.grid.gap = parsed;
            }
        }
        "grid.scroll_threshold" => {
            if let Ok(parsed) = value.parse::<f64>() {
                cfg.grid.scroll_threshold = parsed;
            }
        }
        "grid.placement" => {
            if let Some(placement) = Placement::from_key(&value) {
                cfg.grid.placement = placement;
            }
        }
        "storage.path" => cfg.storage.path = Some(PathBuf::from(value)),
        "log.level" => cfg.log.level = value,
        "log.file" => cfg.log.file = Some(PathBuf::from(value)),
        _ => {}
    }
}

pub fn default_path() -> Option<PathBuf> {
    default_config_path()
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("gifgrid").join("config.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn isolated() -> LoadOptions {
        LoadOptions {
            config_file: None,
            env_prefix: Some("GIFGRID_TEST_NONE".into()),
        }
    }

    #[test]
    fn load_defaults_without_files() {
        let cfg = load(isolated()).unwrap();
        assert_eq!(cfg.grid.page_size, 25);
        assert_eq!(cfg.grid.columns, 4);
        assert_eq!(cfg.grid.placement, Placement::ShortestColumn);
        assert_eq!(cfg.giphy.base_url, GIPHY_API_BASE);
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "giphy:\n  api_key: mykey\n  timeout: 5s\ngrid:\n  columns: 3\n  placement: round_robin\n",
        )
        .unwrap();
        let cfg = load(LoadOptions {
            config_file: Some(path),
            env_prefix: Some("GIFGRID_TEST_NONE".into()),
        })
        .unwrap();
        assert_eq!(cfg.giphy.api_key, "mykey");
        assert_eq!(cfg.giphy.timeout, Duration::from_secs(5));
        assert_eq!(cfg.grid.columns, 3);
        assert_eq!(cfg.grid.page_size, 25);
        assert_eq!(cfg.grid.placement, Placement::RoundRobin);
    }

    #[test]
    fn zero_values_are_coerced() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "grid:\n  columns: 0\n  page_size: 0\n").unwrap();
        let cfg = load(LoadOptions {
            config_file: Some(path),
            env_prefix: Some("GIFGRID_TEST_NONE".into()),
        })
        .unwrap();
        assert_eq!(cfg.grid.columns, DEFAULT_COLUMNS);
        assert_eq!(cfg.grid.page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn env_overrides() {
        let vars = vec![
            ("GIFGRID_GRID__PAGE_SIZE".to_string(), "10".to_string()),
            ("GIFGRID_GRID__COLUMNS".to_string(), "not-a-number".to_string()),
            ("GIFGRID_GRID__PLACEMENT".to_string(), "round_robin".to_string()),
            ("GIFGRID_GIPHY__TIMEOUT".to_string(), "5s".to_string()),
            ("OTHER_GRID__GAP".to_string(), "99".to_string()),
        ];
        let cfg = merge_config(Config::default(), load_env("gifgrid", vars.into_iter()));
        assert_eq!(cfg.grid.page_size, 10);
        assert_eq!(cfg.grid.columns, DEFAULT_COLUMNS);
        assert_eq!(cfg.grid.placement, Placement::RoundRobin);
        assert_eq!(cfg.giphy.timeout, Duration::from_secs(5));
        assert_eq!(cfg.grid.gap, GridConfig::default().gap);
    }
}
