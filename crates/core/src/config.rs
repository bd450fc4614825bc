use std::env;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TraceError};

/// Tracing configuration surface: the master switch, where the embedded
/// store lives, and how long spans are kept.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraceConfig {
    pub enabled: bool,
    pub store_path: PathBuf,
    pub retention_days: i64,
}

impl Default for TraceConfig {
    fn default() -> Self {
        let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
        let data_root = env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(home).join(".local/share"));

        Self {
            enabled: true,
            store_path: data_root.join("engram/traces.duckdb"),
            retention_days: 365,
        }
    }
}

impl TraceConfig {
    /// Defaults, then config-file overrides, then environment overrides.
    pub fn load() -> Result<Self> {
        let mut cfg = Self::default();
        let config_path = config_file_path();
        if let Some(file_overrides) = load_file_overrides(&config_path)? {
            apply_overrides(&mut cfg, file_overrides);
        }
        apply_overrides(&mut cfg, load_env_overrides()?);
        Ok(cfg)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigOverrides {
    enabled: Option<bool>,
    store_path: Option<PathBuf>,
    retention_days: Option<i64>,
}

fn config_file_path() -> PathBuf {
    if let Ok(path) = env::var("ENGRAM_TRACES_CONFIG") {
        return PathBuf::from(path);
    }

    let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
    let config_home = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(home).join(".config"));
    config_home.join("engram/traces.toml")
}

fn load_file_overrides(path: &PathBuf) -> Result<Option<ConfigOverrides>> {
    if !path.exists() {
        return Ok(None);
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| TraceError::Config(format!("failed reading {}: {e}", path.display())))?;
    let parsed: ConfigOverrides = toml::from_str(&raw)
        .map_err(|e| TraceError::Config(format!("failed parsing {}: {e}", path.display())))?;
    Ok(Some(parsed))
}

fn load_env_overrides() -> Result<ConfigOverrides> {
    let enabled = match env::var("ENGRAM_TRACES_ENABLED") {
        Ok(v) => Some(parse_bool(&v).ok_or_else(|| {
            TraceError::Config(format!("bad ENGRAM_TRACES_ENABLED in environment: {v}"))
        })?),
        Err(_) => None,
    };

    let retention_days = match env::var("ENGRAM_TRACES_RETENTION_DAYS") {
        Ok(v) => Some(v.parse::<i64>().map_err(|e| {
            TraceError::Config(format!("bad ENGRAM_TRACES_RETENTION_DAYS in environment: {e}"))
        })?),
        Err(_) => None,
    };

    Ok(ConfigOverrides {
        enabled,
        store_path: env::var("ENGRAM_TRACES_DB_PATH").ok().map(PathBuf::from),
        retention_days,
    })
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn apply_overrides(cfg: &mut TraceConfig, overrides: ConfigOverrides) {
    if let Some(v) = overrides.enabled {
        cfg.enabled = v;
    }
    if let Some(v) = overrides.store_path {
        cfg.store_path = v;
    }
    if let Some(v) = overrides.retention_days {
        cfg.retention_days = v;
    }
}
