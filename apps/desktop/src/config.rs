use std::{fs, io, path::Path};

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read { path: String, source: io::Error },
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Owner signed in at startup; signed out when unset.
    pub owner_id: Option<String>,
    pub log_filter: String,
    pub latency_ms: u64,
    /// Todos inserted for the startup owner before the shell opens.
    pub seed: Vec<String>,
    pub json: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            owner_id: None,
            log_filter: "warn".into(),
            latency_ms: 0,
            seed: Vec::new(),
            json: false,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    owner_id: Option<String>,
    log_filter: Option<String>,
    latency_ms: Option<u64>,
    seed: Option<Vec<String>>,
    json: Option<bool>,
}

/// Defaults, overlaid by the config file (if present), then by `APP__*`
/// environment variables.
pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    let mut settings = Settings::default();

    match fs::read_to_string(path) {
        Ok(raw) => apply_file(&mut settings, &raw, path)?,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.display().to_string(),
                source,
            })
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok())?;
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str, path: &Path) -> Result<(), ConfigError> {
    let file: FileSettings = toml::from_str(raw).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;

    if let Some(v) = file.owner_id {
        settings.owner_id = non_empty(v);
    }
    if let Some(v) = file.log_filter {
        settings.log_filter = v;
    }
    if let Some(v) = file.latency_ms {
        settings.latency_ms = v;
    }
    if let Some(v) = file.seed {
        settings.seed = v;
    }
    if let Some(v) = file.json {
        settings.json = v;
    }
    Ok(())
}

fn apply_env(
    settings: &mut Settings,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    if let Some(v) = lookup("APP__OWNER_ID") {
        settings.owner_id = non_empty(v);
    }
    if let Some(v) = lookup("APP__LOG_FILTER") {
        settings.log_filter = v;
    }
    if let Some(v) = lookup("APP__LATENCY_MS") {
        settings.latency_ms = v.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: "APP__LATENCY_MS",
            value: v.clone(),
        })?;
    }
    if let Some(v) = lookup("APP__JSON") {
        settings.json = matches!(v.trim(), "1" | "true" | "yes");
    }
    Ok(())
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
