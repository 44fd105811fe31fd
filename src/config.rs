use crate::error::ConfigError;
use std::path::PathBuf;
use std::time::Duration;

pub const APP_NAME: &str = "arqia";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2500;
pub const DEFAULT_POLL_MAX_ATTEMPTS: u32 = 40;
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "arqia=info,arqia_lib=info,warn"
}

/// `<config dir>/arqia`, where installed users keep their `.env`.
pub fn app_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Load `.env` from the working directory, then from the app config dir.
/// Variables already set win over both.
pub fn load_env() {
    let _ = dotenvy::dotenv();
    if let Some(dir) = app_config_dir() {
        let env_path = dir.join(".env");
        if env_path.exists() {
            let _ = dotenvy::from_path(&env_path);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Without trailing slashes.
    pub api_base_url: String,
    pub http_timeout: Duration,
    pub poll_interval: Duration,
    pub poll_max_attempts: u32,
    pub debounce: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        load_env();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source (the process environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base = lookup("ARQIA_API_BASE_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing("ARQIA_API_BASE_URL"))?;

        Ok(Self {
            api_base_url: normalize_base_url(&base),
            http_timeout: Duration::from_secs(number(
                &lookup,
                "ARQIA_HTTP_TIMEOUT_SECS",
                DEFAULT_HTTP_TIMEOUT_SECS,
            )?),
            poll_interval: Duration::from_millis(number(
                &lookup,
                "ARQIA_POLL_INTERVAL_MS",
                DEFAULT_POLL_INTERVAL_MS,
            )?),
            poll_max_attempts: number(&lookup, "ARQIA_POLL_MAX_ATTEMPTS", DEFAULT_POLL_MAX_ATTEMPTS)?,
            debounce: Duration::from_millis(number(&lookup, "ARQIA_DEBOUNCE_MS", DEFAULT_DEBOUNCE_MS)?),
        })
    }
}

pub fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

fn number<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name).map(|v| v.trim().to_string()) {
        None => Ok(default),
        Some(v) if v.is_empty() => Ok(default),
        Some(v) => v
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: v }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply() {
        let config = Config::from_lookup(lookup(&[("ARQIA_API_BASE_URL", "https://arqia.onrender.com//")])).unwrap();
        assert_eq!(config.api_base_url, "https://arqia.onrender.com");
        assert_eq!(config.poll_interval, Duration::from_millis(2500));
        assert_eq!(config.poll_max_attempts, 40);
        assert_eq!(config.debounce, Duration::from_millis(300));
        assert_eq!(config.http_timeout, Duration::from_secs(60));
    }

    #[test]
    fn overrides_and_invalid_values() {
        let config = Config::from_lookup(lookup(&[
            ("ARQIA_API_BASE_URL", "http://localhost:8000"),
            ("ARQIA_POLL_INTERVAL_MS", "500"),
            ("ARQIA_POLL_MAX_ATTEMPTS", ""),
        ]))
        .unwrap();
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.poll_max_attempts, 40);

        let err = Config::from_lookup(lookup(&[
            ("ARQIA_API_BASE_URL", "http://localhost:8000"),
            ("ARQIA_DEBOUNCE_MS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "ARQIA_DEBOUNCE_MS", .. }));
    }

    #[test]
    fn base_url_is_required() {
        let err = Config::from_lookup(lookup(&[("ARQIA_API_BASE_URL", "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("ARQIA_API_BASE_URL")));
    }

    #[test]
    fn config_dir_is_named_after_app() {
        if let Some(dir) = app_config_dir() {
            assert!(dir.ends_with(APP_NAME));
        }
    }
}
