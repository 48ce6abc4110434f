use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Config file looked up in the working directory.
pub const CONFIG_FILE: &str = "crash_panda.json";
/// Overrides where the config file is read from.
pub const CONFIG_ENV: &str = "CRASH_PANDA_CONFIG";
/// Overrides the data origin.
pub const SOURCE_ENV: &str = "CRASH_PANDA_SOURCE";

// ---------------------------------------------------------------------------
// Data origin
// ---------------------------------------------------------------------------

/// Where the dataset is read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataOrigin {
    File(PathBuf),
    Url(String),
}

impl DataOrigin {
    /// `http(s)://…` is a URL, anything else a file path.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.starts_with("http://") || s.starts_with("https://") {
            DataOrigin::Url(s.to_string())
        } else {
            DataOrigin::File(PathBuf::from(s))
        }
    }
}

impl Default for DataOrigin {
    fn default() -> Self {
        DataOrigin::File(PathBuf::from("data/car_crashes.csv"))
    }
}

impl fmt::Display for DataOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataOrigin::File(p) => write!(f, "{}", p.display()),
            DataOrigin::Url(u) => write!(f, "{u}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Application config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub source: DataOrigin,
    /// Run recomputation on a worker thread instead of the UI thread.
    pub background_recompute: bool,
    /// Results memoized per derived value.
    pub memo_capacity: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source: DataOrigin::default(),
            background_recompute: true,
            memo_capacity: 8,
        }
    }
}

impl AppConfig {
    /// Layer the inputs over the defaults: file, then env source, then CLI
    /// argument.
    pub fn resolve(file: Option<AppConfig>, env_source: Option<&str>, arg: Option<&str>) -> Self {
        let mut config = file.unwrap_or_default();
        if let Some(src) = env_source.filter(|s| !s.trim().is_empty()) {
            config.source = DataOrigin::parse(src);
        }
        if let Some(src) = arg.filter(|s| !s.trim().is_empty()) {
            config.source = DataOrigin::parse(src);
        }
        config.memo_capacity = config.memo_capacity.max(1);
        config
    }

    /// Read a JSON config file. `Ok(None)` if there is no such file.
    pub fn read_file(path: &Path) -> Result<Option<AppConfig>> {
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config = serde_json::from_str(&text)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(Some(config))
    }

    /// Resolve from the process environment and arguments.
    pub fn from_env() -> Self {
        let path = std::env::var(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(CONFIG_FILE));
        let file = match AppConfig::read_file(&path) {
            Ok(file) => file,
            Err(e) => {
                log::warn!("Ignoring config file: {e:#}");
                None
            }
        };
        let env_source = std::env::var(SOURCE_ENV).ok();
        let arg = std::env::args().nth(1);
        let config = AppConfig::resolve(file, env_source.as_deref(), arg.as_deref());
        log::info!("Using data source {}", config.source);
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_parsing() {
        assert_eq!(
            DataOrigin::parse("https://example.org/car_crashes.csv"),
            DataOrigin::Url("https://example.org/car_crashes.csv".into())
        );
        assert_eq!(
            DataOrigin::parse(" ./crashes.csv "),
            DataOrigin::File(PathBuf::from("./crashes.csv"))
        );
    }

    #[test]
    fn later_layers_win() {
        let file = AppConfig {
            source: DataOrigin::parse("from_file.csv"),
            background_recompute: false,
            memo_capacity: 0,
        };
        let c = AppConfig::resolve(Some(file.clone()), None, None);
        assert_eq!(c.source, DataOrigin::parse("from_file.csv"));
        assert!(!c.background_recompute);
        assert_eq!(c.memo_capacity, 1);

        let c = AppConfig::resolve(Some(file.clone()), Some("env.csv"), None);
        assert_eq!(c.source, DataOrigin::parse("env.csv"));

        let c = AppConfig::resolve(Some(file), Some("env.csv"), Some("http://x/arg.csv"));
        assert_eq!(c.source, DataOrigin::Url("http://x/arg.csv".into()));

        let c = AppConfig::resolve(None, Some("  "), None);
        assert_eq!(c, AppConfig::default());
    }

    #[test]
    fn config_json_shape() {
        let c: AppConfig =
            serde_json::from_str(r#"{"source": {"url": "https://h/c.csv"}}"#).unwrap();
        assert_eq!(c.source, DataOrigin::Url("https://h/c.csv".into()));
        assert!(c.background_recompute);
        assert_eq!(c.memo_capacity, 8);
    }
}
