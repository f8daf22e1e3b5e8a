use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::DistMatchError;

/// Tunables of the distribution-based matcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Ceiling of the adaptive cutoff used for distribution clusters.
    #[serde(default = "default_threshold")]
    pub threshold1: f64,
    /// Ceiling of the adaptive cutoff used for attribute clusters.
    #[serde(default = "default_threshold")]
    pub threshold2: f64,
    #[serde(default = "default_quantiles")]
    pub quantiles: usize,
    #[serde(default = "default_process_num")]
    pub process_num: usize,
}

fn default_threshold() -> f64 {
    0.15
}
fn default_quantiles() -> usize {
    256
}
fn default_process_num() -> usize {
    1
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            threshold1: default_threshold(),
            threshold2: default_threshold(),
            quantiles: default_quantiles(),
            process_num: default_process_num(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>, // falls back to the system temp dir when None
    #[serde(default = "default_memo_capacity")]
    pub memo_capacity: usize,
    #[serde(default = "default_sort_run_capacity")]
    pub sort_run_capacity: usize,
}

fn default_memo_capacity() -> usize {
    32
}
fn default_sort_run_capacity() -> usize {
    100_000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: None,
            memo_capacity: default_memo_capacity(),
            sort_run_capacity: default_sort_run_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub matcher: MatcherConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl Config {
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("distmatch")
            .join("config.toml")
    }

    pub fn load() -> crate::Result<Self> {
        let path = if let Ok(env_path) = std::env::var("DISTMATCH_CONFIG") {
            PathBuf::from(env_path) // $DISTMATCH_CONFIG overrides default config path
        } else {
            Self::config_path()
        };
        Self::load_from(&path)
    }

    pub fn load_from(path: &std::path::Path) -> crate::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let cfg: Self = toml::from_str(&content).map_err(|e| DistMatchError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn save(&self) -> crate::Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &std::path::Path) -> crate::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| DistMatchError::Other(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> crate::Result<()> {
        let m = &self.matcher;
        for (name, t) in [("threshold1", m.threshold1), ("threshold2", m.threshold2)] {
            if t.is_nan() || t < 0.0 {
                return Err(DistMatchError::Config(format!("{name} must be >= 0, got {t}")));
            }
        }
        if m.quantiles == 0 {
            return Err(DistMatchError::Config("quantiles must be at least 1".into()));
        }
        if m.process_num == 0 {
            return Err(DistMatchError::Config("process_num must be at least 1".into()));
        }
        if self.cache.memo_capacity == 0 || self.cache.sort_run_capacity == 0 {
            return Err(DistMatchError::Config(
                "cache capacities must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
