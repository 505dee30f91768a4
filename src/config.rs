use crate::extract::DEFAULT_STRIP_PREFIXES;
use crate::range::Range;
use crate::status::FreshnessPolicy;
use crate::threshold::{parse_assignment, MetricKey, ThresholdError, Thresholds};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_strip_prefixes")]
    pub strip_prefixes: Vec<String>,
    #[serde(default)]
    pub freshness: FreshnessConfig,
    #[serde(default)]
    pub thresholds: BTreeMap<MetricKey, ThresholdConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FreshnessConfig {
    #[serde(default = "default_warning_after")]
    pub warning_after: String,
    #[serde(default = "default_critical_after")]
    pub critical_after: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ThresholdConfig {
    #[serde(default)]
    pub warning: Option<String>,
    #[serde(default)]
    pub critical: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: None,
            token_env: default_token_env(),
            timeout_secs: default_timeout_secs(),
            strip_prefixes: default_strip_prefixes(),
            freshness: FreshnessConfig::default(),
            thresholds: BTreeMap::new(),
        }
    }
}

impl Default for FreshnessConfig {
    fn default() -> Self {
        Self {
            warning_after: default_warning_after(),
            critical_after: default_critical_after(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("не удалось прочитать файл конфигурации {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("не удалось разобрать YAML в {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("ошибка валидации конфигурации: {0}")]
    Validation(String),
    #[error("ошибка валидации конфигурации: {0}")]
    Threshold(#[from] ThresholdError),
}

impl Config {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let path_display = path_ref.display().to_string();
        let text = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_display.clone(),
            source,
        })?;

        let cfg: Config = serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path_display,
            source,
        })?;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(endpoint) = &self.endpoint {
            if endpoint.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "endpoint не должен быть пустым".to_string(),
                ));
            }
        }
        if self.token_env.trim().is_empty() {
            return Err(ConfigError::Validation(
                "token_env не должен быть пустым".to_string(),
            ));
        }
        if self.timeout_secs < 1 {
            return Err(ConfigError::Validation(
                "timeout_secs должно быть >= 1".to_string(),
            ));
        }
        if self.strip_prefixes.iter().any(|p| p.is_empty()) {
            return Err(ConfigError::Validation(
                "strip_prefixes не должен содержать пустых строк".to_string(),
            ));
        }

        self.freshness_policy()?;
        self.thresholds()?;
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn freshness_policy(&self) -> Result<FreshnessPolicy, ConfigError> {
        let warning_after =
            parse_duration("freshness.warning_after", &self.freshness.warning_after)?;
        let critical_after =
            parse_duration("freshness.critical_after", &self.freshness.critical_after)?;
        if warning_after >= critical_after {
            return Err(ConfigError::Validation(
                "freshness.warning_after должно быть меньше freshness.critical_after".to_string(),
            ));
        }
        Ok(FreshnessPolicy {
            warning_after,
            critical_after,
        })
    }

    pub fn thresholds(&self) -> Result<Thresholds, ConfigError> {
        let mut thresholds = Thresholds::default();
        for (key, cfg) in &self.thresholds {
            if let Some(raw) = &cfg.warning {
                thresholds.set_warning(*key, parse_range(*key, raw)?);
            }
            if let Some(raw) = &cfg.critical {
                thresholds.set_critical(*key, parse_range(*key, raw)?);
            }
        }
        Ok(thresholds)
    }

    /// Config file thresholds with `KEY=RANGE` command-line overrides on top.
    pub fn thresholds_with(
        &self,
        warnings: &[String],
        criticals: &[String],
    ) -> Result<Thresholds, ConfigError> {
        let mut thresholds = self.thresholds()?;
        for raw in warnings {
            let (key, range) = parse_assignment(raw)?;
            thresholds.set_warning(key, range);
        }
        for raw in criticals {
            let (key, range) = parse_assignment(raw)?;
            thresholds.set_critical(key, range);
        }
        Ok(thresholds)
    }

    pub fn example_yaml() -> &'static str {
        include_str!("../config.yaml.example")
    }
}

fn parse_range(key: MetricKey, raw: &str) -> Result<Range, ConfigError> {
    raw.parse().map_err(|source| {
        ConfigError::Threshold(ThresholdError::Range {
            key: key.to_string(),
            source,
        })
    })
}

fn parse_duration(field: &str, raw: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(raw.trim()).map_err(|err| {
        ConfigError::Validation(format!("{field}: некорректная длительность '{raw}': {err}"))
    })
}

fn default_token_env() -> String {
    "HEALTHCHECK_TOKEN".to_string()
}

const fn default_timeout_secs() -> u64 {
    10
}

fn default_strip_prefixes() -> Vec<String> {
    DEFAULT_STRIP_PREFIXES.iter().map(|p| p.to_string()).collect()
}

fn default_warning_after() -> String {
    "30h".to_string()
}

fn default_critical_after() -> String {
    "50h".to_string()
}
