use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use querylens_core::explain::BatchOptions;
use querylens_core::stats::DEFAULT_REPEAT_THRESHOLD;
use querylens_core::AdvisorConfig;
use serde::{Deserialize, Serialize};

use crate::cli::{ExplainArgs, OutputFormat};

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct ProfileConfig {
    pub database_url: Option<String>,
    pub format: Option<String>,
    pub min_duration_ms: Option<f64>,
    pub timeout_ms: Option<u64>,
    pub concurrency: Option<usize>,
    pub repeat_threshold: Option<usize>,
    pub advisor: Option<AdvisorConfig>,
}

pub type ConfigFile = BTreeMap<String, ProfileConfig>;

pub const VALID_KEYS: &str = "database_url, format, min_duration_ms, timeout_ms, concurrency, \
     repeat_threshold, advisor.frequent_scan_count, advisor.expensive_avg_cost";

fn config_dir() -> Result<PathBuf> {
    let dir = dirs::home_dir()
        .context("Cannot determine home directory")?
        .join(".querylens");
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

pub fn load_all_from(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        return Ok(ConfigFile::new());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let cfg: ConfigFile = toml::from_str(&content)
        .with_context(|| format!("Invalid config file {}", path.display()))?;
    Ok(cfg)
}

pub fn load_profile_from(path: &Path, profile: &str) -> Result<ProfileConfig> {
    Ok(load_all_from(path)?.remove(profile).unwrap_or_default())
}

pub fn save_profile_to(path: &Path, profile: &str, config: &ProfileConfig) -> Result<()> {
    let mut all = load_all_from(path)?;
    all.insert(profile.to_string(), config.clone());
    let content = toml::to_string_pretty(&all)?;
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

pub fn load_profile(profile: &str) -> Result<ProfileConfig> {
    load_profile_from(&config_path()?, profile)
}

pub fn save_profile(profile: &str, config: &ProfileConfig) -> Result<()> {
    save_profile_to(&config_path()?, profile, config)
}

/// Applies `key = value` to a profile.
pub fn set_value(cfg: &mut ProfileConfig, key: &str, value: &str) -> Result<()> {
    match key {
        "database_url" => cfg.database_url = Some(value.to_string()),
        "format" => {
            OutputFormat::from_str(value, true)
                .map_err(|e| anyhow::anyhow!("Invalid format {value:?}: {e}"))?;
            cfg.format = Some(value.to_lowercase());
        }
        "min_duration_ms" => cfg.min_duration_ms = Some(parse(key, value)?),
        "timeout_ms" => cfg.timeout_ms = Some(parse(key, value)?),
        "concurrency" => cfg.concurrency = Some(parse(key, value)?),
        "repeat_threshold" => cfg.repeat_threshold = Some(parse(key, value)?),
        "advisor.frequent_scan_count" => {
            cfg.advisor.get_or_insert_with(AdvisorConfig::default).frequent_scan_count =
                parse(key, value)?;
        }
        "advisor.expensive_avg_cost" => {
            cfg.advisor.get_or_insert_with(AdvisorConfig::default).expensive_avg_cost =
                parse(key, value)?;
        }
        other => anyhow::bail!("Unknown config key: {other}. Valid keys: {VALID_KEYS}"),
    }
    Ok(())
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid value for {key}: {e}"))
}

impl ProfileConfig {
    pub fn output_format(&self) -> OutputFormat {
        self.format
            .as_deref()
            .and_then(|f| OutputFormat::from_str(f, true).ok())
            .unwrap_or_default()
    }

    pub fn advisor_config(&self) -> AdvisorConfig {
        self.advisor.clone().unwrap_or_default()
    }

    pub fn repeat_threshold(&self, flag: Option<usize>) -> usize {
        flag.or(self.repeat_threshold).unwrap_or(DEFAULT_REPEAT_THRESHOLD)
    }

    /// Flags override the profile, the profile overrides built-in defaults.
    pub fn batch_options(&self, args: &ExplainArgs) -> BatchOptions {
        let defaults = BatchOptions::default();
        BatchOptions {
            min_duration_ms: args
                .min_duration_ms
                .or(self.min_duration_ms)
                .unwrap_or(defaults.min_duration_ms),
            timeout_ms: args.timeout_ms.or(self.timeout_ms).unwrap_or(defaults.timeout_ms),
            concurrency: args
                .concurrency
                .or(self.concurrency)
                .unwrap_or(defaults.concurrency),
        }
    }

    pub fn resolve_database_url(&self, flag: &Option<String>) -> Result<String> {
        // 1. --database-url flag / QUERYLENS_DATABASE_URL env
        if let Some(url) = flag {
            return Ok(url.clone());
        }
        // 2. config.toml profile
        if let Some(url) = &self.database_url {
            return Ok(url.clone());
        }
        anyhow::bail!(
            "No database URL configured. Use --database-url, set QUERYLENS_DATABASE_URL, or run: querylens config set database_url <url>"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn explain_args() -> ExplainArgs {
        ExplainArgs {
            file: "-".into(),
            database_url: None,
            min_duration_ms: None,
            timeout_ms: Some(900),
            concurrency: None,
            plan_only: false,
            output: None,
        }
    }

    #[test]
    fn test_profile_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut cfg = ProfileConfig::default();
        set_value(&mut cfg, "database_url", "postgres://localhost/app").unwrap();
        set_value(&mut cfg, "format", "JSON").unwrap();
        set_value(&mut cfg, "advisor.frequent_scan_count", "3").unwrap();
        save_profile_to(&path, "staging", &cfg).unwrap();

        let loaded = load_profile_from(&path, "staging").unwrap();
        assert_eq!(loaded, cfg);
        assert_eq!(loaded.output_format(), OutputFormat::Json);
        assert_eq!(loaded.advisor_config().frequent_scan_count, 3);

        assert_eq!(load_profile_from(&path, "other").unwrap(), ProfileConfig::default());
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_all_from(&dir.path().join("nope.toml")).unwrap().is_empty());
    }

    #[test]
    fn test_set_value_rejects_bad_input() {
        let mut cfg = ProfileConfig::default();
        assert!(set_value(&mut cfg, "timeout_ms", "soon").is_err());
        assert!(set_value(&mut cfg, "format", "xml").is_err());
        assert!(set_value(&mut cfg, "colour", "blue").is_err());
    }

    #[test]
    fn test_batch_options_precedence() {
        let cfg = ProfileConfig {
            min_duration_ms: Some(25.0),
            timeout_ms: Some(100),
            ..Default::default()
        };
        let options = cfg.batch_options(&explain_args());
        assert_eq!(options.min_duration_ms, 25.0);
        assert_eq!(options.timeout_ms, 900);
        assert_eq!(options.concurrency, BatchOptions::default().concurrency);
    }

    #[test]
    fn test_resolve_database_url() {
        let cfg = ProfileConfig {
            database_url: Some("postgres://profile/db".into()),
            ..Default::default()
        };
        assert_eq!(
            cfg.resolve_database_url(&Some("postgres://flag/db".into())).unwrap(),
            "postgres://flag/db"
        );
        assert_eq!(cfg.resolve_database_url(&None).unwrap(), "postgres://profile/db");
        assert!(ProfileConfig::default().resolve_database_url(&None).is_err());
    }

    #[test]
    fn test_repeat_threshold() {
        let cfg = ProfileConfig {
            repeat_threshold: Some(8),
            ..Default::default()
        };
        assert_eq!(cfg.repeat_threshold(Some(2)), 2);
        assert_eq!(cfg.repeat_threshold(None), 8);
        assert_eq!(ProfileConfig::default().repeat_threshold(None), DEFAULT_REPEAT_THRESHOLD);
    }
}
