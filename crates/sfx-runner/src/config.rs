//! Runner configuration: TOML file plus command-line overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use sfx_pool::config::PoolConfig;

use crate::cli::Args;

const DEFAULT_TICK_MS: u64 = 16;
const DEFAULT_PREFS_FILE: &str = "sfx-prefs.toml";

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunnerConfig {
    pub pool: PoolConfig,
    pub tick_ms: u64,
    pub prefs_path: Option<PathBuf>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            pool: PoolConfig::default(),
            tick_ms: DEFAULT_TICK_MS,
            prefs_path: None,
        }
    }
}

impl RunnerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw =
            std::fs::read_to_string(path).with_context(|| format!("read config {:?}", path))?;
        let cfg = toml::from_str::<RunnerConfig>(&raw)
            .with_context(|| format!("parse config {:?}", path))?;
        Ok(cfg)
    }

    /// Load the explicit or auto-discovered config file, then apply flags.
    pub fn resolve(args: &Args) -> Result<Self> {
        let mut cfg = match args.config.as_ref() {
            Some(path) => Self::load(path)?,
            None => {
                let auto_path = std::env::current_exe()
                    .ok()
                    .and_then(|path| path.parent().map(|dir| dir.join("sfx.toml")));
                match auto_path {
                    Some(path) if path.exists() => Self::load(&path)?,
                    _ => Self::default(),
                }
            }
        };
        cfg.apply_overrides(args);
        Ok(cfg)
    }

    fn apply_overrides(&mut self, args: &Args) {
        if let Some(capacity) = args.capacity {
            self.pool.capacity = capacity;
        }
        if args.no_pooling {
            self.pool.pooling_enabled = false;
        }
        if let Some(policy) = args.on_exhausted {
            self.pool.on_exhausted = policy.into();
        }
        if let Some(tick_ms) = args.tick_ms {
            self.tick_ms = tick_ms;
        }
        if let Some(path) = args.prefs.as_ref() {
            self.prefs_path = Some(path.clone());
        }
    }

    /// Tick length, at least one millisecond.
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }

    pub fn prefs_path(&self) -> PathBuf {
        self.prefs_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PREFS_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use sfx_pool::config::ExhaustionPolicy;

    #[test]
    fn parses_nested_pool_table() {
        let cfg: RunnerConfig = toml::from_str(
            r#"
tick_ms = 10
prefs_path = "/tmp/p.toml"

[pool]
capacity = 3
on_exhausted = "unpooled"
"#,
        )
        .unwrap();
        assert_eq!(cfg.tick(), Duration::from_millis(10));
        assert_eq!(cfg.pool.capacity, 3);
        assert_eq!(cfg.pool.on_exhausted, ExhaustionPolicy::Unpooled);
        assert!(cfg.pool.pooling_enabled);
        assert_eq!(cfg.prefs_path(), PathBuf::from("/tmp/p.toml"));
    }

    #[test]
    fn empty_file_uses_defaults() {
        let cfg: RunnerConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, RunnerConfig::default());
        assert_eq!(cfg.prefs_path(), PathBuf::from(DEFAULT_PREFS_FILE));
    }

    #[test]
    fn flags_override_file_values() {
        let args = Args::parse_from([
            "sfx-runner",
            "--capacity",
            "7",
            "--no-pooling",
            "--tick-ms",
            "0",
            "--on-exhausted",
            "reject",
            "demo",
        ]);
        let mut cfg = RunnerConfig {
            pool: PoolConfig {
                on_exhausted: ExhaustionPolicy::StealOldest,
                ..PoolConfig::default()
            },
            ..RunnerConfig::default()
        };
        cfg.apply_overrides(&args);
        assert_eq!(cfg.pool.capacity, 7);
        assert!(!cfg.pool.pooling_enabled);
        assert_eq!(cfg.pool.on_exhausted, ExhaustionPolicy::Reject);
        assert_eq!(cfg.tick(), Duration::from_millis(1));
    }

    #[test]
    fn load_reports_path_on_error() {
        let err = RunnerConfig::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("read config"));
    }
}
