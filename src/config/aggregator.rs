// src/config/aggregator.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_AGGREGATOR_CONFIG_PATH: &str = "AGGREGATOR_CONFIG_PATH";
pub const DEFAULT_TOML_PATH: &str = "config/aggregator.toml";
pub const DEFAULT_JSON_PATH: &str = "config/aggregator.json";

fn default_probe_timeout_ms() -> u64 {
    3_000
}
fn default_hot_timeout_ms() -> u64 {
    3_000
}
fn default_search_timeout_ms() -> u64 {
    6_000
}
fn default_detail_timeout_ms() -> u64 {
    6_000
}
fn default_connect_timeout_ms() -> u64 {
    2_000
}
/// Upper bound on hot-list length; larger configured values are clamped.
pub const HOT_LIMIT_MAX: usize = 12;

fn default_hot_limit() -> usize {
    HOT_LIMIT_MAX
}
fn default_hot_allow_list() -> Vec<String> {
    ["ffzy", "bfzy", "lzi", "dbzy"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_user_agent() -> String {
    "vod-aggregator/0.1".to_string()
}

/// Tunables for the fan-out engine. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatorConfig {
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    #[serde(default = "default_hot_timeout_ms")]
    pub hot_timeout_ms: u64,
    #[serde(default = "default_search_timeout_ms")]
    pub search_timeout_ms: u64,
    #[serde(default = "default_detail_timeout_ms")]
    pub detail_timeout_ms: u64,
    /// TCP connect budget for the shared HTTP client (the per-call deadline still wins).
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Provider keys eligible for the hot list, tried in registry order.
    #[serde(default = "default_hot_allow_list")]
    pub hot_allow_list: Vec<String>,
    /// Clamped to [`HOT_LIMIT_MAX`].
    #[serde(default = "default_hot_limit")]
    pub hot_limit: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: default_probe_timeout_ms(),
            hot_timeout_ms: default_hot_timeout_ms(),
            search_timeout_ms: default_search_timeout_ms(),
            detail_timeout_ms: default_detail_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            hot_allow_list: default_hot_allow_list(),
            hot_limit: default_hot_limit(),
            user_agent: default_user_agent(),
        }
    }
}

impl AggregatorConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
    pub fn hot_timeout(&self) -> Duration {
        Duration::from_millis(self.hot_timeout_ms)
    }
    pub fn search_timeout(&self) -> Duration {
        Duration::from_millis(self.search_timeout_ms)
    }
    pub fn detail_timeout(&self) -> Duration {
        Duration::from_millis(self.detail_timeout_ms)
    }
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Load from an explicit path. Supports TOML or JSON.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading aggregator config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg = parse_config(&content, ext.as_str())
            .with_context(|| format!("parsing aggregator config {}", path.display()))?;
        Ok(cfg.sanitized())
    }

    /// Load using env var + fallbacks:
    /// 1) $AGGREGATOR_CONFIG_PATH
    /// 2) config/aggregator.toml
    /// 3) config/aggregator.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_AGGREGATOR_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            } else {
                return Err(anyhow!(
                    "AGGREGATOR_CONFIG_PATH points to non-existent path"
                ));
            }
        }
        let toml_p = PathBuf::from(DEFAULT_TOML_PATH);
        if toml_p.exists() {
            return Self::load_from(&toml_p);
        }
        let json_p = PathBuf::from(DEFAULT_JSON_PATH);
        if json_p.exists() {
            return Self::load_from(&json_p);
        }
        Ok(Self::default())
    }

    /// Replace nonsensical values with defaults and clean the allow-list.
    pub fn sanitized(mut self) -> Self {
        let d = Self::default();
        if self.probe_timeout_ms == 0 {
            self.probe_timeout_ms = d.probe_timeout_ms;
        }
        if self.hot_timeout_ms == 0 {
            self.hot_timeout_ms = d.hot_timeout_ms;
        }
        if self.search_timeout_ms == 0 {
            self.search_timeout_ms = d.search_timeout_ms;
        }
        if self.detail_timeout_ms == 0 {
            self.detail_timeout_ms = d.detail_timeout_ms;
        }
        if self.connect_timeout_ms == 0 {
            self.connect_timeout_ms = d.connect_timeout_ms;
        }
        if self.hot_limit == 0 {
            self.hot_limit = d.hot_limit;
        }
        self.hot_limit = self.hot_limit.min(HOT_LIMIT_MAX);
        if self.user_agent.trim().is_empty() {
            self.user_agent = d.user_agent;
        }
        self.hot_allow_list = clean_keys(self.hot_allow_list);
        self
    }
}

fn parse_config(s: &str, hint_ext: &str) -> Result<AggregatorConfig> {
    if hint_ext == "json" {
        return Ok(serde_json::from_str(s)?);
    }
    match toml::from_str::<AggregatorConfig>(s) {
        Ok(cfg) => Ok(cfg),
        Err(toml_err) => serde_json::from_str(s)
            .map_err(|_| anyhow!("unsupported aggregator config format: {toml_err}")),
    }
}

// Order matters here (registry order is the fallback order), so no BTreeSet.
fn clean_keys(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim();
        if !t.is_empty() && !out.iter().any(|k| k == t) {
            out.push(t.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn defaults_match_documented_budgets() {
        let c = AggregatorConfig::default();
        assert_eq!(c.probe_timeout(), Duration::from_millis(3000));
        assert_eq!(c.hot_timeout(), Duration::from_millis(3000));
        assert_eq!(c.search_timeout(), Duration::from_millis(6000));
        assert_eq!(c.detail_timeout(), Duration::from_millis(6000));
        assert_eq!(c.hot_limit, 12);
        assert_eq!(c.hot_allow_list, vec!["ffzy", "bfzy", "lzi", "dbzy"]);
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let cfg = parse_config("search_timeout_ms = 1500\n", "toml").unwrap();
        assert_eq!(cfg.search_timeout_ms, 1500);
        assert_eq!(cfg.probe_timeout_ms, 3000);
        assert_eq!(cfg.hot_limit, 12);
    }

    #[test]
    fn json_without_hint_still_parses() {
        let cfg = parse_config(r#"{"hot_limit": 5}"#, "").unwrap();
        assert_eq!(cfg.hot_limit, 5);
    }

    #[test]
    fn sanitize_fixes_zeroes_and_cleans_allow_list() {
        let cfg = AggregatorConfig {
            probe_timeout_ms: 0,
            hot_limit: 0,
            hot_allow_list: vec![" lzi ".into(), "".into(), "ffzy".into(), "lzi".into()],
            ..Default::default()
        }
        .sanitized();
        assert_eq!(cfg.probe_timeout_ms, 3000);
        assert_eq!(cfg.hot_limit, 12);
        assert_eq!(cfg.hot_allow_list, vec!["lzi".to_string(), "ffzy".to_string()]);
    }

    #[test]
    fn oversized_hot_limit_is_clamped() {
        let cfg = parse_config("hot_limit = 20\n", "toml").unwrap().sanitized();
        assert_eq!(cfg.hot_limit, HOT_LIMIT_MAX);
        let small = AggregatorConfig {
            hot_limit: 5,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(small.hot_limit, 5);
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();

        env::remove_var(ENV_AGGREGATOR_CONFIG_PATH);

        // Nothing on disk → defaults
        let c = AggregatorConfig::load_default().unwrap();
        assert_eq!(c, AggregatorConfig::default());

        // Env wins
        let p = tmp.path().join("agg.json");
        fs::write(&p, r#"{"hot_limit": 3}"#).unwrap();
        env::set_var(ENV_AGGREGATOR_CONFIG_PATH, p.display().to_string());
        let c2 = AggregatorConfig::load_default().unwrap();
        assert_eq!(c2.hot_limit, 3);

        // Env pointing nowhere is an error, not a silent default
        env::set_var(ENV_AGGREGATOR_CONFIG_PATH, tmp.path().join("nope.toml"));
        assert!(AggregatorConfig::load_default().is_err());
        env::remove_var(ENV_AGGREGATOR_CONFIG_PATH);

        env::set_current_dir(&old).unwrap();
    }
}
