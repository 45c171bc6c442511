// src/config/mod.rs
//! Key-value parameter store and the sink settings read from it.

pub mod update;

use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::RwLock;
use tracing::warn;

// --- parameter names ---
pub const PARAM_DISCORD_ENABLED: &str = "discord_enabled";
pub const PARAM_DISCORD_WEBHOOK_URL: &str = "discord_webhook_url";
pub const PARAM_RSS_ENABLED: &str = "rss_enabled";
pub const PARAM_RSS_PORT: &str = "rss_port";
pub const PARAM_RSS_MAX_ITEMS: &str = "rss_max_items";

// --- defaults ---
pub const DEFAULT_RSS_PORT: u16 = 18473;
pub const DEFAULT_RSS_MAX_ITEMS: usize = 100;

// --- env names ---
pub const ENV_PARAMS_PATH: &str = "FANOUT_PARAMS_PATH";
pub const DEFAULT_PARAMS_PATH: &str = "config/parameters.json";

/// Upstream configuration store. Reads are cheap and happen per event.
pub trait ParameterStore: Send + Sync {
    fn get_parameter(&self, name: &str) -> Option<String>;
    fn set_parameter(&self, name: &str, value: &str) -> Result<()>;
}

/// In-process store, mostly for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryParameterStore {
    inner: RwLock<HashMap<String, String>>,
}

impl MemoryParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            inner: RwLock::new(map),
        }
    }
}

impl ParameterStore for MemoryParameterStore {
    fn get_parameter(&self, name: &str) -> Option<String> {
        let g = self.inner.read().unwrap_or_else(|p| p.into_inner());
        g.get(name).cloned()
    }

    fn set_parameter(&self, name: &str, value: &str) -> Result<()> {
        let mut g = self.inner.write().unwrap_or_else(|p| p.into_inner());
        g.insert(name.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON-object file (`{"rss_port": "18473", ...}`) kept in memory and
/// written back on every `set_parameter`.
#[derive(Debug)]
pub struct FileParameterStore {
    path: PathBuf,
    inner: RwLock<BTreeMap<String, String>>,
}

impl FileParameterStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let map = if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("reading parameters from {}", path.display()))?;
            parse_parameter_json(&raw)
                .with_context(|| format!("parsing parameters in {}", path.display()))?
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path,
            inner: RwLock::new(map),
        })
    }

    /// `$FANOUT_PARAMS_PATH`, falling back to `config/parameters.json`.
    pub fn open_default() -> Result<Self> {
        let p = std::env::var(ENV_PARAMS_PATH).unwrap_or_else(|_| DEFAULT_PARAMS_PATH.to_string());
        Self::open(p)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, map: &BTreeMap<String, String>) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }
        let body = serde_json::to_string_pretty(map).context("serializing parameters")?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body).with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }
}

impl ParameterStore for FileParameterStore {
    fn get_parameter(&self, name: &str) -> Option<String> {
        let g = self.inner.read().unwrap_or_else(|p| p.into_inner());
        g.get(name).cloned()
    }

    fn set_parameter(&self, name: &str, value: &str) -> Result<()> {
        let mut g = self.inner.write().unwrap_or_else(|p| p.into_inner());
        g.insert(name.to_string(), value.to_string());
        self.persist(&g)
    }
}

// Non-string scalars are accepted and stored in their JSON text form.
fn parse_parameter_json(raw: &str) -> Result<BTreeMap<String, String>> {
    let v: serde_json::Map<String, serde_json::Value> = serde_json::from_str(raw)?;
    Ok(v.into_iter()
        .map(|(k, v)| {
            let s = match v {
                serde_json::Value::String(s) => s,
                serde_json::Value::Null => String::new(),
                other => other.to_string(),
            };
            (k, s)
        })
        .collect())
}

/// Numeric parameter with a default. Absent or blank → default; anything that
/// does not parse, or fails `valid`, → default with a warning.
pub fn numeric_param<T>(store: &dyn ParameterStore, name: &str, default: T, valid: fn(&T) -> bool) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    let Some(raw) = store.get_parameter(name) else {
        return default;
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return default;
    }
    match trimmed.parse::<T>() {
        Ok(v) if valid(&v) => v,
        _ => {
            warn!(param = name, value = %raw, default = %default, "invalid numeric parameter, using default");
            default
        }
    }
}

/// `true`, `1`, `yes`, `on` (any case) are on; everything else, or absent, is off.
pub fn flag_param(store: &dyn ParameterStore, name: &str) -> bool {
    store
        .get_parameter(name)
        .map(|v| {
            matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "true" | "1" | "yes" | "on"
            )
        })
        .unwrap_or(false)
}

/// Webhook URL, `None` when unset or blank.
pub fn webhook_url(store: &dyn ParameterStore) -> Option<String> {
    store
        .get_parameter(PARAM_DISCORD_WEBHOOK_URL)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn rss_port(store: &dyn ParameterStore) -> u16 {
    numeric_param(store, PARAM_RSS_PORT, DEFAULT_RSS_PORT, |p| *p != 0)
}

pub fn rss_max_items(store: &dyn ParameterStore) -> usize {
    numeric_param(store, PARAM_RSS_MAX_ITEMS, DEFAULT_RSS_MAX_ITEMS, |n| *n > 0)
}

/// Snapshot of everything the process wiring needs at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkSettings {
    pub discord_enabled: bool,
    pub rss_enabled: bool,
    pub rss_port: u16,
    pub rss_max_items: usize,
}

impl SinkSettings {
    pub fn from_store(store: &dyn ParameterStore) -> Self {
        Self {
            discord_enabled: flag_param(store, PARAM_DISCORD_ENABLED),
            rss_enabled: flag_param(store, PARAM_RSS_ENABLED),
            rss_port: rss_port(store),
            rss_max_items: rss_max_items(store),
        }
    }
}
