// src/config/update.rs
//! Bulk update of the parameter store from a TOML file.
//!
//! Keys are the ones editable from the web UI. Values are validated by kind and
//! stored in the string form the rest of the system reads back.

use anyhow::{anyhow, bail, Context, Result};
use std::fs;
use std::path::Path;
use toml::{Table, Value};
use tracing::{error, info};

use super::ParameterStore;

pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

pub const VALID_KEYS: &[&str] = &[
    // Telegram
    "telegram_enabled",
    "telegram_token",
    "telegram_chat_id",
    // RSS
    "rss_enabled",
    "rss_port",
    "rss_max_items",
    // Discord
    "discord_enabled",
    "discord_webhook_url",
    // System
    "items_per_query",
    "query_refresh_delay",
    "query_delay",
    "banwords",
    // Proxy
    "check_proxies",
    "proxy_list",
    "proxy_list_link",
    // Advanced
    "message_template",
    "user_agents",
    "default_headers",
];

const BOOLEAN_KEYS: &[&str] = &["telegram_enabled", "rss_enabled", "discord_enabled", "check_proxies"];

const NUMERIC_KEYS: &[&str] = &[
    "rss_port",
    "rss_max_items",
    "items_per_query",
    "query_refresh_delay",
    "query_delay",
];

const JSON_KEYS: &[&str] = &["user_agents", "default_headers"];

const PROXY_KEYS: &[&str] = &["check_proxies", "proxy_list", "proxy_list_link"];

/// Set whenever proxy settings change so the next run re-checks proxies.
pub const PROXY_CHECK_TIME_KEY: &str = "last_proxy_check_time";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReport {
    pub updated: usize,
    pub skipped: usize,
    pub proxy_cache_reset: bool,
}

/// Reject unknown keys and values of the wrong kind. Returns the first problem found.
pub fn validate_config(cfg: &Table) -> Result<()> {
    let mut invalid: Vec<&str> = cfg
        .keys()
        .map(String::as_str)
        .filter(|k| !VALID_KEYS.contains(k))
        .collect();
    if !invalid.is_empty() {
        invalid.sort_unstable();
        bail!("Invalid configuration keys: {}", invalid.join(", "));
    }

    for key in BOOLEAN_KEYS {
        if let Some(v) = cfg.get(*key) {
            if !v.is_bool() {
                bail!("{key} must be a boolean (true/false), got {}", v.type_str());
            }
        }
    }

    for key in NUMERIC_KEYS {
        if let Some(v) = cfg.get(*key) {
            let ok = match v {
                Value::Integer(_) | Value::Float(_) => true,
                Value::String(s) => s.trim().parse::<i64>().is_ok(),
                _ => false,
            };
            if !ok {
                bail!("{key} must be a number, got {}", v.type_str());
            }
        }
    }

    for key in JSON_KEYS {
        if let Some(v) = cfg.get(*key) {
            match v {
                Value::String(s) => {
                    serde_json::from_str::<serde_json::Value>(s)
                        .map_err(|e| anyhow!("{key} must be valid JSON: {e}"))?;
                }
                Value::Array(_) | Value::Table(_) => {}
                other => bail!("{key} must be a JSON string, array, or table, got {}", other.type_str()),
            }
        }
    }

    Ok(())
}

/// Stored string form of a TOML value: booleans as `True`/`False`,
/// arrays and tables as JSON, everything else as plain text.
pub fn convert_value(v: &Value) -> Result<String> {
    Ok(match v {
        Value::Boolean(true) => "True".to_string(),
        Value::Boolean(false) => "False".to_string(),
        Value::String(s) => s.clone(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Datetime(d) => d.to_string(),
        Value::Array(_) | Value::Table(_) => {
            serde_json::to_string(v).context("encoding value as JSON")?
        }
    })
}

/// Validate `cfg` and write every entry through `store`.
/// Individual write failures are counted as skipped, not fatal.
pub fn apply_config(store: &dyn ParameterStore, cfg: &Table) -> Result<UpdateReport> {
    if cfg.is_empty() {
        bail!("Configuration file is empty or invalid");
    }
    validate_config(cfg).context("Configuration validation failed")?;

    let mut report = UpdateReport::default();
    for (key, value) in cfg {
        let stored = convert_value(value).and_then(|s| {
            store.set_parameter(key, &s)?;
            Ok(s)
        });
        match stored {
            Ok(s) => {
                info!(key = %key, value = %s, "updated parameter");
                report.updated += 1;
            }
            Err(e) => {
                error!(key = %key, error = ?e, "failed to update parameter");
                report.skipped += 1;
            }
        }
    }

    if PROXY_KEYS.iter().any(|k| cfg.contains_key(*k)) {
        store.set_parameter(PROXY_CHECK_TIME_KEY, "1")?;
        report.proxy_cache_reset = true;
        info!("proxy cache reset (proxy settings were updated)");
    }

    info!(
        updated = report.updated,
        skipped = report.skipped,
        "configuration update complete"
    );
    Ok(report)
}

/// Read a TOML file and apply it. See [`apply_config`].
pub fn apply_config_file(store: &dyn ParameterStore, path: &Path) -> Result<UpdateReport> {
    if !path.exists() {
        bail!("Configuration file not found: {}", path.display());
    }
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let cfg: Table = toml::from_str(&raw).with_context(|| format!("parsing TOML in {}", path.display()))?;
    apply_config(store, &cfg)
}
