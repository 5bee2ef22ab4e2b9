use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "formdeck.yaml";
pub const CONFIG_DIR_ENV: &str = "FORMDECK_CONFIG_DIR";

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Http,
    Memory,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct StoreConfig {
    pub kind: StoreKind,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::Http,
            base_url: "http://localhost:5000/api".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct AuthConfig {
    pub admin_id: String,
    pub admin_password: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_id: "admin".to_string(),
            admin_password: "1234".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct BuilderConfig {
    // Reordering stays disabled this long after a builder opens
    pub reorder_delay_ms: u64,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            reorder_delay_ms: 100,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub auth: AuthConfig,
    pub builder: BuilderConfig,
    pub public_base_url: String,
    pub export_dir: PathBuf,
    pub log_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            auth: AuthConfig::default(),
            builder: BuilderConfig::default(),
            public_base_url: "http://localhost:3000".to_string(),
            export_dir: PathBuf::from("."),
            log_file: None,
        }
    }
}

impl AppConfig {
    pub fn form_link(&self, form_id: &str) -> String {
        form_link(&self.public_base_url, form_id)
    }
}

/// Public fill-in URL of a form.
pub fn form_link(base_url: &str, form_id: &str) -> String {
    format!("{}/form/{}", base_url.trim_end_matches('/'), form_id)
}

pub(crate) fn validate_app_config(cfg: &AppConfig) -> Result<(), String> {
    if cfg.store.kind == StoreKind::Http && cfg.store.base_url.trim().is_empty() {
        return Err("store.base_url must not be empty for the http store".into());
    }
    if cfg.store.timeout_secs == 0 {
        return Err("store.timeout_secs must be greater than zero".into());
    }
    if cfg.auth.admin_id.is_empty() || cfg.auth.admin_password.is_empty() {
        return Err("auth.admin_id and auth.admin_password must not be empty".into());
    }
    Ok(())
}

/// First existing config file: `$FORMDECK_CONFIG_DIR/formdeck.yaml`, then
/// `./formdeck.yaml`, `./.formdeck/formdeck.yaml`, each ancestor's
/// `.formdeck/formdeck.yaml`, and finally `$HOME/.formdeck/formdeck.yaml`.
pub(crate) fn discover_config_path(
    env_dir: Option<&Path>,
    cwd: &Path,
    home: Option<&Path>,
) -> Option<PathBuf> {
    if let Some(dir) = env_dir {
        return Some(dir.join(CONFIG_FILE));
    }
    let candidates = [
        cwd.join(CONFIG_FILE),
        cwd.join(".formdeck").join(CONFIG_FILE),
    ];
    if let Some(p) = candidates.into_iter().find(|p| p.exists()) {
        return Some(p);
    }
    let mut cur = cwd;
    while let Some(parent) = cur.parent() {
        let p = parent.join(".formdeck").join(CONFIG_FILE);
        if p.exists() {
            return Some(p);
        }
        cur = parent;
    }
    home.map(|h| h.join(".formdeck").join(CONFIG_FILE))
        .filter(|p| p.exists())
}

pub(crate) fn load_config_from(path: &Path) -> Result<AppConfig> {
    let s = fs::read_to_string(path).with_context(|| format!("reading {path:?}"))?;
    let cfg: AppConfig = serde_yaml::from_str(&s).with_context(|| format!("parsing {path:?}"))?;
    validate_app_config(&cfg).map_err(|e| anyhow::anyhow!("{path:?}: {e}"))?;
    Ok(cfg)
}

/// Loads the discovered config, or built-in defaults when none exists.
/// Returns the path that was used.
pub fn load_config() -> Result<(AppConfig, Option<PathBuf>)> {
    let env_dir = std::env::var(CONFIG_DIR_ENV).ok().map(PathBuf::from);
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let home = std::env::var("HOME")
        .ok()
        .or_else(|| std::env::var("USERPROFILE").ok())
        .map(PathBuf::from);
    match discover_config_path(env_dir.as_deref(), &cwd, home.as_deref()) {
        Some(p) => Ok((load_config_from(&p)?, Some(p))),
        None => Ok((AppConfig::default(), None)),
    }
}
