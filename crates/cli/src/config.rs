use anyhow::{Context, Result};
use catalog::AssetBase;
use exporters::ExportConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CONFIG_FILE: &str = "stock.json";
pub const ENV_ASSET_BASE: &str = "STOCK_ASSET_BASE";
pub const ENV_PASSWORD: &str = "STOCK_PASSWORD";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StockConfig {
    /// Local directory or `http(s)://` prefix all media paths hang off.
    pub asset_base: String,
    pub motif_csv: PathBuf,
    pub transition_csv: PathBuf,
    pub takeoff_landing_csv: Option<PathBuf>,
    /// When set, every command except `users add` on an empty store needs a login.
    pub users_file: Option<PathBuf>,
    /// Zero skips the icon existence probe.
    pub probe_workers: usize,
    pub export: ExportConfig,
}

impl Default for StockConfig {
    fn default() -> Self {
        Self {
            asset_base: "./assets".to_string(),
            motif_csv: PathBuf::from("data/motif.csv"),
            transition_csv: PathBuf::from("data/transition.csv"),
            takeoff_landing_csv: None,
            users_file: None,
            probe_workers: 4,
            export: ExportConfig::default(),
        }
    }
}

impl StockConfig {
    /// Reads `path`, or `stock.json` in the working directory when present,
    /// then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(CONFIG_FILE).is_file() => Self::from_file(Path::new(CONFIG_FILE))?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let config = serde_json::from_str(&text)
            .with_context(|| format!("parse config {}", path.display()))?;
        debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(base) = lookup(ENV_ASSET_BASE).filter(|b| !b.trim().is_empty()) {
            debug!(%base, "asset base overridden from environment");
            self.asset_base = base;
        }
    }

    pub fn asset_base(&self) -> Result<AssetBase> {
        AssetBase::parse(&self.asset_base)
            .with_context(|| format!("invalid asset base {:?}", self.asset_base))
    }
}
