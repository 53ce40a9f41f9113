/*============================================================
  Synavera Project: Syn-Cat
  Module: syncat_core::config
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Load Syn-Cat configuration from TOML and expose catalog
    endpoints, reload budget, and output locations.

  Security / Safety Notes:
    Reads operator-owned files only. Missing default config is
    not an error; a missing explicit path is.

  Dependencies:
    serde + toml for parsing, dirs for XDG locations.

  Operational Scope:
    Consumed by the binary entry point and by CatalogClient
    construction.

  Revision History:
    2025-11-12 COD  Introduced catalog configuration layer.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Explicit defaults for every knob
    - Deterministic lookup order for config files
============================================================*/

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{CatalogError, Result};

pub const DEFAULT_SEARCH_URL: &str = "https://www.catalog.update.microsoft.com/Search.aspx";
pub const DEFAULT_DETAILS_URL: &str =
    "https://www.catalog.update.microsoft.com/ScopedViewInline.aspx";
pub const DEFAULT_DOWNLOAD_URL: &str =
    "https://www.catalog.update.microsoft.com/DownloadDialog.aspx";
pub const DEFAULT_PAGE_RELOAD_ATTEMPTS: u8 = 3;

const CONFIG_DIR_NAME: &str = "syncat";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Top-level configuration document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SyncatConfig {
    pub catalog: CatalogConfig,
    pub paths: PathsConfig,
}

/// Settings that shape how the catalog is queried.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub search_url: String,
    pub details_url: String,
    pub download_url: String,
    /// Reloads allowed per page before a transient failure becomes terminal.
    pub page_reload_attempts: u8,
    /// Request timeout in seconds.
    pub timeout: u64,
    /// Base pause before a reload, doubled per consecutive failure. 0 disables.
    pub retry_backoff_ms: u64,
    pub user_agent: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            search_url: DEFAULT_SEARCH_URL.to_string(),
            details_url: DEFAULT_DETAILS_URL.to_string(),
            download_url: DEFAULT_DOWNLOAD_URL.to_string(),
            page_reload_attempts: DEFAULT_PAGE_RELOAD_ATTEMPTS,
            timeout: 30,
            retry_backoff_ms: 200,
            user_agent: "Syn-Cat-Core/0.3 (linux)".to_string(),
        }
    }
}

impl CatalogConfig {
    /// Point every endpoint at `base`, keeping the catalog's page names.
    pub fn with_base_url(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            search_url: format!("{base}/Search.aspx"),
            details_url: format!("{base}/ScopedViewInline.aspx"),
            download_url: format!("{base}/DownloadDialog.aspx"),
            ..Self::default()
        }
    }
}

/// Output locations for reports and session logs.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub report: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
}

impl SyncatConfig {
    /// Load configuration from an explicit path, or from the default XDG
    /// location when it exists, or fall back to defaults.
    pub fn load_from_optional_path(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(explicit) => {
                if !explicit.exists() {
                    return Err(CatalogError::Config(format!(
                        "Configuration file {} does not exist",
                        explicit.display()
                    )));
                }
                Self::load_from_path(explicit)
            }
            None => match default_config_path() {
                Some(candidate) if candidate.exists() => Self::load_from_path(&candidate),
                _ => Ok(Self::default()),
            },
        }
    }

    fn load_from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            CatalogError::Filesystem(format!(
                "Failed to read configuration {}: {err}",
                path.display()
            ))
        })?;
        let config: SyncatConfig = toml::from_str(&raw).map_err(|err| {
            CatalogError::Config(format!(
                "Failed to parse configuration {}: {err}",
                path.display()
            ))
        })?;
        if config.catalog.page_reload_attempts == 0 {
            return Err(CatalogError::Config(
                "catalog.page_reload_attempts must be at least 1".into(),
            ));
        }
        Ok(config)
    }

    /// Destination for the JSON report.
    pub fn report_path(&self) -> PathBuf {
        self.paths.report.clone().unwrap_or_else(|| {
            data_root()
                .join(CONFIG_DIR_NAME)
                .join("reports")
                .join("latest.json")
        })
    }

    /// Directory that receives session logs.
    pub fn log_dir(&self) -> PathBuf {
        self.paths
            .log_dir
            .clone()
            .unwrap_or_else(|| data_root().join(CONFIG_DIR_NAME).join("logs"))
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

fn data_root() -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}
