//! Dashboard configuration persistence.

use std::fs;
use std::path::{Path, PathBuf};

use finboard_types::{ConfigError, DashboardConfig};
use tracing::{debug, info};

use crate::error::AppResult;

/// Env var overriding the dashboard file location.
pub const CONFIG_ENV: &str = "FINBOARD_CONFIG";
const CONFIG_FILE: &str = "dashboard.json";
const DATA_DIR_NAME: &str = "finboard";

/// `<data_dir>/finboard`, created on demand.
pub fn get_data_dir() -> AppResult<PathBuf> {
    let base = dirs::data_dir().ok_or_else(|| ConfigError::ReadError {
        path: "~".to_string(),
        message: "no user data directory on this platform".to_string(),
    })?;
    let dir = base.join(DATA_DIR_NAME);
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Dashboard path: `override_path`, then `FINBOARD_CONFIG`, then the data dir.
pub fn resolve_config_path(override_path: Option<&Path>) -> AppResult<PathBuf> {
    if let Some(path) = override_path {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    Ok(get_data_dir()?.join(CONFIG_FILE))
}

/// Load and validate a dashboard. A missing file is an empty dashboard.
pub fn load_dashboard(path: &Path) -> AppResult<DashboardConfig> {
    if !path.exists() {
        debug!("no dashboard at {}, starting empty", path.display());
        return Ok(DashboardConfig::default());
    }

    let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let config: DashboardConfig =
        serde_json::from_str(&content).map_err(|e| ConfigError::ParseError { message: e.to_string() })?;
    config.check()?;

    info!("loaded {} widget(s) from {}", config.widgets.len(), path.display());
    Ok(config)
}

/// Validate and write atomically (temp file + rename).
pub fn save_dashboard(path: &Path, config: &DashboardConfig) -> AppResult<()> {
    config.check()?;

    let write_error = |e: std::io::Error| ConfigError::WriteError { message: e.to_string() };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_error)?;
    }

    let content = serde_json::to_string_pretty(config)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, content).map_err(write_error)?;
    fs::rename(&tmp, path).map_err(write_error)?;

    debug!("saved {} widget(s) to {}", config.widgets.len(), path.display());
    Ok(())
}
