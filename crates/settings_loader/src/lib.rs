//! # Settings Loader
//!
//! Centralized settings loading for the dashboard services. Settings live in a
//! JSON file (`settings.json` by default) whose fields are all optional; any
//! field left out keeps its built-in default. Environment variables are
//! applied last so a deployment can override the file without editing it.
//!
//! ## Environment overrides
//!
//! - `DASHBOARD_API_URL`   → `api_base_url`
//! - `HEATMAP_API_URL`     → `heatmap_base_url`
//! - `DASHBOARD_POLL_SECS` → `dashboard_poll_secs`
//! - `HEATMAP_POLL_SECS`   → `heatmap_poll_secs`
//! - `HOST` / `PORT`       → bind address of the API server
//!
//! ## Usage Examples
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//!
//! // Load settings from a specific path
//! let settings = settings_loader::load_settings("config/settings.json")?;
//!
//! // File if present, defaults otherwise, then environment overrides
//! let path = Some(PathBuf::from("settings.json"));
//! let settings = settings_loader::load_effective_settings(path.as_ref())?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use models::DashboardSettings;

/// Loads settings from a JSON file
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<DashboardSettings> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Reading settings file: {}", path.display()))?;
    let settings: DashboardSettings = serde_json::from_str(&raw)
        .with_context(|| format!("Parsing settings JSON in {}", path.display()))?;
    validate(&settings).with_context(|| format!("Validating {}", path.display()))?;
    Ok(settings)
}

/// Loads settings from a default location (settings.json in the current directory)
pub fn load_default_settings() -> Result<DashboardSettings> {
    load_settings("settings.json")
}

/// Resolves the settings the services actually run with.
///
/// An explicit path must exist and parse. Without one, `settings.json` is used
/// when present and the built-in defaults otherwise. Environment overrides are
/// applied on top in every case.
pub fn load_effective_settings(path: Option<&PathBuf>) -> Result<DashboardSettings> {
    let base = match path {
        Some(settings_path) => load_settings(settings_path)?,
        None if default_settings_exist() => load_default_settings()?,
        None => {
            tracing::info!("No settings file found, using built-in defaults");
            DashboardSettings::default()
        }
    };
    let settings = apply_env_overrides(base, |key| env::var(key).ok())?;
    validate(&settings)?;
    Ok(settings)
}

/// Applies overrides from a variable lookup. Taking the lookup as a closure
/// keeps tests independent from the process environment.
pub fn apply_env_overrides<F>(mut settings: DashboardSettings, lookup: F) -> Result<DashboardSettings>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup("DASHBOARD_API_URL") {
        settings.api_base_url = url;
    }
    if let Some(url) = lookup("HEATMAP_API_URL") {
        settings.heatmap_base_url = Some(url);
    }
    if let Some(raw) = lookup("DASHBOARD_POLL_SECS") {
        settings.dashboard_poll_secs = raw
            .trim()
            .parse()
            .with_context(|| format!("DASHBOARD_POLL_SECS is not a number: {raw}"))?;
    }
    if let Some(raw) = lookup("HEATMAP_POLL_SECS") {
        settings.heatmap_poll_secs = raw
            .trim()
            .parse()
            .with_context(|| format!("HEATMAP_POLL_SECS is not a number: {raw}"))?;
    }
    if let Some(host) = lookup("HOST") {
        settings.host = host;
    }
    if let Some(raw) = lookup("PORT") {
        settings.port = raw
            .trim()
            .parse()
            .with_context(|| format!("PORT is not a valid port: {raw}"))?;
    }
    Ok(settings)
}

fn validate(settings: &DashboardSettings) -> Result<()> {
    if settings.dashboard_poll_secs == 0 || settings.heatmap_poll_secs == 0 {
        return Err(anyhow!("Poll intervals must be at least one second"));
    }
    if settings.request_timeout_secs == 0 {
        return Err(anyhow!("request_timeout_secs must be at least one second"));
    }
    if !(settings.monthly_capacity_liters.is_finite() && settings.monthly_capacity_liters >= 0.0) {
        return Err(anyhow!(
            "monthly_capacity_liters must be a non-negative number, got {}",
            settings.monthly_capacity_liters
        ));
    }
    Ok(())
}

/// Checks if a settings file exists at the given path
pub fn settings_file_exists<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref().exists() && path.as_ref().is_file()
}

/// Checks if the default settings file (settings.json) exists
pub fn default_settings_exist() -> bool {
    settings_file_exists("settings.json")
}
