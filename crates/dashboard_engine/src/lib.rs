pub mod dashboard;
pub mod format;
pub mod geo;
pub mod metrics;
pub mod period;
pub mod trend;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use models::{DashboardOutput, DashboardSettings, HeatmapOutput, HeatmapPointRaw};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::{fs, path::Path, path::PathBuf};

pub use dashboard::{DashboardEngine, DashboardInputs};

pub const KPIS_FILE: &str = "kpis.json";
pub const PEDIDOS_FILE: &str = "pedidos.json";
pub const HISTORY_FILE: &str = "ventas_historicas.json";
pub const TOTALS_FILE: &str = "ventas_totales_historicas.json";
pub const HEATMAP_FILE: &str = "heatmap.json";

/// Reads one collaborator payload saved to disk. A missing file yields the default value.
fn read_payload<T>(dir: &Path, name: &str) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let path = dir.join(name);
    if !path.exists() {
        tracing::debug!(file = %path.display(), "Payload file missing, using empty value");
        return Ok(T::default());
    }
    let raw = fs::read_to_string(&path).with_context(|| format!("Reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Parsing {}", path.display()))
}

/// Loads a directory of saved endpoint responses (`kpis.json`, `pedidos.json`, ...).
pub fn load_inputs(input_dir: &Path) -> Result<DashboardInputs> {
    if !input_dir.is_dir() {
        anyhow::bail!("Input directory not found: {}", input_dir.display());
    }
    Ok(DashboardInputs {
        kpis: read_payload(input_dir, KPIS_FILE)?,
        pedidos: read_payload(input_dir, PEDIDOS_FILE)?,
        ventas_historicas: read_payload(input_dir, HISTORY_FILE)?,
        ventas_totales: read_payload(input_dir, TOTALS_FILE)?,
    })
}

pub fn load_heatmap_points(input_dir: &Path) -> Result<Vec<HeatmapPointRaw>> {
    read_payload(input_dir, HEATMAP_FILE)
}

fn engine_for(settings_path: Option<&PathBuf>) -> Result<(DashboardSettings, DashboardEngine)> {
    let settings = settings_loader::load_effective_settings(settings_path)?;
    let engine =
        DashboardEngine::from_settings(&settings).context("Invalid trend profile in settings")?;
    Ok((settings, engine))
}

/// Offline variant of one dashboard refresh: saved payloads in, document out.
pub fn generate_dashboard(
    settings_path: Option<&PathBuf>,
    input_dir: &Path,
    now: NaiveDateTime,
) -> Result<DashboardOutput> {
    let (_, engine) = engine_for(settings_path)?;
    let inputs = load_inputs(input_dir)?;
    Ok(engine.build_dashboard(&inputs, now))
}

pub fn generate_heatmap(
    settings_path: Option<&PathBuf>,
    input_dir: &Path,
    zoom_level: Option<i32>,
    now: NaiveDateTime,
) -> Result<HeatmapOutput> {
    let (settings, engine) = engine_for(settings_path)?;
    let raw = load_heatmap_points(input_dir)?;
    Ok(engine.build_heatmap(&raw, zoom_level.unwrap_or(settings.default_zoom), now))
}

pub fn now_local() -> NaiveDateTime {
    Local::now().naive_local()
}

pub fn write_json<T: Serialize>(output: &T, out_path: &Path) -> Result<()> {
    if let Some(parent) = out_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(output)?;
    fs::write(out_path, json)?;
    Ok(())
}
