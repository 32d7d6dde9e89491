use anyhow::{Context, Result};
use dashboard_engine::format::{format_amount, format_change, format_currency, format_percentage};
use dashboard_engine::{generate_dashboard, generate_heatmap, now_local, write_json};
use std::env;
use std::path::PathBuf;

fn arg_value(flag: &str) -> Option<String> {
    env::args()
        .position(|a| a == flag)
        .and_then(|i| env::args().nth(i + 1))
}

fn main() -> Result<()> {
    let settings = arg_value("--settings");
    let input = arg_value("--input").unwrap_or("snapshot".to_string());
    let out = arg_value("--out").unwrap_or("dashboard/dashboard.json".to_string());
    let heatmap_out = arg_value("--heatmap");
    let zoom = arg_value("--zoom")
        .map(|z| z.parse::<i32>().with_context(|| format!("Invalid --zoom value: {z}")))
        .transpose()?;

    let settings_path = settings.map(PathBuf::from);
    let input_dir = PathBuf::from(&input);
    let out_path = PathBuf::from(&out);

    println!(
        "Generating dashboard...\n  settings: {}\n  input   : {}\n  output  : {}",
        settings_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or("(default)".to_string()),
        input_dir.display(),
        out_path.display()
    );

    let now = now_local();
    let dashboard = generate_dashboard(settings_path.as_ref(), &input_dir, now)
        .context("generate dashboard")?;
    write_json(&dashboard, &out_path).context("write dashboard.json")?;

    let k = &dashboard.kpis;
    println!(
        "  ventas  : {} ({})\n  ticket  : {}\n  meta    : {} ({})",
        format_currency(k.ventas.value),
        format_change(k.ventas.percent_change),
        format_amount(k.ticket_promedio.value),
        format_currency(k.meta),
        format_percentage(k.progreso_meta, 0)
    );
    if dashboard.aggregation.skipped() > 0 {
        println!("  skipped : {} malformed orders", dashboard.aggregation.skipped());
    }

    if let Some(heatmap_out) = heatmap_out {
        let heatmap = generate_heatmap(settings_path.as_ref(), &input_dir, zoom, now)
            .context("generate heat map")?;
        write_json(&heatmap, &PathBuf::from(&heatmap_out)).context("write heat map")?;
        println!("  heat map: {} ({} points)", heatmap_out, heatmap.points.len());
    }

    println!("Done. Generated at {}", dashboard.metadata.generated_at);
    Ok(())
}
