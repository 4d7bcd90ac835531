pub mod types;
pub mod config;
pub mod data;
pub mod metric;
pub mod processing;
pub mod theme;
pub mod render;
pub mod wiring;
pub mod server;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the interactive dashboard
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Write every chart in its initial state, plus the summary cards, as JSON
    Export {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve { config } => {
            info!("Serving dashboard with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;
            let dataset = data::load_data(&app_config)?;
            server::start_server(app_config, dataset).await?;
        }
        Commands::Export { config } => {
            info!("Exporting charts with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;
            let dataset = data::load_data(&app_config)?;
            export_charts(&app_config, &dataset)?;
            info!("Export complete!");
        }
    }

    Ok(())
}

fn export_charts(config: &config::AppConfig, dataset: &types::Dataset) -> Result<()> {
    let out_dir = &config.output.chart_dir;
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create chart directory: {:?}", out_dir))?;

    let controls = wiring::Controls::initial(&config.processing);
    let update = wiring::update(dataset, &config.processing, &controls, None);
    for (id, chart) in &update.charts {
        let path = out_dir.join(format!("{}.json", id.slug()));
        let json = serde_json::to_string_pretty(chart)?;
        fs::write(&path, json).with_context(|| format!("Failed to write {:?}", path))?;
        info!("Wrote {:?}", path);
    }

    let summary = processing::summary(&dataset.cases, config.processing.span_years());
    let path = out_dir.join("summary.json");
    fs::write(&path, serde_json::to_string_pretty(&summary)?)
        .with_context(|| format!("Failed to write {:?}", path))?;
    info!("Wrote {:?}", path);

    Ok(())
}
