pub mod types;
pub mod config;
pub mod data;
pub mod styling;
pub mod surface;
pub mod interaction;
pub mod view;
pub mod index;
pub mod render;
pub mod server;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the choropleth fill into map tiles
    Render {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Serve the interactive map and its API
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Report which boundaries and statistics rows fail to join
    Inspect {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Render { config } => {
            tracing::info!(?config, "rendering choropleth tiles");
            let app_config = config::AppConfig::load_from_file(config)?;

            let table = data::load_statistics(&app_config.input.statistics)?;
            let features = data::load_boundaries(&app_config.input.boundaries)?;

            let tiles = render::generate_tiles(&app_config, &features, &table)?;
            tracing::info!(tiles, dir = ?app_config.output.tile_dir, "render complete");
        }
        Commands::Serve { config } => {
            tracing::info!(?config, "serving choropleth");
            let app_config = config::AppConfig::load_from_file(config)?;

            let table = data::load_statistics(&app_config.input.statistics)?;
            // The map still comes up without regions if the boundary file is bad.
            let boundaries = data::load_boundaries(&app_config.input.boundaries);

            let state = server::AppState::build(app_config, table, boundaries);
            server::start_server(state).await?;
        }
        Commands::Inspect { config } => {
            let app_config = config::AppConfig::load_from_file(config)?;
            let table = data::load_statistics(&app_config.input.statistics)?;
            let features = data::load_boundaries(&app_config.input.boundaries)?;

            let report = data::join(&features, &table);
            println!(
                "matched {} of {} boundaries ({} statistics rows)",
                report.matched.len(),
                features.len(),
                table.len()
            );
            for name in &report.missing_statistics {
                println!("boundary without statistics: {:?}", name);
            }
            for name in &report.missing_boundaries {
                println!("statistics without boundary: {:?}", name);
            }
            for name in &report.duplicate_records {
                println!("duplicate statistics row: {:?}", name);
            }
        }
    }

    Ok(())
}
