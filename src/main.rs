//! Rental Pricer - Main Entry Point

use clap::Parser;
use rental_pricer::cli::{cmd_cities, cmd_clean, cmd_predict, cmd_schema, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rental_pricer=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Clean { data, output, config } => {
            cmd_clean(&data, &output, config.as_deref())?;
        }
        Commands::Schema { data, city, output, config } => {
            cmd_schema(&data, city.as_deref(), &output, config.as_deref())?;
        }
        Commands::Predict { city, data_dir, models_dir, attributes, debug_out } => {
            cmd_predict(&city, &data_dir, &models_dir, &attributes, debug_out.as_deref())?;
        }
        Commands::Cities { data_dir } => {
            cmd_cities(&data_dir)?;
        }
    }

    Ok(())
}
