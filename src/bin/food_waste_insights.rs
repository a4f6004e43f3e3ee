//! # food-waste-insights
//!
//! Command-line interface for the food-waste forecasting and clustering pipeline.

use clap::{Parser, Subcommand};
use food_waste_insights::{AnalysisConfig, Pipeline};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(name = "food-waste-insights")]
#[command(about = "Food-waste forecasting and country clustering", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Forecast total waste and write the forecast table
    Forecast {
        /// Months to forecast
        #[arg(long, allow_negative_numbers = true)]
        horizon: Option<i64>,

        #[arg(long)]
        country: Option<String>,

        #[arg(long)]
        category: Option<String>,

        /// Forecast every country separately
        #[arg(long)]
        all_countries: bool,
    },

    /// Write inertia for each candidate k
    Elbow {
        /// Candidate k values, e.g. 2,3,4
        #[arg(long, value_delimiter = ',')]
        k: Option<Vec<usize>>,
    },

    /// Cluster countries with the chosen k
    Cluster {
        #[arg(short, long)]
        k: Option<usize>,
    },

    /// Forecast, elbow sweep and clustering in one go
    All,

    /// Forget the stored model of a scope
    Invalidate {
        #[arg(long)]
        country: Option<String>,

        #[arg(long)]
        category: Option<String>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => AnalysisConfig::from_file(path)?,
        None => AnalysisConfig::default(),
    };

    match cli.command {
        Commands::Forecast {
            horizon,
            country,
            category,
            all_countries,
        } => {
            if let Some(horizon) = horizon {
                config.forecast.horizon = horizon;
            }
            config.forecast.country = country.or(config.forecast.country);
            config.forecast.category = category.or(config.forecast.category);
            config.forecast.all_countries |= all_countries;

            let pipeline = Pipeline::new(config)?;
            let dataset = pipeline.load_dataset()?;
            for run in pipeline.forecast(&dataset)? {
                println!(
                    "{}: {} forecast ({}), {} months from {}",
                    run.scope,
                    run.method(),
                    run.result.model_name(),
                    run.result.horizon(),
                    run.result.dates().first().map(|d| d.to_string()).unwrap_or_default()
                );
                if let Some(reason) = &run.fallback_reason {
                    println!("  primary model rejected: {}", reason);
                }
                if let Some(accuracy) = &run.accuracy {
                    print!("{}", accuracy);
                }
            }
        }
        Commands::Elbow { k } => {
            if let Some(k) = k {
                config.clustering.k_range = k;
            }
            let pipeline = Pipeline::new(config)?;
            let dataset = pipeline.load_dataset()?;
            for point in pipeline.elbow(&dataset)? {
                println!("k={:<3} inertia={:.4}", point.k, point.inertia);
            }
        }
        Commands::Cluster { k } => {
            if let Some(k) = k {
                config.clustering.committed_k = k;
            }
            let pipeline = Pipeline::new(config)?;
            let dataset = pipeline.load_dataset()?;
            let run = pipeline.cluster(&dataset)?;
            println!(
                "Clustering is done with k={}, silhouette score {:.2}",
                run.k(),
                run.silhouette()
            );
        }
        Commands::All => {
            let report = Pipeline::new(config)?.run_all()?;
            println!(
                "{} forecasts, {} elbow points, silhouette {:.2}",
                report.forecasts.len(),
                report.elbow.len(),
                report.clustering.silhouette()
            );
        }
        Commands::Invalidate { country, category } => {
            config.forecast.country = country;
            config.forecast.category = category;
            Pipeline::new(config)?.invalidate()?;
        }
    }

    Ok(())
}
