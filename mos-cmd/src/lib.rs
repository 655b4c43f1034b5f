//! Command implementations for the MOS CLI.
//!
//! Provides subcommands to extract station series from decoded model runs,
//! train station models and produce daily forecasts.

use clap::Subcommand;
use std::path::PathBuf;

pub mod extract;
pub mod forecast;
pub mod train;

#[derive(Subcommand)]
pub enum Command {
    /// Extract station series from decoded model runs into monthly CSV files
    Extract {
        /// Run configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Decoded model-run bundles (JSON), in chronological order
        #[arg(short, long, num_args = 1.., required = true)]
        grids: Vec<PathBuf>,

        /// Directory the monthly CSV files are written to
        #[arg(short, long)]
        output_dir: PathBuf,

        /// File name prefix of the monthly CSV files
        #[arg(long, default_value = "model")]
        prefix: String,
    },

    /// Train one model per station, lead time and predictand
    Train {
        /// Run configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Forecast every 00 UTC run between two dates (inclusive)
    Forecast {
        /// Run configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Variable to forecast
        #[arg(short, long)]
        predictand: String,

        /// First run date (YYYY-MM-DD)
        #[arg(long)]
        start: String,

        /// Last run date (YYYY-MM-DD)
        #[arg(long)]
        end: String,

        /// Output CSV; defaults to `forecast_output` from the configuration
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

pub fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Extract {
            config,
            grids,
            output_dir,
            prefix,
        } => extract::run_extract(&config, &grids, &output_dir, &prefix),
        Command::Train { config } => train::run_train(&config),
        Command::Forecast {
            config,
            predictand,
            start,
            end,
            output,
        } => forecast::run_forecast(&config, &predictand, &start, &end, output.as_deref()),
    }
}
