//! MOS CLI - station Model Output Statistics from extraction to forecast.

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "mos-cli",
    version,
    about = "Station MOS post-processing toolkit"
)]
struct Cli {
    #[command(subcommand)]
    command: mos_cmd::Command,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    log::debug!("mos-cli {}", env!("CARGO_PKG_VERSION"));
    mos_cmd::run(cli.command)
}
