//! Station series extraction from decoded model runs.

use anyhow::Context;
use log::{info, warn};
use mos_core::config::load_config;
use mos_core::station::Station;
use mos_db::writer::MonthlyWriter;
use mos_grid::bundle::GridBundle;
use mos_grid::extract::extract_run;
use mos_grid::GridPointResolver;
use std::path::{Path, PathBuf};

/// Resolve every configured station on each bundle's grid, extract its
/// fields and write month-partitioned model-data CSV files.
///
/// A bundle that cannot be read is logged and skipped.
pub fn run_extract(
    config_path: &Path,
    grids: &[PathBuf],
    output_dir: &Path,
    prefix: &str,
) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let stations_data = std::fs::read_to_string(&config.station_metadata)
        .with_context(|| format!("reading {}", config.station_metadata.display()))?;
    let stations = Station::parse_station_csv(&stations_data)?;
    info!("Extracting {} runs for {} stations", grids.len(), stations.len());

    let mut resolver = GridPointResolver::new();
    let mut writer = MonthlyWriter::new(output_dir, prefix);
    for path in grids {
        let bundle = match GridBundle::from_path(path) {
            Ok(b) => b,
            Err(e) => {
                warn!("{:#}", e);
                continue;
            }
        };
        let cells = resolver.resolve_all(&stations, &bundle.grid);
        let records = extract_run(&bundle.grid, bundle.run_datetime, &bundle.fields, &cells)?;
        info!(
            "Extracted {} values from run {}",
            records.len(),
            bundle.run_datetime
        );
        writer.push_run(bundle.run_datetime.date(), records)?;
    }
    let written = writer.finish()?;
    info!("Extraction complete. {} files in {}", written.len(), output_dir.display());
    Ok(())
}
