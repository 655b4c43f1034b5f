use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};

/// A weather station forecasts are produced for.
///
/// Immutable reference data, read once from a metadata CSV.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Station {
    /// Station identifier (unique key)
    pub station_id: String,
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

impl Station {
    /// Parse a CSV string of station metadata into a vector of Stations.
    ///
    /// Expected CSV columns (with headers): station_id, latitude, longitude.
    /// Extra columns are ignored. Duplicate identifiers keep the first row.
    pub fn parse_station_csv(csv_object: &str) -> anyhow::Result<Vec<Station>> {
        let mut station_list: Vec<Station> = Vec::new();
        let mut rdr = ReaderBuilder::new()
            .delimiter(b',')
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(csv_object.as_bytes());
        for row in rdr.deserialize() {
            let station: Station = row?;
            if station_list
                .iter()
                .any(|s| s.station_id == station.station_id)
            {
                log::warn!("duplicate station {} ignored", station.station_id);
                continue;
            }
            station_list.push(station);
        }
        Ok(station_list)
    }

    /// Identifiers of the given stations, in order.
    pub fn ids(stations: &[Station]) -> Vec<String> {
        stations.iter().map(|s| s.station_id.clone()).collect()
    }
}
