use crypto_index_core::{PriceObservation, SeriesPoint};

/// Read price observations from a CSV file.
///
/// Expected header: `symbol,price,market_cap,timestamp`, with RFC 3339
/// timestamps (e.g. `2024-01-01T00:00:00Z`).
pub fn read_observations(path: &str) -> Result<Vec<PriceObservation>, Box<dyn std::error::Error>> {
    let mut rdr =
        csv::Reader::from_path(path).map_err(|e| format!("Failed to open '{}': {}", path, e))?;

    let mut observations = Vec::new();
    for record in rdr.deserialize() {
        let obs: PriceObservation =
            record.map_err(|e| format!("Invalid observation row in '{}': {}", path, e))?;
        observations.push(obs);
    }
    Ok(observations)
}

/// Read an index value series from a CSV file.
///
/// Expected header: `timestamp,value`.
pub fn read_series(path: &str) -> Result<Vec<SeriesPoint>, Box<dyn std::error::Error>> {
    let mut rdr =
        csv::Reader::from_path(path).map_err(|e| format!("Failed to open '{}': {}", path, e))?;

    let mut points = Vec::new();
    for record in rdr.deserialize() {
        let point: SeriesPoint =
            record.map_err(|e| format!("Invalid series row in '{}': {}", path, e))?;
        points.push(point);
    }
    Ok(points)
}
