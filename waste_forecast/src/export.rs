//! Forecast tables for the reporting collaborator

use crate::error::Result;
use crate::models::ForecastResult;
use std::io;
use std::path::Path;

/// Write `date,<method>_forecast` rows, one per forecast month
pub fn write_forecast_csv<W: io::Write>(writer: W, result: &ForecastResult) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(["date".to_string(), format!("{}_forecast", result.method())])?;
    for point in result.points() {
        csv.write_record([point.date.format("%Y-%m-%d").to_string(), point.value.to_string()])?;
    }
    csv.flush()?;
    Ok(())
}

/// Write the forecast table to `path`, replacing any previous file
pub fn save_forecast_csv<P: AsRef<Path>>(path: P, result: &ForecastResult) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    write_forecast_csv(io::BufWriter::new(file), result)?;
    log::info!("Wrote {} forecast rows to {}", result.horizon(), path.display());
    Ok(())
}
