//! Cluster and elbow tables for the dashboard collaborator

use crate::selector::{ClusteringRun, ElbowPoint};
use crate::Result;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;

#[derive(Serialize)]
struct ClusterRow<'a> {
    country: &'a str,
    total_waste: f64,
    economic_loss: f64,
    per_capita_waste_kg: f64,
    household_waste_pct: f64,
    cluster: usize,
}

/// One row per country: the raw aggregate features and the cluster label
pub fn write_clusters_csv<W: io::Write>(writer: W, run: &ClusteringRun) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for (vector, cluster) in run.rows() {
        csv.serialize(ClusterRow {
            country: &vector.country,
            total_waste: vector.total_waste,
            economic_loss: vector.economic_loss,
            per_capita_waste_kg: vector.per_capita_waste_kg,
            household_waste_pct: vector.household_waste_pct,
            cluster,
        })?;
    }
    csv.flush()?;
    Ok(())
}

/// `k,inertia` rows in sweep order
pub fn write_elbow_csv<W: io::Write>(writer: W, points: &[ElbowPoint]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for point in points {
        csv.serialize(point)?;
    }
    csv.flush()?;
    Ok(())
}

pub fn save_clusters_csv<P: AsRef<Path>>(path: P, run: &ClusteringRun) -> Result<()> {
    let path = path.as_ref();
    write_clusters_csv(create(path)?, run)?;
    log::info!("Wrote {} cluster rows to {}", run.labels().len(), path.display());
    Ok(())
}

pub fn save_elbow_csv<P: AsRef<Path>>(path: P, points: &[ElbowPoint]) -> Result<()> {
    let path = path.as_ref();
    write_elbow_csv(create(path)?, points)?;
    log::info!("Wrote {} elbow points to {}", points.len(), path.display());
    Ok(())
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(BufWriter::new(File::create(path)?))
}
