//! Column names of the cleaned dataset

use serde::{Deserialize, Serialize};

/// Names of the columns the analysis reads.
///
/// Defaults match the cleaned dataset written by the upstream cleaning step
/// (lower-cased, spaces replaced by underscores). Any field can be overridden
/// from configuration when a differently named export is analysed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub country: String,
    pub category: String,
    /// Explicit date column; preferred over `year` when present
    pub date: String,
    /// Fallback temporal key, mapped to January 1 of the year
    pub year: String,
    pub total_waste: String,
    pub economic_loss: String,
    pub population: String,
    pub per_capita_waste: String,
    pub household_share: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            country: "country".to_string(),
            category: "food_category".to_string(),
            date: "date".to_string(),
            year: "year".to_string(),
            total_waste: "total_waste_(tons)".to_string(),
            economic_loss: "economic_loss_(million_$)".to_string(),
            population: "population_(million)".to_string(),
            per_capita_waste: "per_capita_waste_kg".to_string(),
            household_share: "household_waste_(%)".to_string(),
        }
    }
}
