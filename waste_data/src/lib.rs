//! # Waste Data
//!
//! Typed access to the cleaned food-waste dataset produced by the upstream
//! cleaning step. The dataset is held as a polars `DataFrame`; this crate
//! knows which columns the analytical crates need and how to read them.
//!
//! ## Quick Start
//!
//! ```no_run
//! use waste_data::{ColumnMap, DataLoader};
//!
//! let dataset = DataLoader::from_csv("food_waste_clean.csv", ColumnMap::default())?;
//! let france = dataset.filter(Some("France"), None)?;
//! println!("{} rows for France", france.len());
//! # Ok::<(), waste_data::DataError>(())
//! ```

pub mod columns;
pub mod dataset;
pub mod dates;
pub mod error;

pub use crate::columns::ColumnMap;
pub use crate::dataset::{Aggregation, DataLoader, WasteDataset};
pub use crate::error::{DataError, Result};
