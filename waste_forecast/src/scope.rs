//! Forecast scopes and their store keys

use serde::{Deserialize, Serialize};
use std::fmt;
use waste_data::WasteDataset;

/// The (country, category) pair a forecast or persisted model applies to
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForecastScope {
    pub country: Option<String>,
    pub category: Option<String>,
}

impl ForecastScope {
    pub fn new(country: Option<&str>, category: Option<&str>) -> Self {
        Self {
            country: country.map(str::to_string),
            category: category.map(str::to_string),
        }
    }

    /// All rows of the dataset
    pub fn global() -> Self {
        Self::default()
    }

    pub fn country(country: &str) -> Self {
        Self::new(Some(country), None)
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    /// One scope per distinct country in the dataset
    pub fn all_countries(dataset: &WasteDataset) -> waste_data::Result<Vec<Self>> {
        Ok(dataset
            .countries()?
            .iter()
            .map(|country| Self::country(country))
            .collect())
    }

    /// Store key, safe to use as a file stem.
    ///
    /// Filter values are escaped byte-wise so distinct scopes never share a key.
    pub fn key(&self) -> String {
        match (&self.country, &self.category) {
            (None, None) => "global".to_string(),
            (Some(country), None) => format!("country-{}", escape(country)),
            (None, Some(category)) => format!("category-{}", escape(category)),
            (Some(country), Some(category)) => {
                format!("country-{}__category-{}", escape(country), escape(category))
            }
        }
    }
}

impl fmt::Display for ForecastScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.country, &self.category) {
            (None, None) => write!(f, "global"),
            (Some(country), None) => write!(f, "country={}", country),
            (None, Some(category)) => write!(f, "category={}", category),
            (Some(country), Some(category)) => {
                write!(f, "country={}, category={}", country, category)
            }
        }
    }
}

fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() {
            escaped.push(byte as char);
        } else {
            escaped.push_str(&format!("_{:02x}", byte));
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_keys() {
        assert_eq!(ForecastScope::global().key(), "global");
        assert_eq!(ForecastScope::country("France").key(), "country-France");
        assert_eq!(
            ForecastScope::country("United States")
                .with_category("Fruits & Vegetables")
                .key(),
            "country-United_20States__category-Fruits_20_26_20Vegetables"
        );
        assert_eq!(ForecastScope::new(None, Some("Dairy")).key(), "category-Dairy");
    }

    #[test]
    fn test_escaping_keeps_keys_distinct() {
        let spaced = ForecastScope::country("a b").key();
        let underscored = ForecastScope::country("a_b").key();
        assert_ne!(spaced, underscored);
    }

    #[test]
    fn test_display() {
        let scope = ForecastScope::country("Japan").with_category("Grain");
        assert_eq!(scope.to_string(), "country=Japan, category=Grain");
        assert_eq!(ForecastScope::global().to_string(), "global");
    }
}
