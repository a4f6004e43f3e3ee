//! Encoding of fitted models for a [`ModelStore`](crate::store::ModelStore)

use crate::models::FittedModel;
use crate::store::StoreError;
use serde::{Deserialize, Serialize};

/// Version of the artifact envelope; older or newer blobs are rejected
pub const ARTIFACT_FORMAT: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ModelArtifact {
    format: u32,
    /// Store key the model was fitted for
    scope: String,
    model: FittedModel,
}

/// Serialize `model` for the store entry `key`
pub fn encode(key: &str, model: &FittedModel) -> Result<Vec<u8>, StoreError> {
    let artifact = ModelArtifact {
        format: ARTIFACT_FORMAT,
        scope: key.to_string(),
        model: model.clone(),
    };
    serde_json::to_vec_pretty(&artifact).map_err(|e| StoreError::Encode(e.to_string()))
}

/// Parse a blob loaded from `key`.
///
/// Anything that is not a consistent model written for this key is
/// [`StoreError::Corrupt`].
pub fn decode(key: &str, blob: &[u8]) -> Result<FittedModel, StoreError> {
    let corrupt = |reason: String| StoreError::Corrupt {
        key: key.to_string(),
        reason,
    };

    let artifact: ModelArtifact =
        serde_json::from_slice(blob).map_err(|e| corrupt(e.to_string()))?;

    if artifact.format != ARTIFACT_FORMAT {
        return Err(corrupt(format!(
            "unsupported format {} (expected {})",
            artifact.format, ARTIFACT_FORMAT
        )));
    }
    if artifact.scope != key {
        return Err(corrupt(format!("artifact belongs to {}", artifact.scope)));
    }
    if !artifact.model.is_consistent() {
        return Err(corrupt("inconsistent model parameters".to_string()));
    }

    Ok(artifact.model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArimaModel, ForecastModel, TrainedForecastModel};

    fn fitted() -> FittedModel {
        let series: Vec<f64> = (0..30)
            .map(|t| 100.0 + t as f64 + 5.0 * ((t as f64) * 0.7).sin())
            .collect();
        ArimaModel::new(1, 1, 1).fit(&series).unwrap().into()
    }

    #[test]
    fn test_decode_returns_identical_model() {
        let model = fitted();
        let blob = encode("global", &model).unwrap();
        let loaded = decode("global", &blob).unwrap();

        assert_eq!(loaded, model);
        assert_eq!(loaded.forecast(6), model.forecast(6));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode("global", b"{not json"),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_other_scope() {
        let blob = encode("country-France", &fitted()).unwrap();
        assert!(matches!(
            decode("global", &blob),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_other_format() {
        let blob = encode("global", &fitted()).unwrap();
        let text = String::from_utf8(blob).unwrap().replacen("\"format\": 1", "\"format\": 99", 1);
        assert!(matches!(
            decode("global", text.as_bytes()),
            Err(StoreError::Corrupt { .. })
        ));
    }
}
