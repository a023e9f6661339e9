//! Prediction results and their normalization into the platform envelope

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{HandlerError, Result};

/// A single prediction for one task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PredictionValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,

    /// Regions/labels in the platform's result format
    #[serde(default)]
    pub result: Vec<Value>,

    /// Anything else the handler wants to pass through
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Predictions are either one per task or a list of alternatives per task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Prediction {
    Single(PredictionValue),
    Many(Vec<PredictionValue>),
}

impl Prediction {
    fn values_mut(&mut self) -> std::slice::IterMut<'_, PredictionValue> {
        match self {
            Prediction::Single(value) => std::slice::from_mut(value).iter_mut(),
            Prediction::Many(values) => values.iter_mut(),
        }
    }
}

/// Structured predict result carrying its own model version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ModelResponse {
    #[serde(default)]
    pub model_version: Option<String>,
    pub predictions: Vec<Prediction>,
}

impl ModelResponse {
    pub fn new(predictions: Vec<Prediction>) -> Self {
        Self {
            model_version: None,
            predictions,
        }
    }

    pub fn has_model_version(&self) -> bool {
        self.model_version.is_some()
    }

    /// Set the envelope version and push it onto the predictions
    pub fn set_version(&mut self, version: impl Into<String>) {
        self.model_version = Some(version.into());
        self.update_predictions_version();
    }

    /// Copy the envelope version onto every prediction that has none
    pub fn update_predictions_version(&mut self) {
        let Some(version) = self.model_version.as_deref() else {
            return;
        };
        for prediction in self.predictions.iter_mut() {
            for value in prediction.values_mut() {
                if value.model_version.is_none() {
                    value.model_version = Some(version.to_string());
                }
            }
        }
    }
}

/// What a handler's `predict` returns
#[derive(Debug, Clone, PartialEq)]
pub enum PredictOutput {
    /// Arbitrary JSON, passed through after unwrapping
    Raw(Value),
    /// Versioned envelope
    Envelope(ModelResponse),
}

impl From<ModelResponse> for PredictOutput {
    fn from(response: ModelResponse) -> Self {
        Self::Envelope(response)
    }
}

impl From<Value> for PredictOutput {
    fn from(value: Value) -> Self {
        Self::Raw(value)
    }
}

/// The body returned by `/predict`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionEnvelope {
    pub results: Value,
}

/// Shape a predict result into the `{"results": ...}` body.
///
/// An envelope that already carries a version keeps it; otherwise the
/// handler's default version is stamped on when there is one.
pub fn normalize_predictions(
    output: PredictOutput,
    default_version: Option<&str>,
) -> Result<PredictionEnvelope> {
    let value = match output {
        PredictOutput::Envelope(mut response) => {
            if response.has_model_version() {
                response.update_predictions_version();
            } else if let Some(version) = default_version {
                response.set_version(version);
            }
            serde_json::to_value(&response).map_err(|e| {
                HandlerError::Failed(format!("Failed to serialize predictions: {}", e))
            })?
        }
        PredictOutput::Raw(value) => value,
    };

    let results = match value {
        Value::Null => Value::Array(Vec::new()),
        Value::Object(mut map) => match map.remove("predictions") {
            Some(predictions) => predictions,
            None => Value::Object(map),
        },
        other => other,
    };

    Ok(PredictionEnvelope { results })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn prediction(version: Option<&str>) -> Prediction {
        Prediction::Single(PredictionValue {
            model_version: version.map(str::to_string),
            score: Some(0.5),
            result: vec![json!({"type": "choices", "value": {"choices": ["cat"]}})],
            extra: Map::new(),
        })
    }

    #[test]
    fn test_null_becomes_empty_results() {
        let body = normalize_predictions(PredictOutput::Raw(Value::Null), Some("v1")).unwrap();
        assert_eq!(body.results, json!([]));
        assert_eq!(serde_json::to_value(&body).unwrap(), json!({"results": []}));
    }

    #[test]
    fn test_raw_sequence_passes_through() {
        let raw = json!([{"result": [], "score": 0.1}]);
        let body = normalize_predictions(PredictOutput::Raw(raw.clone()), None).unwrap();
        assert_eq!(body.results, raw);
    }

    #[test]
    fn test_mapping_without_predictions_is_kept() {
        let raw = json!({"foo": "bar"});
        let body = normalize_predictions(PredictOutput::Raw(raw.clone()), None).unwrap();
        assert_eq!(body.results, raw);
    }

    #[test]
    fn test_mapping_with_predictions_is_unwrapped() {
        let raw = json!({"predictions": [{"result": []}], "model_version": "x"});
        let body = normalize_predictions(PredictOutput::Raw(raw), None).unwrap();
        assert_eq!(body.results, json!([{"result": []}]));
    }

    #[test]
    fn test_envelope_without_version_gets_default() {
        let response = ModelResponse::new(vec![prediction(None)]);
        let body = normalize_predictions(response.into(), Some("v1")).unwrap();
        assert_eq!(body.results[0]["model_version"], "v1");
    }

    #[test]
    fn test_envelope_without_version_and_no_default_stays_unversioned() {
        let response = ModelResponse::new(vec![prediction(None)]);
        let body = normalize_predictions(response.into(), None).unwrap();
        assert!(body.results[0].get("model_version").is_none());
    }

    #[test]
    fn test_explicit_version_is_never_overwritten() {
        let mut response = ModelResponse::new(vec![prediction(None), prediction(Some("own"))]);
        response.model_version = Some("explicit".to_string());

        let body = normalize_predictions(response.into(), Some("default")).unwrap();
        assert_eq!(body.results[0]["model_version"], "explicit");
        assert_eq!(body.results[1]["model_version"], "own");
    }

    #[test]
    fn test_nested_predictions_are_versioned() {
        let many = Prediction::Many(vec![PredictionValue::default(), PredictionValue::default()]);
        let mut response = ModelResponse::new(vec![many]);
        response.set_version("v2");

        let Prediction::Many(values) = &response.predictions[0] else {
            panic!("expected nested predictions");
        };
        assert!(values.iter().all(|v| v.model_version.as_deref() == Some("v2")));
    }

    #[test]
    fn test_extra_fields_are_flattened() {
        let mut value = PredictionValue::default();
        value.extra.insert("task".to_string(), json!(12));
        let body =
            normalize_predictions(ModelResponse::new(vec![Prediction::Single(value)]).into(), None)
                .unwrap();
        assert_eq!(body.results[0]["task"], 12);
    }
}
