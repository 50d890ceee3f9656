use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised while classifying artifact JSON into typed nodes.
#[derive(Debug, Error)]
pub enum ShapeError {
  /// The value matches none of the recognized shapes.
  #[error("unrecognized shape: {payload}")]
  Unrecognized { payload: String },

  /// A reference node is missing one of its address components.
  #[error("reference is missing `{field}`: {payload}")]
  MissingAddressField {
    field: &'static str,
    payload: String,
  },

  /// A reference component cannot be used as a single path segment.
  #[error("reference has invalid `{field}` {value:?}: {payload}")]
  InvalidAddressComponent {
    field: &'static str,
    value: String,
    payload: String,
  },

  /// A function task carries a `type` this crate does not know.
  #[error("unknown task type '{task_type}': {payload}")]
  UnknownTaskType { task_type: String, payload: String },

  /// The artifact is not valid JSON.
  #[error("invalid json: {0}")]
  Json(#[from] serde_json::Error),
}

impl ShapeError {
  pub(crate) fn unrecognized(object: &Map<String, Value>) -> Self {
    ShapeError::Unrecognized {
      payload: Value::Object(object.clone()).to_string(),
    }
  }

  pub(crate) fn unrecognized_value(value: &Value) -> Self {
    ShapeError::Unrecognized {
      payload: value.to_string(),
    }
  }

  /// Whether this error describes a malformed reference rather than an
  /// unrecognized structure.
  pub fn is_reference(&self) -> bool {
    matches!(
      self,
      ShapeError::MissingAddressField { .. } | ShapeError::InvalidAddressComponent { .. }
    )
  }
}
