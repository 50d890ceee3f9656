//! Profile artifact types.
//!
//! A profile mirrors a function's task tree and carries the weights each
//! vector completion task gives to its ensemble's backends. Every node of the
//! tree takes one of three wire shapes, told apart by their exact key set:
//!
//! ```json
//! { "tasks": [ ... ] }                                          // inline
//! { "owner": "acme", "repository": "repo", "commit": "abc123" } // remote
//! { "ensemble": { "llms": [ ... ] }, "profile": [0.2, 0.8] }    // vector
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::address::{ADDRESS_FIELDS, Address};
use crate::ensemble::EnsembleSpec;
use crate::error::ShapeError;

/// A vector completion task profile: an ensemble and one weight per backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorProfile {
  pub ensemble: EnsembleSpec,
  #[serde(rename = "profile")]
  pub weights: Vec<f64>,
}

/// One node of a profile's task tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged, try_from = "Value")]
pub enum TaskProfile {
  /// Child profiles, one per task of an inline sub-function, in task order.
  Inline { tasks: Vec<TaskProfile> },
  /// A profile published elsewhere, for a remote sub-function.
  Remote(Address),
  /// Weights for a vector completion task.
  Vector(VectorProfile),
}

impl TaskProfile {
  pub fn inline(tasks: Vec<TaskProfile>) -> Self {
    TaskProfile::Inline { tasks }
  }
}

impl TryFrom<Value> for TaskProfile {
  type Error = ShapeError;

  fn try_from(value: Value) -> Result<Self, Self::Error> {
    let object = match value {
      Value::Object(object) => object,
      other => return Err(ShapeError::unrecognized_value(&other)),
    };

    let keys: Vec<&str> = object.keys().map(String::as_str).collect();

    if keys == ["tasks"] {
      let Some(Value::Array(children)) = object.get("tasks") else {
        return Err(ShapeError::unrecognized(&object));
      };
      let tasks = children
        .iter()
        .cloned()
        .map(TaskProfile::try_from)
        .collect::<Result<Vec<_>, _>>()?;
      return Ok(TaskProfile::Inline { tasks });
    }

    if !keys.is_empty() && keys.iter().all(|k| ADDRESS_FIELDS.contains(k)) {
      return Address::from_object(&object).map(TaskProfile::Remote);
    }

    if keys.len() == 2 && object.contains_key("ensemble") && object.contains_key("profile") {
      return serde_json::from_value::<VectorProfile>(Value::Object(object.clone()))
        .map(TaskProfile::Vector)
        .map_err(|_| ShapeError::unrecognized(&object));
    }

    Err(ShapeError::unrecognized(&object))
  }
}

/// A profile artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct Profile {
  /// Descriptive fields (description, changelog, ...), kept as-is.
  #[serde(flatten)]
  pub metadata: Map<String, Value>,
  pub tasks: Vec<TaskProfile>,
}

impl Profile {
  /// Parse a serialized profile artifact.
  pub fn from_slice(bytes: &[u8]) -> Result<Self, ShapeError> {
    let value: Value = serde_json::from_slice(bytes)?;
    Profile::try_from(value)
  }
}

impl TryFrom<Value> for Profile {
  type Error = ShapeError;

  fn try_from(value: Value) -> Result<Self, Self::Error> {
    let mut metadata = match value {
      Value::Object(object) => object,
      other => return Err(ShapeError::unrecognized_value(&other)),
    };

    let tasks = match metadata.remove("tasks") {
      Some(Value::Array(tasks)) => tasks
        .into_iter()
        .map(TaskProfile::try_from)
        .collect::<Result<Vec<_>, _>>()?,
      Some(other) => return Err(ShapeError::unrecognized_value(&other)),
      None => return Err(ShapeError::unrecognized(&metadata)),
    };

    Ok(Profile { metadata, tasks })
  }
}
