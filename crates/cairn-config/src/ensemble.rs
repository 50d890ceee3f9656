//! Ensemble and backend types.
//!
//! An ensemble is the ordered list of backends that resolve one vector
//! completion task. Each backend names a primary model configuration and an
//! optional ordered fallback chain.
//!
//! ```json
//! {
//!   "llms": [
//!     { "model": "openai/gpt-4.1-nano", "output_mode": "json_schema" },
//!     {
//!       "model": "x-ai/grok-4.1-fast",
//!       "fallbacks": [{ "model": "openai/gpt-4o-mini" }]
//!     }
//!   ]
//! }
//! ```
//!
//! `id` fields are transient: canonicalization assigns them, aligned
//! artifacts never carry them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Configuration shared by a backend and each of its fallbacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
  /// Model name, e.g. "openai/gpt-4.1-nano"
  pub model: String,

  /// Every other setting (output mode, reasoning, logprobs, ...).
  #[serde(flatten)]
  pub params: Map<String, Value>,
}

impl BackendConfig {
  pub fn new(model: impl Into<String>) -> Self {
    Self {
      model: model.into(),
      params: Map::new(),
    }
  }

  /// Add a setting, builder style.
  pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
    self.params.insert(key.into(), value);
    self
  }

  /// Content identifier of this configuration: hex SHA-256 of its JSON form
  /// with object keys sorted at every level.
  pub fn identifier(&self) -> String {
    let mut object = self.params.clone();
    object.insert("model".to_string(), Value::String(self.model.clone()));
    let mut canonical = String::new();
    write_sorted(&Value::Object(object), &mut canonical);
    hex::encode(Sha256::digest(canonical.as_bytes()))
  }
}

/// Write `value` as compact JSON, ordering object keys independently of how
/// the map stores them.
fn write_sorted(value: &Value, out: &mut String) {
  match value {
    Value::Object(object) => {
      let mut entries: Vec<(&String, &Value)> = object.iter().collect();
      entries.sort_by(|a, b| a.0.cmp(b.0));
      out.push('{');
      for (index, (key, value)) in entries.into_iter().enumerate() {
        if index > 0 {
          out.push(',');
        }
        out.push_str(&Value::String(key.clone()).to_string());
        out.push(':');
        write_sorted(value, out);
      }
      out.push('}');
    }
    Value::Array(items) => {
      out.push('[');
      for (index, item) in items.iter().enumerate() {
        if index > 0 {
          out.push(',');
        }
        write_sorted(item, out);
      }
      out.push(']');
    }
    scalar => out.push_str(&scalar.to_string()),
  }
}

/// A fallback entry in a backend's chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fallback {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id: Option<String>,
  #[serde(flatten)]
  pub config: BackendConfig,
}

impl Fallback {
  pub fn new(config: BackendConfig) -> Self {
    Self { id: None, config }
  }
}

/// One member of an ensemble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Backend {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id: Option<String>,
  #[serde(flatten)]
  pub config: BackendConfig,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub fallbacks: Option<Vec<Fallback>>,
}

impl Backend {
  pub fn new(config: BackendConfig) -> Self {
    Self {
      id: None,
      config,
      fallbacks: None,
    }
  }

  pub fn with_fallbacks(mut self, fallbacks: Vec<Fallback>) -> Self {
    self.fallbacks = Some(fallbacks);
    self
  }

  /// Fallbacks in chain order (empty when none are configured).
  pub fn fallbacks(&self) -> &[Fallback] {
    self.fallbacks.as_deref().unwrap_or(&[])
  }
}

/// An ordered list of backends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ensemble {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id: Option<String>,
  #[serde(rename = "llms")]
  pub backends: Vec<Backend>,
}

impl Ensemble {
  pub fn new(backends: Vec<Backend>) -> Self {
    Self { id: None, backends }
  }

  /// Remove every transient identifier from the ensemble, its backends and
  /// their fallbacks.
  pub fn strip_ids(&mut self) {
    self.id = None;
    for backend in &mut self.backends {
      backend.id = None;
      if let Some(fallbacks) = backend.fallbacks.as_mut() {
        for fallback in fallbacks {
          fallback.id = None;
        }
      }
    }
  }
}

/// The ensemble of a vector task profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnsembleSpec {
  /// Identifier of a published ensemble. Already canonical.
  Reference(String),
  /// An ensemble written out in full.
  Inline(Ensemble),
}
