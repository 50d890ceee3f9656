use std::collections::HashMap;
use std::collections::hash_map::Entry;

use cairn_config::{Ensemble, EnsembleSpec, Profile, TaskProfile, VectorProfile};
use tracing::{debug, warn};

use crate::canonical::Canonicalizer;
use crate::error::AlignError;
use crate::key::identity_key;

/// Rewrites profiles so every vector task's weights follow the canonical
/// order of its ensemble.
pub struct Aligner<C: Canonicalizer> {
  canonicalizer: C,
}

impl<C: Canonicalizer> Aligner<C> {
  /// Create an aligner backed by the given canonicalizer.
  pub fn new(canonicalizer: C) -> Self {
    Self { canonicalizer }
  }

  /// Parse a serialized profile and align it.
  pub fn align_slice(&self, bytes: &[u8]) -> Result<Profile, AlignError> {
    let profile = Profile::from_slice(bytes)?;
    self.align_profile(&profile)
  }

  /// Align every task of a profile. Descriptive fields are kept as-is.
  pub fn align_profile(&self, profile: &Profile) -> Result<Profile, AlignError> {
    let tasks = profile
      .tasks
      .iter()
      .map(|task| self.align(task))
      .collect::<Result<Vec<_>, _>>()?;

    Ok(Profile {
      metadata: profile.metadata.clone(),
      tasks,
    })
  }

  /// Align one task profile.
  ///
  /// Inline children are aligned in place, remote profiles and vector tasks
  /// with a referenced ensemble are returned unchanged.
  pub fn align(&self, task: &TaskProfile) -> Result<TaskProfile, AlignError> {
    match task {
      TaskProfile::Inline { tasks } => {
        let tasks = tasks
          .iter()
          .map(|child| self.align(child))
          .collect::<Result<Vec<_>, _>>()?;
        Ok(TaskProfile::Inline { tasks })
      }
      TaskProfile::Remote(_) => Ok(task.clone()),
      TaskProfile::Vector(vector) => match &vector.ensemble {
        EnsembleSpec::Reference(_) => Ok(task.clone()),
        EnsembleSpec::Inline(ensemble) => self
          .align_vector(vector, ensemble)
          .map(TaskProfile::Vector),
      },
    }
  }

  fn align_vector(
    &self,
    vector: &VectorProfile,
    ensemble: &Ensemble,
  ) -> Result<VectorProfile, AlignError> {
    if vector.weights.len() != ensemble.backends.len() {
      return Err(AlignError::WeightCount {
        weights: vector.weights.len(),
        backends: ensemble.backends.len(),
        payload: serde_json::to_string(vector).unwrap_or_default(),
      });
    }

    // First occurrence wins when two backends share an identity.
    let mut weights_by_key: HashMap<String, f64> = HashMap::with_capacity(vector.weights.len());
    for (backend, &weight) in ensemble.backends.iter().zip(&vector.weights) {
      match weights_by_key.entry(identity_key(backend)) {
        Entry::Vacant(entry) => {
          entry.insert(weight);
        }
        Entry::Occupied(entry) => {
          warn!(
            key = %entry.key(),
            kept = *entry.get(),
            dropped = weight,
            "duplicate backend identity in ensemble, keeping first weight"
          );
        }
      }
    }

    let mut canonical = self.canonicalizer.canonicalize(ensemble)?;
    canonical.strip_ids();

    let mut weights = Vec::with_capacity(canonical.backends.len());
    for backend in &canonical.backends {
      let key = identity_key(backend);
      match weights_by_key.get(&key) {
        Some(&weight) => weights.push(weight),
        None => return Err(AlignError::MissingWeight { key }),
      }
    }

    debug!(backends = weights.len(), "aligned vector task profile");

    Ok(VectorProfile {
      ensemble: EnsembleSpec::Inline(canonical),
      weights,
    })
  }
}
