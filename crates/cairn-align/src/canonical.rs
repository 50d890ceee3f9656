//! Ensemble canonicalization.
//!
//! A canonicalizer validates an ensemble and returns it in canonical form:
//! backends may be reordered and every entry may be tagged with an `id`.
//! The identity of each backend (its configuration and fallback chain) must
//! survive unchanged, since the aligner matches weights on it.

use cairn_config::{BackendConfig, Ensemble};
use sha2::{Digest, Sha256};

use crate::error::CanonicalizeError;
use crate::key::identity_key;

/// Puts ensembles into canonical form.
pub trait Canonicalizer: Send + Sync {
  fn canonicalize(&self, ensemble: &Ensemble) -> Result<Ensemble, CanonicalizeError>;
}

impl<F> Canonicalizer for F
where
  F: Fn(&Ensemble) -> Result<Ensemble, CanonicalizeError> + Send + Sync,
{
  fn canonicalize(&self, ensemble: &Ensemble) -> Result<Ensemble, CanonicalizeError> {
    self(ensemble)
  }
}

/// Local canonicalizer that orders backends by content digest.
///
/// Every fallback gets its configuration identifier as `id`, every backend
/// the digest of its identity key, and the ensemble the digest of its
/// ordered backend ids. Backends are sorted by id, so any permutation of the
/// same backends canonicalizes to the same ensemble.
#[derive(Debug, Default, Clone, Copy)]
pub struct DigestCanonicalizer;

impl DigestCanonicalizer {
  pub fn new() -> Self {
    Self
  }
}

impl Canonicalizer for DigestCanonicalizer {
  fn canonicalize(&self, ensemble: &Ensemble) -> Result<Ensemble, CanonicalizeError> {
    if ensemble.backends.is_empty() {
      return Err(CanonicalizeError::Invalid {
        message: "ensemble has no backends".to_string(),
      });
    }

    let mut canonical = ensemble.clone();
    for (index, backend) in canonical.backends.iter_mut().enumerate() {
      check_model(&backend.config, index)?;
      if let Some(fallbacks) = backend.fallbacks.as_mut() {
        for fallback in fallbacks.iter_mut() {
          check_model(&fallback.config, index)?;
          fallback.id = Some(fallback.config.identifier());
        }
      }
      backend.id = Some(digest(&identity_key(backend)));
    }

    canonical.backends.sort_by(|a, b| a.id.cmp(&b.id));

    let ids: String = canonical
      .backends
      .iter()
      .filter_map(|b| b.id.as_deref())
      .collect();
    canonical.id = Some(digest(&ids));

    Ok(canonical)
  }
}

fn check_model(config: &BackendConfig, index: usize) -> Result<(), CanonicalizeError> {
  if config.model.trim().is_empty() {
    return Err(CanonicalizeError::Invalid {
      message: format!("backend {} has an empty model", index),
    });
  }
  Ok(())
}

fn digest(input: &str) -> String {
  hex::encode(Sha256::digest(input.as_bytes()))
}
