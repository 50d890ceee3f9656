use cairn_config::ShapeError;
use thiserror::Error;

/// Errors raised by a [`Canonicalizer`](crate::Canonicalizer).
#[derive(Debug, Error)]
pub enum CanonicalizeError {
  /// The ensemble cannot be put into canonical form.
  #[error("invalid ensemble: {message}")]
  Invalid { message: String },
}

/// Errors that can occur while aligning a profile.
#[derive(Debug, Error)]
pub enum AlignError {
  /// The profile does not have a recognized structure.
  #[error("structural validation failed: {0}")]
  Structural(#[from] ShapeError),

  /// A vector task profile has a different number of weights than backends.
  #[error("{weights} weights given for {backends} backends: {payload}")]
  WeightCount {
    weights: usize,
    backends: usize,
    payload: String,
  },

  /// A canonical backend has no weight from before canonicalization.
  #[error("no profile weight found for backend: {key}")]
  MissingWeight { key: String },

  /// The canonicalizer rejected an ensemble.
  #[error("canonicalization failed: {0}")]
  Canonicalize(#[from] CanonicalizeError),
}
