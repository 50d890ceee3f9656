use cairn_config::{Address, ArtifactKind, ShapeError};
use cairn_remote::RemoteError;
use thiserror::Error;

/// Errors that can occur while materializing reference graphs.
#[derive(Debug, Error)]
pub enum ResolveError {
  /// The remote failed to return an artifact.
  #[error("failed to fetch {kind} {address}: {source}")]
  Fetch {
    kind: ArtifactKind,
    address: Address,
    #[source]
    source: RemoteError,
  },

  /// The remote failed to return the catalog listing.
  #[error("failed to list catalog: {0}")]
  Catalog(#[source] RemoteError),

  /// An artifact contains a reference with a missing address component.
  #[error("malformed reference in {kind} {address}: {source}")]
  Reference {
    kind: ArtifactKind,
    address: Address,
    #[source]
    source: ShapeError,
  },

  /// An artifact does not have a recognized structure.
  #[error("invalid {kind} {address}: {source}")]
  Structural {
    kind: ArtifactKind,
    address: Address,
    #[source]
    source: ShapeError,
  },

  /// A concurrent fetch of the same address finished without storing it.
  #[error("{kind} {address} was not stored by the concurrent fetch it waited on")]
  Abandoned { kind: ArtifactKind, address: Address },

  /// Store error while checking or writing an artifact.
  #[error("store error: {0}")]
  Store(#[from] cairn_artifact::Error),

  /// The manifest could not be serialized.
  #[error("failed to serialize manifest: {0}")]
  Manifest(#[from] serde_json::Error),
}

impl ResolveError {
  pub(crate) fn from_shape(kind: ArtifactKind, address: &Address, source: ShapeError) -> Self {
    let address = address.clone();
    if source.is_reference() {
      ResolveError::Reference {
        kind,
        address,
        source,
      }
    } else {
      ResolveError::Structural {
        kind,
        address,
        source,
      }
    }
  }
}
