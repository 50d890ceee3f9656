use async_trait::async_trait;
use bytes::Bytes;

use cairn_config::{Address, ArtifactKind, RootPair};

use crate::error::RemoteError;

/// Access to the global catalog of published artifacts.
#[async_trait]
pub trait Remote: Send + Sync {
  /// Fetch the serialized artifact of `kind` published at `address`.
  ///
  /// The bytes are returned exactly as served.
  async fn fetch(&self, kind: ArtifactKind, address: &Address) -> Result<Bytes, RemoteError>;

  /// List every known (function, profile) pair.
  async fn list_pairs(&self) -> Result<Vec<RootPair>, RemoteError>;
}
