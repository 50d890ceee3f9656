//! Cairn Artifact
//!
//! This crate provides the artifact storage trait and implementations for Cairn.
//! Artifacts are serialized functions, profiles and acquisition manifests.
//!
//! The [`Store`] trait defines the backend layer for artifact storage.
//! Implementations handle the actual storage while callers translate artifact
//! addresses to storage keys (see `cairn_config::ArtifactKind::store_key`).
//!
//! A key is either absent or holds a complete artifact: writes land in a
//! temporary file that is renamed into place. Nothing is ever deleted.

mod fs;

pub use fs::FsStore;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt, stream};
use std::pin::Pin;

/// A boxed stream of bytes for artifact data.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, Error>> + Send>>;

/// Error type for artifact storage operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// The requested artifact was not found.
  #[error("artifact not found: {0}")]
  NotFound(String),

  /// The key does not name a location inside the store.
  #[error("invalid artifact key: {0}")]
  InvalidKey(String),

  /// An I/O error occurred.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

/// Artifact storage trait.
#[async_trait]
pub trait Store: Send + Sync {
  /// Whether an artifact is stored under `key`.
  async fn exists(&self, key: &str) -> Result<bool, Error>;

  /// Retrieve an artifact by key.
  async fn get(&self, key: &str) -> Result<ByteStream, Error>;

  /// Store an artifact.
  ///
  /// The write is atomic: concurrent readers observe either no artifact or
  /// the complete one.
  async fn put(&self, key: &str, data: ByteStream) -> Result<(), Error>;
}

/// Wrap an in-memory buffer as a [`ByteStream`].
pub fn byte_stream(data: Bytes) -> ByteStream {
  Box::pin(stream::once(async move { Ok(data) }))
}

/// Drain a [`ByteStream`] into a single buffer.
pub async fn read_all(mut data: ByteStream) -> Result<Bytes, Error> {
  let mut buf = BytesMut::new();
  while let Some(chunk) = data.next().await {
    buf.extend_from_slice(&chunk?);
  }
  Ok(buf.freeze())
}
