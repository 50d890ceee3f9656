use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use futures::StreamExt;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::{ByteStream, Error, Store};

/// Filesystem-based artifact store.
///
/// Stores artifacts as files on the local filesystem. Each artifact is stored
/// at `{base_path}/{key}`. Parent directories are created automatically.
/// Writes land in a temporary sibling file first and are renamed into place.
pub struct FsStore {
  base_path: PathBuf,
}

impl FsStore {
  /// Create a new filesystem store with the given base path.
  pub fn new(base_path: impl Into<PathBuf>) -> Self {
    Self {
      base_path: base_path.into(),
    }
  }

  /// Get the root directory of the store.
  pub fn base_path(&self) -> &Path {
    &self.base_path
  }

  fn key_to_path(&self, key: &str) -> Result<PathBuf, Error> {
    let relative = Path::new(key);
    let is_contained = key
      .split('/')
      .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
      && relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    if !is_contained {
      return Err(Error::InvalidKey(key.to_string()));
    }
    Ok(self.base_path.join(relative))
  }
}

#[async_trait]
impl Store for FsStore {
  async fn exists(&self, key: &str) -> Result<bool, Error> {
    let path = self.key_to_path(key)?;
    Ok(fs::try_exists(&path).await?)
  }

  async fn get(&self, key: &str) -> Result<ByteStream, Error> {
    let path = self.key_to_path(key)?;
    let file = File::open(&path).await.map_err(|e| {
      if e.kind() == std::io::ErrorKind::NotFound {
        Error::NotFound(key.to_string())
      } else {
        Error::Io(e)
      }
    })?;
    let stream = ReaderStream::new(file).map(|r| r.map_err(Error::Io));
    Ok(Box::pin(stream))
  }

  async fn put(&self, key: &str, data: ByteStream) -> Result<(), Error> {
    let path = self.key_to_path(key)?;
    let parent = path
      .parent()
      .ok_or_else(|| Error::InvalidKey(key.to_string()))?;
    fs::create_dir_all(parent).await?;

    let mut tmp = TempFile::new(parent.join(format!(".{}.tmp", uuid::Uuid::new_v4())));
    write_file(&tmp.path, data).await?;
    fs::rename(&tmp.path, &path).await?;
    tmp.committed = true;

    debug!(key, "artifact stored");
    Ok(())
  }
}

/// A temporary file that is removed on drop unless it was renamed into place.
///
/// Covers both failed writes and a `put` future dropped mid-write.
struct TempFile {
  path: PathBuf,
  committed: bool,
}

impl TempFile {
  fn new(path: PathBuf) -> Self {
    Self {
      path,
      committed: false,
    }
  }
}

impl Drop for TempFile {
  fn drop(&mut self) {
    if !self.committed {
      let _ = std::fs::remove_file(&self.path);
    }
  }
}

async fn write_file(path: &Path, data: ByteStream) -> Result<(), Error> {
  let mut file = File::create(path).await?;
  let mut stream = std::pin::pin!(data);

  while let Some(chunk) = stream.next().await {
    let bytes = chunk?;
    file.write_all(&bytes).await?;
  }

  file.flush().await?;
  file.sync_all().await?;
  Ok(())
}
