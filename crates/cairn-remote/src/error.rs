use thiserror::Error;

/// Errors that can occur when talking to a remote catalog.
#[derive(Debug, Error)]
pub enum RemoteError {
  /// The request could not be sent or its body could not be read.
  #[error("request failed: {0}")]
  Http(#[from] reqwest::Error),

  /// The remote answered with a non-success status.
  #[error("unexpected status {status} from {url}")]
  Status { url: String, status: u16 },

  /// The base URL cannot be parsed.
  #[error("invalid base url: {0}")]
  InvalidUrl(#[from] url::ParseError),

  /// The base URL cannot carry path segments (e.g. `mailto:`).
  #[error("base url cannot have a path: {url}")]
  InvalidBaseUrl { url: String },

  /// The catalog listing is not in the expected format.
  #[error("invalid catalog listing: {0}")]
  InvalidCatalog(#[from] serde_json::Error),
}
